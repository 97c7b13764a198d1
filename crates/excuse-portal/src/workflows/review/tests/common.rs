use std::sync::Arc;

use serde_json::{json, Value};

use crate::api::{FormData, PortalClient, ScriptedTransport};
use crate::domain::{ExcuseRequest, LookupEntry, Signature, SignatureId};
use crate::lookup::{SessionContext, SessionScope};
use crate::workflows::review::ReviewService;

/// A backend row in the loose shape the portal backend returns.
pub(super) fn row(id: u32, employee: &str, committee: &str) -> Value {
    json!({
        "id": id,
        "student_id": 441200 + id,
        "student_name": format!("Student {id}"),
        "student_major": "Nursing",
        "student_level": 3,
        "excuse_type": "health",
        "excuse_date": "2025-03-02",
        "num_days": 2,
        "hospital": "H1",
        "location": "inside_jeddah",
        "affected_courses": "[{\"course\":\"C1\",\"reason\":\"R1\"}]",
        "status": "pending",
        "employee_decision": employee,
        "committee_decision": committee,
        "committee_comment": "",
        "committee_signatures": "",
        "date": format!("2025-03-{:02}T08:00:00.000Z", id.min(28))
    })
}

pub(super) fn excuse(id: u32, employee: &str, committee: &str) -> ExcuseRequest {
    serde_json::from_value(row(id, employee, committee)).expect("fixture row decodes")
}

pub(super) fn signature(id: &str, name: &str) -> Signature {
    Signature {
        id: SignatureId(id.to_string()),
        name: name.to_string(),
        position: "Committee member".to_string(),
        image_url: None,
    }
}

pub(super) fn signatures_json() -> Value {
    json!({
        "signatures": [
            { "id": 1, "name": "Dr. Huda", "position": "Dean" },
            { "id": 2, "name": "Dr. Omar", "position": "Vice dean" }
        ]
    })
}

pub(super) fn context() -> SessionContext {
    SessionContext::from_parts(
        SessionScope::Admin,
        FormData {
            courses: vec![LookupEntry {
                id: "C1".to_string(),
                name: "Anatomy".to_string(),
            }],
            reasons: vec![LookupEntry {
                id: "R1".to_string(),
                name: "Illness".to_string(),
            }],
            hospitals: vec![LookupEntry {
                id: "H1".to_string(),
                name: "King Fahad Hospital".to_string(),
            }],
        },
        Vec::new(),
    )
}

/// Queue one `reload()` worth of replies.
pub(super) fn push_reload(transport: &ScriptedTransport, rows: Vec<Value>) {
    transport
        .push_success(signatures_json())
        .push_json(Value::Array(rows));
}

pub(super) async fn loaded_service(rows: Vec<Value>) -> (ScriptedTransport, ReviewService) {
    let transport = ScriptedTransport::new();
    push_reload(&transport, rows);
    let client = PortalClient::new(Arc::new(transport.clone()));
    let mut service = ReviewService::new(client, context());
    service.reload().await.expect("initial reload");
    (transport, service)
}
