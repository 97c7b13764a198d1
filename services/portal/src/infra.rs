use std::collections::BTreeSet;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{NaiveDate, NaiveDateTime};
use excuse_portal::api::{
    AddItem, AdminLogin, AdminRequestOtp, ApiRequest, DeleteItem, SaveSignature, SubmitRequest,
    UpdateCommitteeDecision, UpdateDecision, UpdateItem,
};
use excuse_portal::domain::{
    AdminProfile, AffectedCourse, CommitteeDecision, ExcuseId, ExcuseRequest, ExcuseStatus,
    LookupCategory, LookupEntry, Signature, SignatureId, StudentProfile, MAX_SIGNATURES,
};
use excuse_portal::workflows::review::{
    plan_committee_decision, plan_employee_decision, CommitteeInput, DecisionPhase,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{json, Map, Value};

/// Fixed one-time code accepted by the stub backend.
pub(crate) const DEMO_OTP: &str = "246810";
pub(crate) const DEMO_ADMIN_EMAIL: &str = "registrar@bmc.edu.sa";
pub(crate) const DEMO_STUDENT_EMAIL: &str = "sara.alharbi@bmc.edu.sa";
pub(crate) const DEMO_STUDENT_ID: &str = "441200";

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Failure answered as `{status: "error", message}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StubError(pub(crate) String);

impl StubError {
    fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Merge `fields` into a success envelope.
pub(crate) fn success(fields: Value) -> Value {
    let mut envelope = Map::new();
    envelope.insert("status".to_string(), Value::from("success"));
    if let Value::Object(fields) = fields {
        envelope.extend(fields);
    }
    Value::Object(envelope)
}

pub(crate) fn failure(err: &StubError) -> Value {
    json!({ "status": "error", "message": err.0 })
}

/// Shared handle to the in-memory backend.
#[derive(Clone)]
pub(crate) struct SharedStore(Arc<Mutex<StubStore>>);

impl SharedStore {
    pub(crate) fn new(store: StubStore) -> Self {
        Self(Arc::new(Mutex::new(store)))
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, StubStore> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// In-memory implementation of the action protocol.
pub(crate) struct StubStore {
    students: Vec<StudentProfile>,
    admin: AdminProfile,
    terms: String,
    hospitals: Vec<LookupEntry>,
    courses: Vec<LookupEntry>,
    reasons: Vec<LookupEntry>,
    excuses: Vec<ExcuseRequest>,
    signatures: Vec<Signature>,
    otp_requested: BTreeSet<String>,
    next_id: u64,
}

fn entry(id: &str, name: &str) -> LookupEntry {
    LookupEntry {
        id: id.to_string(),
        name: name.to_string(),
    }
}

impl StubStore {
    /// Lookups, one student, one administrator and one signatory.
    pub(crate) fn seeded() -> Self {
        let student = StudentProfile {
            id: DEMO_STUDENT_ID.to_string(),
            name: "Sara Alharbi".to_string(),
            gender: "F".to_string(),
            email: DEMO_STUDENT_EMAIL.to_string(),
            major: "Nursing".to_string(),
            level: "3".to_string(),
            ..StudentProfile::default()
        };
        let admin = AdminProfile {
            id: "1".to_string(),
            name: "Registrar".to_string(),
            email: DEMO_ADMIN_EMAIL.to_string(),
            receive_notifications: true,
        };

        Self {
            students: vec![student],
            admin,
            terms: "Submit only genuine excuses. False documents lead to disciplinary action."
                .to_string(),
            hospitals: vec![
                entry("H1", "King Fahad Hospital"),
                entry("H2", "King Abdulaziz University Hospital"),
            ],
            courses: vec![
                entry("C1", "Anatomy"),
                entry("C2", "Physiology"),
                entry("C3", "Pharmacology"),
            ],
            reasons: vec![
                entry("R1", "Missed lecture"),
                entry("R2", "Missed exam"),
                entry("R3", "Missed clinical rotation"),
            ],
            excuses: Vec::new(),
            signatures: vec![Signature {
                id: SignatureId("1".to_string()),
                name: "Dr. Huda Alzahrani".to_string(),
                position: "Dean of Student Affairs".to_string(),
                image_url: None,
            }],
            otp_requested: BTreeSet::new(),
            next_id: 100,
        }
    }

    fn next_id(&mut self) -> String {
        self.next_id += 1;
        self.next_id.to_string()
    }

    /// Answer one action with a complete response envelope.
    pub(crate) fn handle(&mut self, request: ApiRequest, now: NaiveDateTime) -> Value {
        let action = request.name();
        let outcome = match request {
            ApiRequest::Login(login) => self.login(&login.email, &login.password),
            ApiRequest::VerifySession(check) => return self.verify_session(&check.student_id),
            ApiRequest::AdminRequestOtp(request) => self.request_otp(request),
            ApiRequest::AdminLogin(login) => self.admin_login(login),
            ApiRequest::GetTerms(_) => Ok(json!({ "terms": self.terms })),
            ApiRequest::AcceptTerms(accept) => self.accept_terms(&accept.student_id),
            ApiRequest::UpdateTerms(update) => {
                self.terms = update.text;
                Ok(json!({ "message": "Terms updated" }))
            }
            ApiRequest::GetFormData(_) => Ok(json!({
                "courses": self.courses,
                "reasons": self.reasons,
                "hospitals": self.hospitals,
            })),
            ApiRequest::GetSettingsData(_) => Ok(json!({
                "hospitals": self.hospitals,
                "courses": self.courses,
                "reasons": self.reasons,
                "terms": self.terms,
            })),
            ApiRequest::AddItem(add) => self.add_item(add),
            ApiRequest::UpdateItem(update) => self.update_item(update),
            ApiRequest::DeleteItem(delete) => self.delete_item(delete),
            ApiRequest::GetStudents(_) => Ok(json!({ "students": self.students })),
            ApiRequest::SubmitRequest(submit) => self.submit(submit, now),
            ApiRequest::GetExcuses(query) => {
                let own: Vec<_> = self
                    .excuses
                    .iter()
                    .filter(|excuse| excuse.student_id == query.student_id)
                    .collect();
                Ok(json!({ "excuses": own }))
            }
            ApiRequest::GetAllExcuses(_) => Ok(json!({ "excuses": self.excuses })),
            ApiRequest::DeleteExcuse(delete) => self.delete_excuse(&delete.id),
            ApiRequest::UpdateDecision(update) => self.update_decision(update),
            ApiRequest::UpdateCommitteeDecision(update) => self.update_committee_decision(update),
            ApiRequest::GetSignatures(_) => Ok(json!({ "signatures": self.signatures })),
            ApiRequest::SaveSignature(save) => self.save_signature(save),
            ApiRequest::DeleteSignature(delete) => {
                let before = self.signatures.len();
                self.signatures.retain(|signature| signature.id != delete.id);
                if self.signatures.len() == before {
                    Err(StubError::new("Signature not found"))
                } else {
                    Ok(json!({ "message": "Signature deleted" }))
                }
            }
            ApiRequest::GeneratePdf(generate) => self.generate_pdf(&generate.id),
        };

        match outcome {
            Ok(fields) => success(fields),
            Err(err) => {
                tracing::debug!(action, message = %err.0, "stub backend rejected action");
                failure(&err)
            }
        }
    }

    fn login(&self, email: &str, password: &str) -> Result<Value, StubError> {
        self.students
            .iter()
            .find(|student| {
                student.email.eq_ignore_ascii_case(email.trim()) && student.id == password.trim()
            })
            .map(|student| json!({ "student": student }))
            .ok_or_else(|| StubError::new("Invalid email or password"))
    }

    fn verify_session(&self, student_id: &str) -> Value {
        match self.students.iter().find(|student| student.id == student_id) {
            Some(student) => json!({ "status": "valid", "student": student }),
            None => json!({ "status": "invalid", "message": "Student not found" }),
        }
    }

    fn request_otp(&mut self, request: AdminRequestOtp) -> Result<Value, StubError> {
        if !request.email.trim().eq_ignore_ascii_case(&self.admin.email) {
            return Err(StubError::new("This e-mail is not registered as an administrator"));
        }
        self.otp_requested.insert(self.admin.email.clone());
        Ok(json!({ "message": "Verification code sent" }))
    }

    fn admin_login(&mut self, login: AdminLogin) -> Result<Value, StubError> {
        let email = login.email.trim().to_ascii_lowercase();
        if login.otp.trim() != DEMO_OTP || !self.otp_requested.remove(&email) {
            return Err(StubError::new("Invalid or expired code"));
        }
        Ok(json!({ "admin": self.admin }))
    }

    fn accept_terms(&mut self, student_id: &str) -> Result<Value, StubError> {
        let student = self
            .students
            .iter_mut()
            .find(|student| student.id == student_id)
            .ok_or_else(|| StubError::new("Student not found"))?;
        student.terms_agreed = true;
        Ok(json!({ "message": "Terms accepted" }))
    }

    fn table(&mut self, category: LookupCategory) -> &mut Vec<LookupEntry> {
        match category {
            LookupCategory::Hospitals => &mut self.hospitals,
            LookupCategory::Courses => &mut self.courses,
            LookupCategory::Reasons => &mut self.reasons,
        }
    }

    fn add_item(&mut self, add: AddItem) -> Result<Value, StubError> {
        let id = self.next_id();
        self.table(add.category).push(LookupEntry { id, name: add.name });
        Ok(json!({ "message": "Item added" }))
    }

    fn update_item(&mut self, update: UpdateItem) -> Result<Value, StubError> {
        let item = self
            .table(update.category)
            .iter_mut()
            .find(|item| item.id == update.id)
            .ok_or_else(|| StubError::new("Item not found"))?;
        item.name = update.name;
        Ok(json!({ "message": "Item updated" }))
    }

    fn delete_item(&mut self, delete: DeleteItem) -> Result<Value, StubError> {
        let table = self.table(delete.category);
        let before = table.len();
        table.retain(|item| item.id != delete.id);
        if table.len() == before {
            return Err(StubError::new("Item not found"));
        }
        Ok(json!({ "message": "Item deleted" }))
    }

    fn submit(&mut self, submit: SubmitRequest, now: NaiveDateTime) -> Result<Value, StubError> {
        let affected_courses: Vec<AffectedCourse> = serde_json::from_str(&submit.affected_courses)
            .map_err(|_| StubError::new("Affected courses are malformed"))?;
        let id = ExcuseId(self.next_id());
        let link = |name: &str| Some(format!("stub://excuses/{}/{}", id.0, name));

        let excuse = ExcuseRequest {
            id: id.clone(),
            student_id: submit.student_id,
            student_name: submit.student_name,
            student_major: submit.student_major,
            student_level: submit.student_level,
            excuse_type: Some(submit.excuse_type),
            excuse_date: Some(submit.excuse_date),
            num_days: submit.num_days,
            reason: submit.reason,
            hospital: submit.hospital,
            location: submit.location.map(|location| location.label().to_string()),
            relationship: submit
                .relationship_type
                .map(|relationship| relationship.label().to_string()),
            affected_courses,
            medical_link: link(&submit.files.medical.name),
            sehaty_link: link(&submit.files.sehaty.name),
            college_link: link(&submit.files.college.name),
            status: ExcuseStatus::Pending,
            employee_decision: Default::default(),
            committee_decision: Default::default(),
            committee_comment: String::new(),
            committee_signatures: Vec::new(),
            date: Some(now),
        };

        tracing::info!(excuse_id = %id, student_id = %excuse.student_id, "stub backend stored excuse");
        self.excuses.push(excuse);
        Ok(json!({ "id": id, "message": "Request submitted" }))
    }

    fn excuse_mut(&mut self, id: &ExcuseId) -> Result<&mut ExcuseRequest, StubError> {
        self.excuses
            .iter_mut()
            .find(|excuse| &excuse.id == id)
            .ok_or_else(|| StubError::new("Excuse not found"))
    }

    fn delete_excuse(&mut self, id: &ExcuseId) -> Result<Value, StubError> {
        let before = self.excuses.len();
        self.excuses.retain(|excuse| &excuse.id != id);
        if self.excuses.len() == before {
            return Err(StubError::new("Excuse not found"));
        }
        Ok(json!({ "message": "Excuse deleted" }))
    }

    fn update_decision(&mut self, update: UpdateDecision) -> Result<Value, StubError> {
        let excuse = self.excuse_mut(&update.id)?;
        let planned = plan_employee_decision(excuse, Some(update.decision))
            .map_err(|err| StubError::new(err.to_string()))?;
        excuse.employee_decision = planned.decision;
        Ok(json!({ "message": "Decision saved" }))
    }

    fn update_committee_decision(
        &mut self,
        update: UpdateCommitteeDecision,
    ) -> Result<Value, StubError> {
        let signatures = self.signatures.clone();
        let excuse = self.excuse_mut(&update.id)?;
        let input = CommitteeInput {
            decision: Some(update.decision),
            comment: update.comment,
            signatures: update.signatures,
        };
        let planned = plan_committee_decision(excuse, &input, &signatures)
            .map_err(|err| StubError::new(err.to_string()))?;

        excuse.committee_decision = planned.decision;
        excuse.committee_comment = planned.comment;
        excuse.committee_signatures = planned.signatures;
        excuse.status = match planned.decision {
            CommitteeDecision::Approved => ExcuseStatus::Approved,
            CommitteeDecision::Rejected => ExcuseStatus::Rejected,
            CommitteeDecision::Pending => ExcuseStatus::Pending,
        };
        Ok(json!({ "message": "Committee decision saved" }))
    }

    fn save_signature(&mut self, save: SaveSignature) -> Result<Value, StubError> {
        match save.id {
            Some(id) => {
                let signature = self
                    .signatures
                    .iter_mut()
                    .find(|signature| signature.id == id)
                    .ok_or_else(|| StubError::new("Signature not found"))?;
                signature.name = save.name;
                signature.position = save.position;
                signature.image_url = save.image_url;
            }
            None => {
                if self.signatures.len() >= MAX_SIGNATURES {
                    return Err(StubError::new(format!(
                        "At most {MAX_SIGNATURES} signatures can be active"
                    )));
                }
                let id = SignatureId(self.next_id());
                self.signatures.push(Signature {
                    id,
                    name: save.name,
                    position: save.position,
                    image_url: save.image_url,
                });
            }
        }
        Ok(json!({ "message": "Signature saved" }))
    }

    fn generate_pdf(&mut self, id: &ExcuseId) -> Result<Value, StubError> {
        let excuse = self.excuse_mut(id)?;
        if DecisionPhase::of(excuse) != DecisionPhase::Finalized {
            return Err(StubError::new("The excuse has not been finalized"));
        }

        let document = minimal_pdf(&format!(
            "Excuse {} - {} - {}",
            excuse.id,
            excuse.student_name,
            excuse.committee_decision.title()
        ));
        Ok(json!({
            "pdf_base64": STANDARD.encode(document),
            "filename": format!("excuse-{}.pdf", excuse.id),
        }))
    }
}

/// A one-page PDF showing `line`.
fn minimal_pdf(line: &str) -> Vec<u8> {
    let text: String = line
        .chars()
        .filter(|c| c.is_ascii() && !matches!(c, '(' | ')' | '\\'))
        .collect();
    let stream = format!("BT /F1 14 Tf 72 720 Td ({text}) Tj ET");
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >>".to_string(),
        format!("<< /Length {} >>\nstream\n{stream}\nendstream", stream.len()),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ];

    let mut pdf = String::from("%PDF-1.4\n");
    let mut offsets = Vec::with_capacity(objects.len());
    for (index, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.push_str(&format!("{} 0 obj\n{body}\nendobj\n", index + 1));
    }

    let xref = pdf.len();
    pdf.push_str(&format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1));
    for offset in offsets {
        pdf.push_str(&format!("{offset:010} 00000 n \n"));
    }
    pdf.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n",
        objects.len() + 1
    ));
    pdf.into_bytes()
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use excuse_portal::api::{GeneratePdf, GetAllExcuses};
    use excuse_portal::domain::EmployeeDecision;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 12)
            .and_then(|date| date.and_hms_opt(9, 30, 0))
            .expect("valid timestamp")
    }

    fn seeded_excuse(store: &mut StubStore) -> ExcuseId {
        let id = ExcuseId(store.next_id());
        store.excuses.push(ExcuseRequest {
            id: id.clone(),
            student_id: DEMO_STUDENT_ID.to_string(),
            student_name: "Sara Alharbi".to_string(),
            student_major: "Nursing".to_string(),
            student_level: "3".to_string(),
            excuse_type: Some(excuse_portal::domain::ExcuseType::Health),
            excuse_date: None,
            num_days: "1".to_string(),
            reason: String::new(),
            hospital: Some("H1".to_string()),
            location: Some("inside_jeddah".to_string()),
            relationship: None,
            affected_courses: Vec::new(),
            medical_link: None,
            sehaty_link: None,
            college_link: None,
            status: ExcuseStatus::Pending,
            employee_decision: EmployeeDecision::Pending,
            committee_decision: CommitteeDecision::Pending,
            committee_comment: String::new(),
            committee_signatures: Vec::new(),
            date: Some(now()),
        });
        id
    }

    #[test]
    fn committee_decision_requires_employee_decision() {
        let mut store = StubStore::seeded();
        let id = seeded_excuse(&mut store);

        let reply = store.handle(
            UpdateCommitteeDecision {
                id: id.clone(),
                decision: CommitteeDecision::Approved,
                comment: String::new(),
                signatures: Vec::new(),
            }
            .into(),
            now(),
        );
        assert_eq!(reply["status"], "error");

        let reply = store.handle(
            UpdateDecision {
                id: id.clone(),
                decision: EmployeeDecision::Committee,
            }
            .into(),
            now(),
        );
        assert_eq!(reply["status"], "success");

        let again = store.handle(
            UpdateDecision {
                id,
                decision: EmployeeDecision::Approved,
            }
            .into(),
            now(),
        );
        assert_eq!(again["status"], "error");
    }

    #[test]
    fn finalized_excuse_gets_status_and_document() {
        let mut store = StubStore::seeded();
        let id = seeded_excuse(&mut store);
        store.handle(
            UpdateDecision {
                id: id.clone(),
                decision: EmployeeDecision::Rejected,
            }
            .into(),
            now(),
        );
        let reply = store.handle(
            UpdateCommitteeDecision {
                id: id.clone(),
                decision: CommitteeDecision::Rejected,
                comment: "Late".to_string(),
                signatures: vec![SignatureId("1".to_string())],
            }
            .into(),
            now(),
        );
        assert_eq!(reply["status"], "success");

        let listing = store.handle(GetAllExcuses {}.into(), now());
        assert_eq!(listing["excuses"][0]["status"], "rejected");
        assert_eq!(listing["excuses"][0]["committee_signatures"], json!(["1"]));

        let pdf = store.handle(GeneratePdf { id }.into(), now());
        let bytes = STANDARD
            .decode(pdf["pdf_base64"].as_str().expect("payload"))
            .expect("base64");
        assert!(bytes.starts_with(b"%PDF-1.4"));
    }

    #[test]
    fn otp_is_single_use() {
        let mut store = StubStore::seeded();
        let login = || AdminLogin {
            email: DEMO_ADMIN_EMAIL.to_string(),
            otp: DEMO_OTP.to_string(),
        };

        assert_eq!(store.handle(login().into(), now())["status"], "error");
        store.handle(
            AdminRequestOtp {
                email: DEMO_ADMIN_EMAIL.to_string(),
            }
            .into(),
            now(),
        );
        assert_eq!(store.handle(login().into(), now())["status"], "success");
        assert_eq!(store.handle(login().into(), now())["status"], "error");
    }

    #[test]
    fn signature_limit_is_enforced() {
        let mut store = StubStore::seeded();
        for n in 0..MAX_SIGNATURES {
            let reply = store.handle(
                SaveSignature {
                    id: None,
                    name: format!("Member {n}"),
                    position: "Member".to_string(),
                    image_url: None,
                }
                .into(),
                now(),
            );
            let expected = if n + 1 < MAX_SIGNATURES { "success" } else { "error" };
            assert_eq!(reply["status"], expected);
        }
    }
}
