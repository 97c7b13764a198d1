//! Session-scoped lookup tables.
//!
//! Courses, reasons, hospitals and (for administrators) the student roster are
//! fetched once per session and passed explicitly to everything that renders
//! ids as names. Record lists are only loaded through an initialized
//! [`SessionContext`], so names are always resolvable when records arrive.

mod cache;

use std::collections::BTreeMap;

pub use cache::{CacheError, FormDataCache};

use crate::api::{ApiError, FormData, GetFormData, GetStudents, PortalClient};
use crate::domain::{LookupEntry, StudentProfile};

const MISSING: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionScope {
    Student,
    Admin,
}

/// Id to name maps for the three lookup categories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupTables {
    courses: BTreeMap<String, String>,
    reasons: BTreeMap<String, String>,
    hospitals: BTreeMap<String, String>,
}

impl LookupTables {
    pub fn from_form_data(data: &FormData) -> Self {
        fn index(entries: &[LookupEntry]) -> BTreeMap<String, String> {
            entries
                .iter()
                .map(|entry| (entry.id.clone(), entry.name.clone()))
                .collect()
        }

        Self {
            courses: index(&data.courses),
            reasons: index(&data.reasons),
            hospitals: index(&data.hospitals),
        }
    }

    pub fn course_name(&self, id: &str) -> String {
        resolve(&self.courses, id)
    }

    pub fn reason_name(&self, id: &str) -> String {
        resolve(&self.reasons, id)
    }

    /// Hospitals are stored by name on older records, so unknown values are
    /// shown as-is.
    pub fn hospital_name(&self, id: &str) -> String {
        resolve(&self.hospitals, id)
    }
}

fn resolve(table: &BTreeMap<String, String>, id: &str) -> String {
    let id = id.trim();
    if id.is_empty() {
        return MISSING.to_string();
    }
    table.get(id).cloned().unwrap_or_else(|| id.to_string())
}

/// Lookup state for one signed-in session.
#[derive(Debug, Clone)]
pub struct SessionContext {
    scope: SessionScope,
    form_data: FormData,
    lookups: LookupTables,
    roster: BTreeMap<String, StudentProfile>,
}

impl SessionContext {
    /// Load lookups (from the local cache when fresh) and, for admins, the
    /// student roster.
    pub async fn initialize(
        client: &PortalClient,
        cache: Option<&FormDataCache>,
        scope: SessionScope,
    ) -> Result<Self, ApiError> {
        let cached = cache.and_then(FormDataCache::load);
        let form_data = match cached {
            Some(data) => data,
            None => {
                let data = client.send(GetFormData {}).await?;
                if let Some(cache) = cache {
                    if let Err(err) = cache.store(&data) {
                        tracing::warn!(error = %err, "could not persist form data cache");
                    }
                }
                data
            }
        };

        let roster = match scope {
            SessionScope::Admin => client.send(GetStudents {}).await?.students,
            SessionScope::Student => Vec::new(),
        };

        tracing::debug!(
            courses = form_data.courses.len(),
            reasons = form_data.reasons.len(),
            hospitals = form_data.hospitals.len(),
            students = roster.len(),
            "session context initialized"
        );

        Ok(Self::from_parts(scope, form_data, roster))
    }

    pub fn from_parts(scope: SessionScope, form_data: FormData, roster: Vec<StudentProfile>) -> Self {
        let lookups = LookupTables::from_form_data(&form_data);
        let roster = roster
            .into_iter()
            .map(|student| (student.id.clone(), student))
            .collect();

        Self {
            scope,
            form_data,
            lookups,
            roster,
        }
    }

    pub fn scope(&self) -> SessionScope {
        self.scope
    }

    /// Selectable options for the wizard's inputs.
    pub fn form_data(&self) -> &FormData {
        &self.form_data
    }

    pub fn lookups(&self) -> &LookupTables {
        &self.lookups
    }

    pub fn student(&self, id: &str) -> Option<&StudentProfile> {
        self.roster.get(id.trim())
    }

    pub fn roster_len(&self) -> usize {
        self.roster.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ScriptedTransport;
    use serde_json::json;
    use std::sync::Arc;

    fn entry(id: &str, name: &str) -> LookupEntry {
        LookupEntry {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn names_fall_back_to_id_then_dash() {
        let tables = LookupTables::from_form_data(&FormData {
            courses: vec![entry("C1", "Anatomy")],
            reasons: vec![entry("R1", "Illness")],
            hospitals: vec![],
        });

        assert_eq!(tables.course_name("C1"), "Anatomy");
        assert_eq!(tables.course_name("C9"), "C9");
        assert_eq!(tables.reason_name(""), "-");
        assert_eq!(tables.hospital_name("King Fahad"), "King Fahad");
    }

    #[tokio::test]
    async fn admin_sessions_load_lookups_before_roster() {
        let transport = ScriptedTransport::new();
        transport
            .push_success(json!({ "courses": [{ "id": 1, "name": "Anatomy" }] }))
            .push_success(json!({ "students": [{ "id": 441200, "name": "Sara" }] }));
        let client = PortalClient::new(Arc::new(transport.clone()));

        let context = SessionContext::initialize(&client, None, SessionScope::Admin)
            .await
            .expect("context loads");

        assert_eq!(transport.actions(), vec!["get_form_data", "get_students"]);
        assert_eq!(context.lookups().course_name("1"), "Anatomy");
        assert_eq!(
            context.student("441200").map(|s| s.name.as_str()),
            Some("Sara")
        );
    }

    #[tokio::test]
    async fn student_sessions_skip_the_roster() {
        let transport = ScriptedTransport::new();
        transport.push_success(json!({}));
        let client = PortalClient::new(Arc::new(transport.clone()));

        let context = SessionContext::initialize(&client, None, SessionScope::Student)
            .await
            .expect("context loads");

        assert_eq!(transport.actions(), vec!["get_form_data"]);
        assert_eq!(context.roster_len(), 0);
    }
}
