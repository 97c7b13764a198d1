use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{decode_envelope, envelope_message, envelope_succeeded, ApiError, Reply};
use crate::domain::{
    AdminProfile, ExcuseId, ExcuseRequest, LookupEntry, Signature, StudentProfile,
};

macro_rules! envelope_reply {
    ($($reply:ty),+ $(,)?) => {
        $(
            impl Reply for $reply {
                fn from_value(action: &'static str, value: Value) -> Result<Self, ApiError> {
                    decode_envelope(action, value)
                }
            }
        )+
    };
}

envelope_reply!(
    Ack,
    LoginReply,
    AdminLoginReply,
    TermsReply,
    FormData,
    SettingsData,
    StudentRoster,
    SubmitReceipt,
    SignatureList,
    PdfDocument,
);

/// Success envelope with no payload beyond an optional message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginReply {
    #[serde(default)]
    pub student: StudentProfile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminLoginReply {
    #[serde(default)]
    pub admin: AdminProfile,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermsReply {
    #[serde(default)]
    pub terms: String,
}

/// Lookup tables used by the submission wizard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormData {
    #[serde(default)]
    pub courses: Vec<LookupEntry>,
    #[serde(default)]
    pub reasons: Vec<LookupEntry>,
    #[serde(default)]
    pub hospitals: Vec<LookupEntry>,
}

/// Admin settings screen: lookups plus the terms text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsData {
    #[serde(default)]
    pub hospitals: Vec<LookupEntry>,
    #[serde(default)]
    pub courses: Vec<LookupEntry>,
    #[serde(default)]
    pub reasons: Vec<LookupEntry>,
    #[serde(default)]
    pub terms: String,
}

impl SettingsData {
    pub fn form_data(&self) -> FormData {
        FormData {
            courses: self.courses.clone(),
            reasons: self.reasons.clone(),
            hospitals: self.hospitals.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRoster {
    #[serde(default)]
    pub students: Vec<StudentProfile>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    #[serde(default)]
    pub id: Option<ExcuseId>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureList {
    #[serde(default)]
    pub signatures: Vec<Signature>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfDocument {
    pub pdf_base64: String,
    pub filename: String,
}

/// Outcome of `verify_session`, which uses `valid`/`invalid` instead of the
/// usual success marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCheck {
    Valid(StudentProfile),
    Invalid { reason: Option<String> },
}

impl Reply for SessionCheck {
    fn from_value(action: &'static str, value: Value) -> Result<Self, ApiError> {
        match value.get("status").and_then(Value::as_str) {
            Some("valid") => {
                let student = value.get("student").cloned().unwrap_or(Value::Null);
                if student.is_null() {
                    return Ok(SessionCheck::Invalid {
                        reason: envelope_message(&value),
                    });
                }
                serde_json::from_value(student)
                    .map(SessionCheck::Valid)
                    .map_err(|source| ApiError::Decode { action, source })
            }
            Some("invalid") => Ok(SessionCheck::Invalid {
                reason: envelope_message(&value),
            }),
            _ => Err(ApiError::Application {
                action,
                message: envelope_message(&value),
            }),
        }
    }
}

/// Excuse records; the backend may answer with a bare array or with an
/// envelope carrying `excuses`. Rows that fail to decode are skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExcuseList(pub Vec<ExcuseRequest>);

impl ExcuseList {
    pub fn into_inner(self) -> Vec<ExcuseRequest> {
        self.0
    }
}

impl Reply for ExcuseList {
    fn from_value(action: &'static str, value: Value) -> Result<Self, ApiError> {
        let rows = match value {
            Value::Array(rows) => rows,
            Value::Object(mut fields) => {
                let envelope = Value::Object(fields.clone());
                if !envelope_succeeded(&envelope) {
                    return Err(ApiError::Application {
                        action,
                        message: envelope_message(&envelope),
                    });
                }
                match fields.remove("excuses").or_else(|| fields.remove("data")) {
                    Some(Value::Array(rows)) => rows,
                    _ => Vec::new(),
                }
            }
            Value::Null => Vec::new(),
            other => {
                return Err(ApiError::MalformedResponse {
                    action,
                    snippet: other.to_string(),
                })
            }
        };

        let mut excuses = Vec::with_capacity(rows.len());
        for row in rows {
            match serde_json::from_value::<ExcuseRequest>(row) {
                Ok(excuse) => excuses.push(excuse),
                Err(err) => {
                    tracing::warn!(action, error = %err, "skipping undecodable excuse row");
                }
            }
        }
        Ok(ExcuseList(excuses))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn excuse_list_accepts_bare_arrays_and_skips_bad_rows() {
        let list = ExcuseList::from_value(
            "get_all_excuses",
            json!([
                { "id": 1, "excuse_type": "health" },
                { "excuse_type": "death" },
                { "id": 2, "excuse_type": "vacation" }
            ]),
        )
        .expect("list decodes");

        assert_eq!(list.0.len(), 2);
        assert_eq!(list.0[0].id, ExcuseId("1".to_string()));
        assert_eq!(list.0[1].id, ExcuseId("2".to_string()));
        assert_eq!(list.0[1].excuse_type, None);
    }

    #[test]
    fn excuse_list_surfaces_error_envelopes() {
        let err = ExcuseList::from_value(
            "get_excuses",
            json!({ "status": "error", "message": "Sheet missing" }),
        )
        .expect_err("error envelope");

        assert_eq!(err.user_message(), "Sheet missing");
    }

    #[test]
    fn session_check_maps_valid_and_invalid() {
        let valid = SessionCheck::from_value(
            "verify_session",
            json!({ "status": "valid", "student": { "id": 7, "name": "Noor" } }),
        )
        .expect("valid decodes");
        assert!(matches!(valid, SessionCheck::Valid(ref s) if s.id == "7"));

        let invalid = SessionCheck::from_value("verify_session", json!({ "status": "invalid" }))
            .expect("invalid decodes");
        assert_eq!(invalid, SessionCheck::Invalid { reason: None });
    }

    #[test]
    fn missing_required_fields_are_decode_errors() {
        let err = PdfDocument::from_value("generate_pdf", json!({ "status": "success" }))
            .expect_err("pdf fields missing");
        assert!(matches!(err, ApiError::Decode { .. }));
    }
}
