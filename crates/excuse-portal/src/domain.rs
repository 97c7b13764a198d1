//! Records exchanged with the portal backend.
//!
//! Backend rows come from a spreadsheet-style store, so decoding is lenient:
//! ids arrive as numbers or strings, decisions may be empty strings, and
//! `affected_courses` may be a JSON-encoded string rather than an array.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier wrapper for submitted excuse requests.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExcuseId(#[serde(deserialize_with = "lenient::id_string")] pub String);

impl fmt::Display for ExcuseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for reusable signatory entities.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SignatureId(#[serde(deserialize_with = "lenient::id_string")] pub String);

impl fmt::Display for SignatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Error returned when a textual enum value is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($(#[$vmeta:meta])* $variant:ident => $label:literal, $title:literal;)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            /// Value used on the wire.
            pub const fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }

            /// Human readable badge text.
            pub const fn title(self) -> &'static str {
                match self {
                    $($name::$variant => $title,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                let normalized = value.trim().to_ascii_lowercase();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|candidate| candidate.label() == normalized)
                    .ok_or_else(|| UnknownVariant {
                        kind: $kind,
                        value: value.to_string(),
                    })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.title())
            }
        }
    };
}

wire_enum! {
    /// Category of absence; decides which conditional fields are required.
    ExcuseType, "excuse type" {
        Health => "health", "Health excuse";
        Death => "death", "Bereavement";
    }
}

wire_enum! {
    HospitalLocation, "hospital location" {
        InsideJeddah => "inside_jeddah", "Inside Jeddah";
        OutsideJeddah => "outside_jeddah", "Outside Jeddah";
    }
}

wire_enum! {
    Relationship, "relationship" {
        Father => "father", "Father";
        Mother => "mother", "Mother";
        Sibling => "sibling", "Sibling";
        Grandparent => "grandparent", "Grandparent";
        Other => "other", "Other";
    }
}

wire_enum! {
    /// Overall display status, independent of the two decision phases.
    #[derive(Default)]
    ExcuseStatus, "status" {
        #[default]
        Pending => "pending", "Under review";
        Approved => "approved", "Accepted";
        Rejected => "rejected", "Not accepted";
        Mismatch => "mismatch", "Mismatch";
        Late => "late", "Late";
    }
}

wire_enum! {
    /// Phase-one triage outcome.
    #[derive(Default)]
    EmployeeDecision, "employee decision" {
        #[default]
        Pending => "pending", "Pending";
        Approved => "approved", "Approved";
        Rejected => "rejected", "Rejected";
        Committee => "committee", "Referred to committee";
    }
}

wire_enum! {
    /// Phase-two final outcome.
    #[derive(Default)]
    CommitteeDecision, "committee decision" {
        #[default]
        Pending => "pending", "Pending";
        Approved => "approved", "Approved";
        Rejected => "rejected", "Rejected";
    }
}

wire_enum! {
    /// Named upload slots on the final wizard step.
    AttachmentSlot, "attachment slot" {
        Medical => "medical", "Medical report";
        Sehaty => "sehaty", "Sehaty excuse";
        College => "college", "College form";
    }
}

wire_enum! {
    /// Admin-managed lookup tables.
    LookupCategory, "lookup category" {
        Hospitals => "hospitals", "Hospitals";
        Courses => "courses", "Courses";
        Reasons => "reasons", "Reasons";
    }
}

impl EmployeeDecision {
    pub const fn is_locked(self) -> bool {
        !matches!(self, EmployeeDecision::Pending)
    }
}

impl CommitteeDecision {
    pub const fn is_locked(self) -> bool {
        !matches!(self, CommitteeDecision::Pending)
    }
}

/// `{id, name}` pair backing courses, reasons, and hospitals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupEntry {
    #[serde(deserialize_with = "lenient::id_string")]
    pub id: String,
    pub name: String,
}

/// One affected course and the reason it was missed, both by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffectedCourse {
    #[serde(deserialize_with = "lenient::id_string")]
    pub course: String,
    #[serde(deserialize_with = "lenient::id_string")]
    pub reason: String,
}

/// Reusable signatory attachable to committee decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub id: SignatureId,
    pub name: String,
    #[serde(default)]
    pub position: String,
    #[serde(default, rename = "imageUrl", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Maximum number of active signatures system-wide.
pub const MAX_SIGNATURES: usize = 4;

/// Student identity as returned by login and session verification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
    #[serde(default, deserialize_with = "lenient::id_string")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default, rename = "nationalId", deserialize_with = "lenient::id_string")]
    pub national_id: String,
    #[serde(default, deserialize_with = "lenient::id_string")]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub major: String,
    #[serde(default, deserialize_with = "lenient::id_string")]
    pub level: String,
    #[serde(default, rename = "termsAgreed", deserialize_with = "lenient::flag")]
    pub terms_agreed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminProfile {
    #[serde(default, deserialize_with = "lenient::id_string")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub receive_notifications: bool,
}

/// Conditional attributes of an excuse; exactly one branch per type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExcuseDetails {
    Health {
        hospital: String,
        location: Option<HospitalLocation>,
    },
    Death {
        relationship: Option<Relationship>,
    },
}

/// A submitted excuse as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcuseRequest {
    pub id: ExcuseId,
    #[serde(default, deserialize_with = "lenient::id_string")]
    pub student_id: String,
    #[serde(default)]
    pub student_name: String,
    #[serde(default)]
    pub student_major: String,
    #[serde(default, deserialize_with = "lenient::id_string")]
    pub student_level: String,
    /// `None` for legacy rows with a blank or unrecognised type.
    #[serde(default, deserialize_with = "lenient::optional_wire_enum")]
    pub excuse_type: Option<ExcuseType>,
    #[serde(default, deserialize_with = "lenient::optional_date")]
    pub excuse_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::id_string")]
    pub num_days: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default, deserialize_with = "lenient::optional_text")]
    pub hospital: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_text")]
    pub location: Option<String>,
    #[serde(
        default,
        alias = "relationship_type",
        deserialize_with = "lenient::optional_text"
    )]
    pub relationship: Option<String>,
    #[serde(default, deserialize_with = "lenient::json_list")]
    pub affected_courses: Vec<AffectedCourse>,
    #[serde(default, deserialize_with = "lenient::optional_text")]
    pub medical_link: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_text")]
    pub sehaty_link: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_text")]
    pub college_link: Option<String>,
    #[serde(default, deserialize_with = "lenient::wire_enum")]
    pub status: ExcuseStatus,
    #[serde(default, deserialize_with = "lenient::wire_enum")]
    pub employee_decision: EmployeeDecision,
    #[serde(default, deserialize_with = "lenient::wire_enum")]
    pub committee_decision: CommitteeDecision,
    #[serde(default)]
    pub committee_comment: String,
    #[serde(default, deserialize_with = "lenient::id_list")]
    pub committee_signatures: Vec<SignatureId>,
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub date: Option<NaiveDateTime>,
}

impl ExcuseRequest {
    /// The branch of conditional fields matching `excuse_type`; the other
    /// branch is ignored even if the backend row carries stale values.
    pub fn details(&self) -> Option<ExcuseDetails> {
        let details = match self.excuse_type? {
            ExcuseType::Health => ExcuseDetails::Health {
                hospital: self.hospital.clone().unwrap_or_default(),
                location: self
                    .location
                    .as_deref()
                    .and_then(|raw| raw.parse::<HospitalLocation>().ok()),
            },
            ExcuseType::Death => ExcuseDetails::Death {
                relationship: self
                    .relationship
                    .as_deref()
                    .and_then(|raw| raw.parse::<Relationship>().ok()),
            },
        };
        Some(details)
    }

    /// Badge text for the excuse type, `-` when the row has none.
    pub fn type_title(&self) -> &'static str {
        self.excuse_type.map(ExcuseType::title).unwrap_or("-")
    }

    pub fn attachment_link(&self, slot: AttachmentSlot) -> Option<&str> {
        match slot {
            AttachmentSlot::Medical => self.medical_link.as_deref(),
            AttachmentSlot::Sehaty => self.sehaty_link.as_deref(),
            AttachmentSlot::College => self.college_link.as_deref(),
        }
    }
}

/// Base64 payload of one processed attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedAttachment {
    pub name: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub data: String,
}

/// Parse a submission timestamp in any of the formats the backend has used.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.naive_utc());
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(parsed);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }

    // Legacy rows: DD/MM/YYYY[,] HH:MM[:SS]
    let legacy = trimmed.replace(',', "");
    for format in ["%d/%m/%Y %H:%M:%S", "%d/%m/%Y %H:%M"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(&legacy, format) {
            return Some(parsed);
        }
    }
    NaiveDate::parse_from_str(&legacy, "%d/%m/%Y")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

pub(crate) mod lenient {
    use super::*;

    fn scalar_text(value: Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::String(text) => Some(text.trim().to_string()),
            Value::Number(number) => Some(number.to_string()),
            Value::Bool(flag) => Some(flag.to_string()),
            other => Some(other.to_string()),
        }
    }

    pub fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(scalar_text(value).unwrap_or_default())
    }

    pub fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(scalar_text(value).filter(|text| !text.is_empty()))
    }

    pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::Bool(flag) => flag,
            Value::String(text) => matches!(
                text.trim().to_ascii_lowercase().as_str(),
                "true" | "yes" | "1"
            ),
            Value::Number(number) => number.as_i64().map(|n| n != 0).unwrap_or(false),
            _ => false,
        })
    }

    /// Unknown or blank values fall back to the enum default (pending).
    pub fn wire_enum<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: FromStr + Default,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(scalar_text(value)
            .and_then(|text| text.parse::<T>().ok())
            .unwrap_or_default())
    }

    pub fn optional_wire_enum<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: FromStr,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(scalar_text(value).and_then(|text| text.parse::<T>().ok()))
    }

    pub fn optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(scalar_text(value)
            .and_then(|text| parse_timestamp(&text))
            .map(|stamp| stamp.date()))
    }

    pub fn timestamp<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(scalar_text(value).and_then(|text| parse_timestamp(&text)))
    }

    /// Accepts an array, a JSON-encoded array string, or nothing.
    pub fn json_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let value = Value::deserialize(deserializer)?;
        match value {
            Value::Null => Ok(Vec::new()),
            Value::Array(_) => serde_json::from_value(value).map_err(serde::de::Error::custom),
            Value::String(text) if text.trim().starts_with('[') => {
                serde_json::from_str(text.trim()).map_err(serde::de::Error::custom)
            }
            _ => Ok(Vec::new()),
        }
    }

    /// Accepts an array of ids or a comma separated string.
    pub fn id_list<'de, D>(deserializer: D) -> Result<Vec<SignatureId>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let items: Vec<String> = match value {
            Value::Array(items) => items.into_iter().filter_map(scalar_text).collect(),
            Value::String(text) if text.trim().starts_with('[') => {
                let parsed: Vec<Value> =
                    serde_json::from_str(text.trim()).map_err(serde::de::Error::custom)?;
                parsed.into_iter().filter_map(scalar_text).collect()
            }
            Value::String(text) => text.split(',').map(|part| part.trim().to_string()).collect(),
            Value::Number(number) => vec![number.to_string()],
            _ => Vec::new(),
        };

        Ok(items
            .into_iter()
            .filter(|item| !item.is_empty())
            .map(SignatureId)
            .collect())
    }
}
