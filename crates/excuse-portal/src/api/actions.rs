use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::responses::{
    Ack, AdminLoginReply, ExcuseList, FormData, LoginReply, PdfDocument, SessionCheck,
    SettingsData, SignatureList, StudentRoster, SubmitReceipt, TermsReply,
};
use super::Action;
use crate::domain::{
    lenient, AttachmentSlot, CommitteeDecision, EmployeeDecision, EncodedAttachment, ExcuseId,
    ExcuseType, HospitalLocation, LookupCategory, Relationship, SignatureId,
};

macro_rules! portal_actions {
    ($($variant:ident => $name:literal, $response:ty;)+) => {
        /// Every request the portal backend understands, tagged by `action`.
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(tag = "action")]
        pub enum ApiRequest {
            $(
                #[serde(rename = $name)]
                $variant($variant),
            )+
        }

        impl ApiRequest {
            pub fn name(&self) -> &'static str {
                match self {
                    $(ApiRequest::$variant(_) => $name,)+
                }
            }
        }

        $(
            impl From<$variant> for ApiRequest {
                fn from(value: $variant) -> Self {
                    ApiRequest::$variant(value)
                }
            }

            impl Action for $variant {
                const NAME: &'static str = $name;
                type Response = $response;
            }
        )+
    };
}

portal_actions! {
    Login => "login", LoginReply;
    VerifySession => "verify_session", SessionCheck;
    AdminRequestOtp => "admin_request_otp", Ack;
    AdminLogin => "admin_login", AdminLoginReply;
    GetTerms => "get_terms", TermsReply;
    AcceptTerms => "accept_terms", Ack;
    UpdateTerms => "update_terms", Ack;
    GetFormData => "get_form_data", FormData;
    GetSettingsData => "get_settings_data", SettingsData;
    AddItem => "add_item", Ack;
    UpdateItem => "update_item", Ack;
    DeleteItem => "delete_item", Ack;
    GetStudents => "get_students", StudentRoster;
    SubmitRequest => "submit_request", SubmitReceipt;
    GetExcuses => "get_excuses", ExcuseList;
    GetAllExcuses => "get_all_excuses", ExcuseList;
    DeleteExcuse => "delete_excuse", Ack;
    UpdateDecision => "update_decision", Ack;
    UpdateCommitteeDecision => "update_committee_decision", Ack;
    GetSignatures => "get_signatures", SignatureList;
    SaveSignature => "save_signature", Ack;
    DeleteSignature => "delete_signature", Ack;
    GeneratePdf => "generate_pdf", PdfDocument;
}

/// Student sign-in; the password is the student's university id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Login {
    pub email: String,
    #[serde(deserialize_with = "lenient::id_string")]
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifySession {
    #[serde(deserialize_with = "lenient::id_string")]
    pub student_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminRequestOtp {
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminLogin {
    pub email: String,
    #[serde(deserialize_with = "lenient::id_string")]
    pub otp: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetTerms {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptTerms {
    #[serde(deserialize_with = "lenient::id_string")]
    pub student_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTerms {
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetFormData {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetSettingsData {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddItem {
    pub category: LookupCategory,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateItem {
    pub category: LookupCategory,
    #[serde(deserialize_with = "lenient::id_string")]
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteItem {
    pub category: LookupCategory,
    #[serde(deserialize_with = "lenient::id_string")]
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetStudents {}

/// The three processed uploads sent with a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionFiles {
    pub medical: EncodedAttachment,
    pub sehaty: EncodedAttachment,
    pub college: EncodedAttachment,
}

impl SubmissionFiles {
    pub fn get(&self, slot: AttachmentSlot) -> &EncodedAttachment {
        match slot {
            AttachmentSlot::Medical => &self.medical,
            AttachmentSlot::Sehaty => &self.sehaty,
            AttachmentSlot::College => &self.college,
        }
    }
}

/// New excuse request. `affected_courses` travels as a JSON-encoded string
/// of complete `{course, reason}` rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitRequest {
    #[serde(deserialize_with = "lenient::id_string")]
    pub student_id: String,
    pub student_name: String,
    pub student_major: String,
    #[serde(deserialize_with = "lenient::id_string")]
    pub student_level: String,
    pub excuse_type: ExcuseType,
    pub excuse_date: NaiveDate,
    pub submission_date: String,
    #[serde(default)]
    pub reason: String,
    #[serde(deserialize_with = "lenient::id_string")]
    pub num_days: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hospital: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<HospitalLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_type: Option<Relationship>,
    pub affected_courses: String,
    pub files: SubmissionFiles,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetExcuses {
    #[serde(deserialize_with = "lenient::id_string")]
    pub student_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetAllExcuses {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteExcuse {
    pub id: ExcuseId,
}

/// Phase-one transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDecision {
    pub id: ExcuseId,
    pub decision: EmployeeDecision,
}

/// Phase-two transition; comment and signatures ride along.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCommitteeDecision {
    pub id: ExcuseId,
    pub decision: CommitteeDecision,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub signatures: Vec<SignatureId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetSignatures {}

/// Create (no id) or edit (id present) a signatory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveSignature {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<SignatureId>,
    pub name: String,
    pub position: String,
    #[serde(default, rename = "imageUrl", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteSignature {
    pub id: SignatureId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratePdf {
    pub id: ExcuseId,
}
