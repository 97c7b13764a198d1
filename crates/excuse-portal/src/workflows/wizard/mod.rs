//! Four-step excuse submission wizard.
//!
//! Step one confirms the student's identity, step two classifies the excuse,
//! step three captures dates and affected courses, and step four collects the
//! three supporting documents. Forward navigation is gated by
//! [`StepValidator`]; the last step submits.

pub mod attachments;
mod controller;
mod form;
mod validator;

#[cfg(test)]
mod tests;

use std::path::PathBuf;

pub use attachments::{
    AttachmentSlots, AttachmentUploader, ReadTicket, SelectedFile, SlotState,
    MAX_ATTACHMENT_BYTES,
};
pub use controller::{AdvanceOutcome, WizardController};
pub use form::{CourseRow, StudentIdentity, WizardForm};
pub use validator::{
    CourseCell, FieldId, FieldIssue, FieldMark, StepValidator, ValidationReport, WizardStep,
};

use crate::api::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error("the wizard is not open")]
    Closed,
    #[error("submission is only possible from the final step (currently on {step})")]
    NotOnFinalStep { step: WizardStep },
    #[error("{0}")]
    Incomplete(ValidationReport),
    #[error("could not read attachment {}: {source}", .path.display())]
    Attachment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("submission payload could not be encoded: {0}")]
    Payload(#[source] serde_json::Error),
    #[error(transparent)]
    Api(#[from] ApiError),
}
