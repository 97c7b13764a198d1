//! Administrative review of submitted excuses.
//!
//! Review happens in two sequential phases: an employee triages the request,
//! then the committee records the final outcome with an optional comment and
//! signatories. The phase is never stored; it is derived from the two
//! decision fields every time records are (re)loaded.

mod decision;
mod documents;
mod export;
mod listing;
mod service;

#[cfg(test)]
mod tests;

use std::path::PathBuf;

pub use decision::{
    plan_committee_decision, plan_employee_decision, CommitteeInput, CommitteePanel,
    DecisionPhase, DecisionView, EmployeePanel, SignatureBadge, COMMITTEE_CHOICES,
    EMPLOYEE_CHOICES,
};
pub use documents::{sanitize_filename, write_pdf};
pub use export::{export_csv, CSV_HEADERS};
pub use listing::{paginate, sort_newest_first, ExcuseFilter, Page};
pub use service::{ReviewService, SavedDecision};

use crate::api::ApiError;
use crate::domain::{ExcuseId, SignatureId};

#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("no decision was selected")]
    NoSelection,
    #[error("the {phase} phase is already decided for excuse {id}")]
    PhaseLocked { id: ExcuseId, phase: &'static str },
    #[error("excuse {id} has no employee decision yet")]
    CommitteeNotReady { id: ExcuseId },
    #[error("{chosen} signatures chosen but at most {max} are allowed")]
    TooManySignatures { chosen: usize, max: usize },
    #[error("signature {0} does not exist")]
    UnknownSignature(SignatureId),
    #[error("excuse {0} was not found")]
    NotFound(ExcuseId),
    #[error("excuse {0} is not finalized; no document is available")]
    NotFinalized(ExcuseId),
    #[error("document payload is not valid base64: {0}")]
    InvalidDocument(#[from] base64::DecodeError),
    #[error("could not write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("csv export failed: {0}")]
    Export(#[from] csv::Error),
    #[error(transparent)]
    Api(#[from] ApiError),
}
