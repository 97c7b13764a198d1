//! Student and administrator workflows for academic absence excuses.
//!
//! All persistence lives behind a single JSON POST endpoint; this crate owns
//! the typed action protocol, the submission wizard, and the two-phase review
//! state machine that sit in front of it.

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod lookup;
pub mod telemetry;
pub mod workflows;
