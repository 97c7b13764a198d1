use std::sync::{Arc, Mutex};

use chrono::{DateTime, SecondsFormat, Utc};

use super::attachments::{lock_slots, AttachmentSlots, AttachmentUploader};
use super::form::{StudentIdentity, WizardForm};
use super::validator::{StepValidator, ValidationReport, WizardStep};
use super::WizardError;
use crate::api::{PortalClient, SubmissionFiles, SubmitReceipt, SubmitRequest};
use crate::domain::{AttachmentSlot, ExcuseType};

/// Result of pressing "next".
#[derive(Debug, Clone, PartialEq)]
pub enum AdvanceOutcome {
    /// Validation failed; the step is unchanged and the report holds the
    /// markers to render.
    Blocked(ValidationReport),
    Moved(WizardStep),
    Submitted(SubmitReceipt),
}

impl AdvanceOutcome {
    pub fn advanced(&self) -> bool {
        !matches!(self, AdvanceOutcome::Blocked(_))
    }
}

/// Drives the linear four-step excuse submission.
pub struct WizardController {
    client: PortalClient,
    validator: StepValidator,
    identity: Option<StudentIdentity>,
    step: WizardStep,
    form: WizardForm,
    attachments: Arc<Mutex<AttachmentSlots>>,
    markers: Option<ValidationReport>,
}

impl WizardController {
    pub fn new(client: PortalClient) -> Self {
        Self {
            client,
            validator: StepValidator,
            identity: None,
            step: WizardStep::FIRST,
            form: WizardForm::default(),
            attachments: Arc::new(Mutex::new(AttachmentSlots::default())),
            markers: None,
        }
    }

    /// Open a fresh wizard for `identity`.
    pub fn open(&mut self, identity: StudentIdentity) {
        self.reset();
        tracing::debug!(student_id = %identity.id, "excuse wizard opened");
        self.identity = Some(identity);
    }

    pub fn is_open(&self) -> bool {
        self.identity.is_some()
    }

    pub fn identity(&self) -> Option<&StudentIdentity> {
        self.identity.as_ref()
    }

    pub fn current_step(&self) -> WizardStep {
        self.step
    }

    pub fn form(&self) -> &WizardForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut WizardForm {
        &mut self.form
    }

    /// Markers from the last blocked validation, cleared on every move.
    pub fn markers(&self) -> Option<&ValidationReport> {
        self.markers.as_ref()
    }

    pub fn attachments(&self) -> Arc<Mutex<AttachmentSlots>> {
        Arc::clone(&self.attachments)
    }

    pub fn uploader(&self) -> AttachmentUploader {
        AttachmentUploader::new(self.attachments())
    }

    pub fn validate(&self, step: WizardStep) -> ValidationReport {
        let slots = lock_slots(&self.attachments);
        self.validator.validate(step, &self.form, &slots)
    }

    /// Validate the current step and move forward; on the last step this
    /// submits instead.
    pub async fn advance(&mut self) -> Result<AdvanceOutcome, WizardError> {
        self.ensure_open()?;

        let report = self.validate(self.step);
        if !report.is_valid() {
            tracing::debug!(step = self.step.number(), marks = report.marks.len(), "wizard step blocked");
            self.markers = Some(report.clone());
            return Ok(AdvanceOutcome::Blocked(report));
        }
        self.markers = None;

        match self.step.next() {
            Some(next) => {
                self.step = next;
                Ok(AdvanceOutcome::Moved(next))
            }
            None => self.submit().await.map(AdvanceOutcome::Submitted),
        }
    }

    /// "Previous" on steps 2 through 4 cancels the whole wizard; step 1 has
    /// no back control. Returns whether the wizard was closed.
    pub fn retreat(&mut self) -> bool {
        if !self.is_open() || self.step == WizardStep::FIRST {
            return false;
        }
        self.cancel();
        true
    }

    pub fn cancel(&mut self) {
        self.reset();
        self.identity = None;
    }

    /// Back to step one with no values, attachments, or markers.
    pub fn reset(&mut self) {
        self.step = WizardStep::FIRST;
        self.form = WizardForm::default();
        lock_slots(&self.attachments).reset();
        self.markers = None;
    }

    /// Send the request. Only allowed from the final step once it validates;
    /// on failure everything stays as entered so the user can retry.
    pub async fn submit(&mut self) -> Result<SubmitReceipt, WizardError> {
        self.ensure_open()?;
        if self.step != WizardStep::LAST {
            return Err(WizardError::NotOnFinalStep { step: self.step });
        }

        let report = self.validate(self.step);
        if !report.is_valid() {
            self.markers = Some(report.clone());
            return Err(WizardError::Incomplete(report));
        }

        let request = self.build_request(Utc::now())?;
        let receipt = self.client.send(request).await?;

        tracing::info!(
            student_id = self.identity.as_ref().map(|i| i.id.as_str()).unwrap_or_default(),
            excuse_id = receipt.id.as_ref().map(|id| id.0.as_str()).unwrap_or_default(),
            "excuse request submitted"
        );
        self.cancel();
        Ok(receipt)
    }

    /// Assemble the submission payload from the collected state.
    pub fn build_request(&self, submitted_at: DateTime<Utc>) -> Result<SubmitRequest, WizardError> {
        let identity = self.identity.as_ref().ok_or(WizardError::Closed)?;
        let excuse_type = self
            .form
            .excuse_type()
            .ok_or_else(|| self.incomplete(WizardStep::Classification))?;
        let excuse_date = self
            .form
            .excuse_date
            .ok_or_else(|| self.incomplete(WizardStep::Schedule))?;

        let (hospital, location, relationship_type) = match excuse_type {
            ExcuseType::Health => (
                Some(self.form.hospital.trim().to_string()),
                self.form.location,
                None,
            ),
            ExcuseType::Death => (None, None, self.form.relationship),
        };

        let affected_courses = serde_json::to_string(&self.form.affected_courses())
            .map_err(WizardError::Payload)?;

        let num_days = match self.form.num_days.trim() {
            "" => "-".to_string(),
            days => days.to_string(),
        };

        Ok(SubmitRequest {
            student_id: identity.id.clone(),
            student_name: identity.name.clone(),
            student_major: identity.major.clone(),
            student_level: identity.level.clone(),
            excuse_type,
            excuse_date,
            submission_date: submitted_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            reason: self.form.reason.trim().to_string(),
            num_days,
            hospital,
            location,
            relationship_type,
            affected_courses,
            files: self.encoded_files()?,
        })
    }

    fn encoded_files(&self) -> Result<SubmissionFiles, WizardError> {
        let [medical, sehaty, college] = {
            let slots = lock_slots(&self.attachments);
            [
                AttachmentSlot::Medical,
                AttachmentSlot::Sehaty,
                AttachmentSlot::College,
            ]
            .map(|slot| slots.encoded(slot).cloned())
        };

        match (medical, sehaty, college) {
            (Some(medical), Some(sehaty), Some(college)) => Ok(SubmissionFiles {
                medical,
                sehaty,
                college,
            }),
            _ => Err(self.incomplete(WizardStep::Attachments)),
        }
    }

    fn incomplete(&self, step: WizardStep) -> WizardError {
        let slots = lock_slots(&self.attachments);
        WizardError::Incomplete(self.validator.validate(step, &self.form, &slots))
    }

    fn ensure_open(&self) -> Result<(), WizardError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(WizardError::Closed)
        }
    }
}
