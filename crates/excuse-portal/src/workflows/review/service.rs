use std::io::Write;
use std::path::{Path, PathBuf};

use super::decision::{plan_committee_decision, plan_employee_decision, CommitteeInput};
use super::documents::write_pdf;
use super::export::export_csv;
use super::listing::{sort_newest_first, ExcuseFilter};
use super::{DecisionPhase, DecisionView, ReviewError};
use crate::api::{DeleteExcuse, GeneratePdf, GetAllExcuses, GetSignatures, PortalClient};
use crate::domain::{EmployeeDecision, ExcuseId, ExcuseRequest, Signature};
use crate::lookup::SessionContext;

/// A decision the backend accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedDecision {
    pub view: DecisionView,
    /// `false` when the follow-up reload failed. The view is then derived
    /// from the cached record with the saved decision applied, so the
    /// decided phase stays locked.
    pub refreshed: bool,
}

/// Holds the admin's loaded records and drives decision transitions.
///
/// Nothing changes locally until the backend accepts a transition. After
/// that the list is reloaded and the view re-derived from the backend.
pub struct ReviewService {
    client: PortalClient,
    context: SessionContext,
    excuses: Vec<ExcuseRequest>,
    signatures: Vec<Signature>,
}

impl ReviewService {
    /// Requires an initialized session so lookups exist before any record.
    pub fn new(client: PortalClient, context: SessionContext) -> Self {
        Self {
            client,
            context,
            excuses: Vec::new(),
            signatures: Vec::new(),
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn excuses(&self) -> &[ExcuseRequest] {
        &self.excuses
    }

    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    /// Fetch signatures and all excuses, newest first. On failure the
    /// previously loaded state is kept.
    pub async fn reload(&mut self) -> Result<usize, ReviewError> {
        let signatures = self.client.send(GetSignatures {}).await?.signatures;
        let mut excuses = self.client.send(GetAllExcuses {}).await?.into_inner();
        sort_newest_first(&mut excuses);

        tracing::debug!(
            excuses = excuses.len(),
            signatures = signatures.len(),
            "review list reloaded"
        );
        self.signatures = signatures;
        self.excuses = excuses;
        Ok(self.excuses.len())
    }

    pub fn find(&self, id: &ExcuseId) -> Result<&ExcuseRequest, ReviewError> {
        self.excuses
            .iter()
            .find(|excuse| &excuse.id == id)
            .ok_or_else(|| ReviewError::NotFound(id.clone()))
    }

    pub fn view(&self, id: &ExcuseId) -> Result<DecisionView, ReviewError> {
        let excuse = self.find(id)?;
        Ok(DecisionView::for_excuse(excuse, &self.signatures))
    }

    pub fn filtered(&self, filter: &ExcuseFilter) -> Vec<&ExcuseRequest> {
        filter.apply(&self.excuses)
    }

    /// Phase one: persist approved, rejected, or committee.
    pub async fn save_employee_decision(
        &mut self,
        id: &ExcuseId,
        choice: Option<EmployeeDecision>,
    ) -> Result<SavedDecision, ReviewError> {
        let request = plan_employee_decision(self.find(id)?, choice)?;
        let decision = request.decision;
        self.client.send(request).await?;
        tracing::info!(excuse_id = %id, decision = decision.label(), "employee decision saved");

        if let Some(excuse) = self.cached_mut(id) {
            excuse.employee_decision = decision;
        }
        self.settle(id).await
    }

    /// Phase two: persist the committee outcome, comment and signatories.
    pub async fn save_committee_decision(
        &mut self,
        id: &ExcuseId,
        input: &CommitteeInput,
    ) -> Result<SavedDecision, ReviewError> {
        let request = plan_committee_decision(self.find(id)?, input, &self.signatures)?;
        let applied = request.clone();
        self.client.send(request).await?;
        tracing::info!(
            excuse_id = %id,
            decision = applied.decision.label(),
            signatures = applied.signatures.len(),
            "committee decision saved"
        );

        if let Some(excuse) = self.cached_mut(id) {
            excuse.committee_decision = applied.decision;
            excuse.committee_comment = applied.comment;
            excuse.committee_signatures = applied.signatures;
        }
        self.settle(id).await
    }

    pub async fn delete_excuse(&mut self, id: &ExcuseId) -> Result<(), ReviewError> {
        self.find(id)?;
        self.client.send(DeleteExcuse { id: id.clone() }).await?;
        tracing::info!(excuse_id = %id, "excuse deleted");
        self.reload().await?;
        Ok(())
    }

    /// Render a finalized excuse to PDF and save it into `directory`.
    pub async fn download_pdf(
        &self,
        id: &ExcuseId,
        directory: &Path,
    ) -> Result<PathBuf, ReviewError> {
        let excuse = self.find(id)?;
        if DecisionPhase::of(excuse) != DecisionPhase::Finalized {
            return Err(ReviewError::NotFinalized(id.clone()));
        }

        let document = self.client.send(GeneratePdf { id: id.clone() }).await?;
        write_pdf(&document, id, directory).await
    }

    pub fn export_csv<W: Write>(
        &self,
        writer: W,
        filter: &ExcuseFilter,
    ) -> Result<usize, ReviewError> {
        export_csv(writer, &self.filtered(filter), self.context.lookups())
    }

    fn cached_mut(&mut self, id: &ExcuseId) -> Option<&mut ExcuseRequest> {
        self.excuses.iter_mut().find(|excuse| &excuse.id == id)
    }

    /// The save is already persisted; a failed reload only leaves the list
    /// stale.
    async fn settle(&mut self, id: &ExcuseId) -> Result<SavedDecision, ReviewError> {
        let refreshed = match self.reload().await {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!(excuse_id = %id, error = %err, "decision saved but list not refreshed");
                false
            }
        };
        Ok(SavedDecision {
            view: self.view(id)?,
            refreshed,
        })
    }
}
