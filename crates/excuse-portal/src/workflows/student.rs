//! The signed-in student's side of the portal.

use crate::api::{ApiError, GetExcuses, PortalClient, SubmitReceipt};
use crate::config::ListingConfig;
use crate::domain::{ExcuseRequest, StudentProfile};
use crate::lookup::SessionContext;
use crate::workflows::review::{paginate, sort_newest_first, Page};
use crate::workflows::wizard::{StudentIdentity, WizardController, WizardError};

pub struct StudentPortal {
    client: PortalClient,
    profile: StudentProfile,
    context: SessionContext,
    requests: Vec<ExcuseRequest>,
    page_size: usize,
}

impl StudentPortal {
    pub fn new(
        client: PortalClient,
        profile: StudentProfile,
        context: SessionContext,
        listing: &ListingConfig,
    ) -> Self {
        Self {
            client,
            profile,
            context,
            requests: Vec::new(),
            page_size: listing.student_page_size,
        }
    }

    pub fn profile(&self) -> &StudentProfile {
        &self.profile
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn requests(&self) -> &[ExcuseRequest] {
        &self.requests
    }

    /// A wizard pre-filled with the student's identity.
    pub fn open_wizard(&self) -> WizardController {
        let mut wizard = WizardController::new(self.client.clone());
        wizard.open(StudentIdentity::from(&self.profile));
        wizard
    }

    /// Submit the wizard and refresh the request list. A failed refresh is
    /// logged; the submission itself already succeeded.
    pub async fn submit(
        &mut self,
        wizard: &mut WizardController,
    ) -> Result<SubmitReceipt, WizardError> {
        let receipt = wizard.submit().await?;
        if let Err(err) = self.refresh_requests().await {
            tracing::warn!(error = %err, "request list not refreshed after submission");
        }
        Ok(receipt)
    }

    pub async fn refresh_requests(&mut self) -> Result<usize, ApiError> {
        let mut requests = self
            .client
            .send(GetExcuses {
                student_id: self.profile.id.clone(),
            })
            .await?
            .into_inner();
        sort_newest_first(&mut requests);
        self.requests = requests;
        Ok(self.requests.len())
    }

    pub fn requests_page(&self, page: usize) -> Page<'_, ExcuseRequest> {
        paginate(&self.requests, page, self.page_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{FormData, ScriptedTransport};
    use crate::lookup::SessionScope;
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn portal() -> (ScriptedTransport, StudentPortal) {
        let transport = ScriptedTransport::new();
        let client = PortalClient::new(Arc::new(transport.clone()));
        let profile = StudentProfile {
            id: "441200".to_string(),
            name: "Sara".to_string(),
            major: "Nursing".to_string(),
            level: "3".to_string(),
            ..StudentProfile::default()
        };
        let context = SessionContext::from_parts(SessionScope::Student, FormData::default(), Vec::new());
        let listing = ListingConfig {
            admin_page_size: 8,
            student_page_size: 7,
        };
        (transport, StudentPortal::new(client, profile, context, &listing))
    }

    fn rows(count: u32) -> Value {
        let rows: Vec<_> = (1..=count)
            .map(|n| {
                json!({
                    "id": n,
                    "student_id": 441200,
                    "excuse_type": "health",
                    "date": format!("2025-04-{:02}", n)
                })
            })
            .collect();
        Value::Array(rows)
    }

    #[test]
    fn wizard_opens_with_student_identity() {
        let (_, portal) = portal();
        let wizard = portal.open_wizard();
        assert!(wizard.is_open());
        assert_eq!(wizard.identity().map(|i| i.name.as_str()), Some("Sara"));
    }

    #[tokio::test]
    async fn requests_are_paged_newest_first() {
        let (transport, mut portal) = portal();
        transport.push_json(rows(9));

        assert_eq!(portal.refresh_requests().await.expect("loaded"), 9);
        assert_eq!(transport.requests()[0]["student_id"], "441200");

        let first = portal.requests_page(1);
        assert_eq!(first.items.len(), 7);
        assert_eq!(first.items[0].id.0, "9");
        assert_eq!(first.total_pages, 2);

        let second = portal.requests_page(5);
        assert_eq!(second.page, 2);
        assert_eq!(second.items.len(), 2);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_list() {
        let (transport, mut portal) = portal();
        transport.push_json(rows(2)).push_offline();

        portal.refresh_requests().await.expect("loaded");
        let err = portal.refresh_requests().await.expect_err("offline");
        assert!(err.is_transport());
        assert_eq!(portal.requests().len(), 2);
    }
}
