//! Admin maintenance of lookup tables and the terms text.

use crate::api::{
    AddItem, ApiError, DeleteItem, GetSettingsData, PortalClient, SettingsData, UpdateItem,
    UpdateTerms,
};
use crate::domain::{LookupCategory, LookupEntry};
use crate::lookup::FormDataCache;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("a name is required")]
    MissingName,
    #[error("the terms text cannot be empty")]
    EmptyTerms,
    #[error("settings have not been loaded")]
    NotLoaded,
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Loads settings data and applies edits. Every successful mutation reloads
/// from the backend and drops the local form-data cache so the next session
/// sees the change.
pub struct SettingsService {
    client: PortalClient,
    cache: Option<FormDataCache>,
    data: Option<SettingsData>,
}

impl SettingsService {
    pub fn new(client: PortalClient, cache: Option<FormDataCache>) -> Self {
        Self {
            client,
            cache,
            data: None,
        }
    }

    pub fn data(&self) -> Result<&SettingsData, SettingsError> {
        self.data.as_ref().ok_or(SettingsError::NotLoaded)
    }

    pub fn entries(&self, category: LookupCategory) -> Result<&[LookupEntry], SettingsError> {
        let data = self.data()?;
        Ok(match category {
            LookupCategory::Hospitals => &data.hospitals,
            LookupCategory::Courses => &data.courses,
            LookupCategory::Reasons => &data.reasons,
        })
    }

    pub async fn load(&mut self) -> Result<&SettingsData, SettingsError> {
        let data = self.client.send(GetSettingsData {}).await?;
        tracing::debug!(
            hospitals = data.hospitals.len(),
            courses = data.courses.len(),
            reasons = data.reasons.len(),
            "settings loaded"
        );
        Ok(self.data.insert(data))
    }

    pub async fn add_item(
        &mut self,
        category: LookupCategory,
        name: &str,
    ) -> Result<&SettingsData, SettingsError> {
        let name = required_name(name)?;
        self.client.send(AddItem { category, name }).await?;
        tracing::info!(category = category.label(), "lookup item added");
        self.after_mutation().await
    }

    pub async fn update_item(
        &mut self,
        category: LookupCategory,
        id: &str,
        name: &str,
    ) -> Result<&SettingsData, SettingsError> {
        let name = required_name(name)?;
        self.client
            .send(UpdateItem {
                category,
                id: id.to_string(),
                name,
            })
            .await?;
        tracing::info!(category = category.label(), item_id = id, "lookup item renamed");
        self.after_mutation().await
    }

    pub async fn delete_item(
        &mut self,
        category: LookupCategory,
        id: &str,
    ) -> Result<&SettingsData, SettingsError> {
        self.client
            .send(DeleteItem {
                category,
                id: id.to_string(),
            })
            .await?;
        tracing::info!(category = category.label(), item_id = id, "lookup item deleted");
        self.after_mutation().await
    }

    pub async fn update_terms(&mut self, text: &str) -> Result<&SettingsData, SettingsError> {
        if text.trim().is_empty() {
            return Err(SettingsError::EmptyTerms);
        }
        self.client
            .send(UpdateTerms {
                text: text.to_string(),
            })
            .await?;
        tracing::info!("terms updated");
        self.after_mutation().await
    }

    async fn after_mutation(&mut self) -> Result<&SettingsData, SettingsError> {
        if let Some(cache) = &self.cache {
            if let Err(err) = cache.invalidate() {
                tracing::warn!(error = %err, "could not drop form data cache");
            }
        }
        self.load().await
    }
}

fn required_name(name: &str) -> Result<String, SettingsError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SettingsError::MissingName);
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{FormData, ScriptedTransport};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn service(cache: Option<FormDataCache>) -> (ScriptedTransport, SettingsService) {
        let transport = ScriptedTransport::new();
        let client = PortalClient::new(Arc::new(transport.clone()));
        (transport, SettingsService::new(client, cache))
    }

    #[tokio::test]
    async fn entries_require_loaded_settings() {
        let (_, service) = service(None);
        assert!(matches!(
            service.entries(LookupCategory::Courses),
            Err(SettingsError::NotLoaded)
        ));
    }

    #[tokio::test]
    async fn blank_names_are_rejected_without_a_request() {
        let (transport, mut service) = service(None);
        let err = service
            .add_item(LookupCategory::Hospitals, "   ")
            .await
            .expect_err("blank");
        assert!(matches!(err, SettingsError::MissingName));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn mutation_reloads_and_invalidates_cache() {
        let path = std::env::temp_dir().join(format!(
            "excuse-portal-settings-{}.json",
            std::process::id()
        ));
        let cache = FormDataCache::new(path.clone(), Duration::from_secs(600));
        cache.store(&FormData::default()).expect("cache written");

        let (transport, mut service) = service(Some(cache.clone()));
        transport.push_success(json!({})).push_success(json!({
            "hospitals": [{ "id": 1, "name": "King Fahad Hospital" }],
            "terms": "Be honest."
        }));

        let data = service
            .add_item(LookupCategory::Hospitals, " King Fahad Hospital ")
            .await
            .expect("added");
        assert_eq!(data.hospitals.len(), 1);
        assert_eq!(data.terms, "Be honest.");

        let sent = &transport.requests()[0];
        assert_eq!(sent["action"], "add_item");
        assert_eq!(sent["category"], "hospitals");
        assert_eq!(sent["name"], "King Fahad Hospital");
        assert!(cache.load().is_none());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn failed_mutation_keeps_previous_data() {
        let (transport, mut service) = service(None);
        transport
            .push_success(json!({ "courses": [{ "id": "C1", "name": "Anatomy" }] }))
            .push_error("Duplicate name");
        service.load().await.expect("loaded");

        let err = service
            .update_item(LookupCategory::Courses, "C1", "Anatomy")
            .await
            .expect_err("rejected");
        assert!(matches!(err, SettingsError::Api(_)));
        let courses = service.entries(LookupCategory::Courses).expect("still loaded");
        assert_eq!(courses[0].name, "Anatomy");
    }

    #[tokio::test]
    async fn empty_terms_are_rejected() {
        let (_, mut service) = service(None);
        let err = service.update_terms("\n ").await.expect_err("empty");
        assert!(matches!(err, SettingsError::EmptyTerms));
    }
}
