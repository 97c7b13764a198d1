use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::{ApiError, PortalTransport};
use crate::config::BackendConfig;

const SNIPPET_LIMIT: usize = 120;

/// Posts actions as JSON to the configured endpoint.
///
/// The endpoint is resolved per call so a missing URL only surfaces when a
/// remote action is attempted.
pub struct HttpTransport {
    client: Client,
    backend: BackendConfig,
}

impl HttpTransport {
    pub fn new(backend: BackendConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .build()
            .map_err(|err| ApiError::Transport {
                action: "client",
                message: format!("failed to build http client: {err}"),
            })?;
        Ok(Self { client, backend })
    }
}

#[async_trait]
impl PortalTransport for HttpTransport {
    async fn post(&self, action: &'static str, body: Value) -> Result<Value, ApiError> {
        let url = self.backend.endpoint()?;

        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|err| ApiError::Transport {
                action,
                message: err.to_string(),
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|err| ApiError::Transport {
            action,
            message: err.to_string(),
        })?;

        // Application errors arrive as JSON envelopes even on non-2xx codes.
        match serde_json::from_str::<Value>(&text) {
            Ok(value) => Ok(value),
            Err(_) if !status.is_success() => Err(ApiError::Transport {
                action,
                message: format!("backend answered {status}"),
            }),
            Err(_) => Err(ApiError::MalformedResponse {
                action,
                snippet: text.chars().take(SNIPPET_LIMIT).collect(),
            }),
        }
    }
}
