//! Typed client for the portal's single action endpoint.
//!
//! Every operation is a POST of `{action, ...fields}`; responses carry a
//! `status` envelope plus action-specific fields. Each action is a payload
//! struct implementing [`Action`], so callers get a typed reply from one
//! dispatch function instead of matching on action strings.

pub mod actions;
pub mod http;
pub mod responses;
pub mod scripted;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::ConfigError;

pub use actions::*;
pub use http::HttpTransport;
pub use responses::*;
pub use scripted::ScriptedTransport;

const GENERIC_FAILURE: &str = "The request could not be completed. Please try again.";
const CONNECTIVITY_FAILURE: &str = "Could not reach the server. Check your connection and try again.";

/// Failures of a remote action.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("`{action}` could not reach the backend: {message}")]
    Transport {
        action: &'static str,
        message: String,
    },
    #[error("backend rejected `{action}`: {}", message.as_deref().unwrap_or("no message"))]
    Application {
        action: &'static str,
        message: Option<String>,
    },
    #[error("`{action}` answered with a body that is not JSON: {snippet}")]
    MalformedResponse {
        action: &'static str,
        snippet: String,
    },
    #[error("`{action}` answered with an unexpected shape: {source}")]
    Decode {
        action: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("`{action}` request could not be encoded: {source}")]
    Encode {
        action: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    /// Message for a notification: the backend's own text when it sent one,
    /// a generic fallback otherwise.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Application {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            ApiError::Transport { .. } => CONNECTIVITY_FAILURE.to_string(),
            ApiError::Config(ConfigError::MissingEndpoint) => {
                "System error: the portal endpoint is not configured.".to_string()
            }
            _ => GENERIC_FAILURE.to_string(),
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport { .. })
    }
}

/// Typed decoding of a response body for one action.
pub trait Reply: Sized {
    fn from_value(action: &'static str, value: Value) -> Result<Self, ApiError>;
}

/// A request payload bound to its wire name and reply type.
pub trait Action: Into<ApiRequest> {
    const NAME: &'static str;
    type Response: Reply;
}

/// Seam between the typed client and the wire.
#[async_trait]
pub trait PortalTransport: Send + Sync {
    async fn post(&self, action: &'static str, body: Value) -> Result<Value, ApiError>;
}

/// Single dispatch point for all portal actions.
#[derive(Clone)]
pub struct PortalClient {
    transport: Arc<dyn PortalTransport>,
}

impl PortalClient {
    pub fn new(transport: Arc<dyn PortalTransport>) -> Self {
        Self { transport }
    }

    pub async fn send<A: Action>(&self, action: A) -> Result<A::Response, ApiError> {
        let request: ApiRequest = action.into();
        let body = serde_json::to_value(&request).map_err(|source| ApiError::Encode {
            action: A::NAME,
            source,
        })?;

        tracing::debug!(action = A::NAME, "sending portal action");
        let outcome = self
            .transport
            .post(A::NAME, body)
            .await
            .and_then(|value| A::Response::from_value(A::NAME, value));

        if let Err(err) = &outcome {
            tracing::warn!(action = A::NAME, error = %err, "portal action failed");
        }
        outcome
    }
}

/// True when the envelope reports success (`status`, or legacy `result`).
pub(crate) fn envelope_succeeded(value: &Value) -> bool {
    let marker = |key: &str| value.get(key).and_then(Value::as_str) == Some("success");
    marker("status") || marker("result")
}

pub(crate) fn envelope_message(value: &Value) -> Option<String> {
    value
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .filter(|message| !message.trim().is_empty())
}

/// Check the success envelope and decode the remaining fields into `T`.
pub(crate) fn decode_envelope<T: DeserializeOwned>(
    action: &'static str,
    value: Value,
) -> Result<T, ApiError> {
    if !envelope_succeeded(&value) {
        return Err(ApiError::Application {
            action,
            message: envelope_message(&value),
        });
    }

    serde_json::from_value(value).map_err(|source| ApiError::Decode { action, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn legacy_result_marker_counts_as_success() {
        assert!(envelope_succeeded(&json!({ "result": "success" })));
        assert!(envelope_succeeded(&json!({ "status": "success" })));
        assert!(!envelope_succeeded(&json!({ "status": "error" })));
        assert!(!envelope_succeeded(&json!([])));
    }

    #[test]
    fn user_message_prefers_backend_text() {
        let err = ApiError::Application {
            action: "update_decision",
            message: Some("Excuse not found".to_string()),
        };
        assert_eq!(err.user_message(), "Excuse not found");

        let err = ApiError::Application {
            action: "update_decision",
            message: Some("  ".to_string()),
        };
        assert_eq!(err.user_message(), GENERIC_FAILURE);

        let err = ApiError::Transport {
            action: "get_form_data",
            message: "connection refused".to_string(),
        };
        assert_eq!(err.user_message(), CONNECTIVITY_FAILURE);
    }
}
