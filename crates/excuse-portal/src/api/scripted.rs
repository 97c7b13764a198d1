use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::{ApiError, PortalTransport};

#[derive(Debug, Clone)]
enum ScriptedReply {
    Json(Value),
    Offline,
    NotJson(String),
}

/// In-memory transport answering from a queue of prepared replies.
///
/// Every request body is recorded so callers can assert on what was sent.
/// When the queue is empty the transport behaves as if the network is down.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    replies: Arc<Mutex<VecDeque<ScriptedReply>>>,
    requests: Arc<Mutex<Vec<Value>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_json(&self, value: Value) -> &Self {
        self.push(ScriptedReply::Json(value))
    }

    /// Queue `{"status": "success", ...fields}`.
    pub fn push_success(&self, fields: Value) -> &Self {
        let mut body = Map::new();
        body.insert("status".to_string(), json!("success"));
        if let Value::Object(extra) = fields {
            body.extend(extra);
        }
        self.push(ScriptedReply::Json(Value::Object(body)))
    }

    pub fn push_error(&self, message: &str) -> &Self {
        self.push(ScriptedReply::Json(
            json!({ "status": "error", "message": message }),
        ))
    }

    pub fn push_offline(&self) -> &Self {
        self.push(ScriptedReply::Offline)
    }

    pub fn push_not_json(&self, body: &str) -> &Self {
        self.push(ScriptedReply::NotJson(body.to_string()))
    }

    /// Request bodies in the order they were posted.
    pub fn requests(&self) -> Vec<Value> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    pub fn actions(&self) -> Vec<String> {
        self.requests()
            .iter()
            .filter_map(|body| body.get("action").and_then(Value::as_str))
            .map(str::to_string)
            .collect()
    }

    pub fn pending_replies(&self) -> usize {
        self.replies.lock().map(|queue| queue.len()).unwrap_or(0)
    }

    fn push(&self, reply: ScriptedReply) -> &Self {
        if let Ok(mut queue) = self.replies.lock() {
            queue.push_back(reply);
        }
        self
    }
}

#[async_trait]
impl PortalTransport for ScriptedTransport {
    async fn post(&self, action: &'static str, body: Value) -> Result<Value, ApiError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(body);
        }

        let next = self
            .replies
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front());

        match next {
            Some(ScriptedReply::Json(value)) => Ok(value),
            Some(ScriptedReply::NotJson(snippet)) => {
                Err(ApiError::MalformedResponse { action, snippet })
            }
            Some(ScriptedReply::Offline) | None => Err(ApiError::Transport {
                action,
                message: "no scripted reply".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{GetTerms, PortalClient};

    #[tokio::test]
    async fn records_requests_and_replays_in_order() {
        let transport = ScriptedTransport::new();
        transport
            .push_success(json!({ "terms": "Be honest." }))
            .push_offline();
        let client = PortalClient::new(Arc::new(transport.clone()));

        let terms = client.send(GetTerms {}).await.expect("first reply");
        assert_eq!(terms.terms, "Be honest.");

        let err = client.send(GetTerms {}).await.expect_err("offline");
        assert!(err.is_transport());
        assert_eq!(transport.actions(), vec!["get_terms", "get_terms"]);
        assert_eq!(transport.pending_replies(), 0);
    }

    #[tokio::test]
    async fn non_json_bodies_are_malformed() {
        let transport = ScriptedTransport::new();
        transport.push_not_json("<html>Sign in</html>");
        let client = PortalClient::new(Arc::new(transport));

        let err = client.send(GetTerms {}).await.expect_err("html body");
        assert!(matches!(err, ApiError::MalformedResponse { .. }));
    }
}
