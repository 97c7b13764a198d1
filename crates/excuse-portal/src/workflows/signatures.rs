//! Committee signatories reused across decisions.

use crate::api::{ApiError, DeleteSignature, GetSignatures, PortalClient, SaveSignature};
use crate::domain::{Signature, SignatureId, MAX_SIGNATURES};

#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("a signatory name is required")]
    MissingName,
    #[error("a signatory position is required")]
    MissingPosition,
    #[error("at most {max} signatures can be active")]
    LimitReached { max: usize },
    #[error("signature {0} does not exist")]
    NotFound(SignatureId),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Create (no `id`) or edit form for one signatory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureDraft {
    pub id: Option<SignatureId>,
    pub name: String,
    pub position: String,
    pub image_url: Option<String>,
}

impl SignatureDraft {
    fn into_request(self) -> Result<SaveSignature, SignatureError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(SignatureError::MissingName);
        }
        let position = self.position.trim().to_string();
        if position.is_empty() {
            return Err(SignatureError::MissingPosition);
        }

        Ok(SaveSignature {
            id: self.id,
            name,
            position,
            image_url: self
                .image_url
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty()),
        })
    }
}

pub struct SignatureService {
    client: PortalClient,
    signatures: Vec<Signature>,
}

impl SignatureService {
    pub fn new(client: PortalClient) -> Self {
        Self {
            client,
            signatures: Vec::new(),
        }
    }

    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    pub fn can_create(&self) -> bool {
        self.signatures.len() < MAX_SIGNATURES
    }

    pub async fn reload(&mut self) -> Result<&[Signature], SignatureError> {
        self.signatures = self.client.send(GetSignatures {}).await?.signatures;
        Ok(&self.signatures)
    }

    pub async fn save(&mut self, draft: SignatureDraft) -> Result<&[Signature], SignatureError> {
        match &draft.id {
            Some(id) if !self.signatures.iter().any(|s| &s.id == id) => {
                return Err(SignatureError::NotFound(id.clone()));
            }
            None if !self.can_create() => {
                return Err(SignatureError::LimitReached {
                    max: MAX_SIGNATURES,
                });
            }
            _ => {}
        }

        let request = draft.into_request()?;
        let editing = request.id.is_some();
        self.client.send(request).await?;
        tracing::info!(editing, "signature saved");
        self.reload().await
    }

    pub async fn delete(&mut self, id: &SignatureId) -> Result<&[Signature], SignatureError> {
        self.client.send(DeleteSignature { id: id.clone() }).await?;
        tracing::info!(signature_id = %id, "signature deleted");
        self.reload().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ScriptedTransport;
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn listing(count: usize) -> Value {
        let signatures: Vec<_> = (1..=count)
            .map(|n| json!({ "id": n, "name": format!("Member {n}"), "position": "Member" }))
            .collect();
        json!({ "signatures": signatures })
    }

    async fn loaded(count: usize) -> (ScriptedTransport, SignatureService) {
        let transport = ScriptedTransport::new();
        transport.push_success(listing(count));
        let mut service = SignatureService::new(PortalClient::new(Arc::new(transport.clone())));
        service.reload().await.expect("signatures load");
        (transport, service)
    }

    fn draft(name: &str, position: &str) -> SignatureDraft {
        SignatureDraft {
            name: name.to_string(),
            position: position.to_string(),
            ..SignatureDraft::default()
        }
    }

    #[tokio::test]
    async fn name_and_position_are_required() {
        let (transport, mut service) = loaded(1).await;

        let err = service.save(draft(" ", "Dean")).await.expect_err("no name");
        assert!(matches!(err, SignatureError::MissingName));
        let err = service.save(draft("Dr. Huda", "")).await.expect_err("no position");
        assert!(matches!(err, SignatureError::MissingPosition));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn fifth_signature_is_rejected_locally() {
        let (transport, mut service) = loaded(MAX_SIGNATURES).await;
        assert!(!service.can_create());

        let err = service.save(draft("Dr. Huda", "Dean")).await.expect_err("limit");
        assert!(matches!(err, SignatureError::LimitReached { max: 4 }));
        assert_eq!(transport.actions(), vec!["get_signatures"]);
    }

    #[tokio::test]
    async fn editing_is_allowed_at_the_limit() {
        let (transport, mut service) = loaded(MAX_SIGNATURES).await;
        transport.push_success(json!({})).push_success(listing(MAX_SIGNATURES));

        let edit = SignatureDraft {
            id: Some(SignatureId("2".to_string())),
            ..draft("Dr. Omar", "Vice dean")
        };
        let signatures = service.save(edit).await.expect("saved");
        assert_eq!(signatures.len(), MAX_SIGNATURES);

        let sent = &transport.requests()[1];
        assert_eq!(sent["action"], "save_signature");
        assert_eq!(sent["id"], "2");
        assert!(sent.get("imageUrl").is_none());
    }

    #[tokio::test]
    async fn delete_reloads_the_list() {
        let (transport, mut service) = loaded(2).await;
        transport.push_success(json!({})).push_success(listing(1));

        let remaining = service
            .delete(&SignatureId("2".to_string()))
            .await
            .expect("deleted");
        assert_eq!(remaining.len(), 1);
        assert_eq!(
            transport.actions(),
            vec!["get_signatures", "delete_signature", "get_signatures"]
        );
    }
}
