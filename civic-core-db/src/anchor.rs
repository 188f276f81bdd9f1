use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::models::entity_type::EntityType;

#[derive(Error, Debug)]
pub enum AnchorError {
    #[error("Ledger node network error: {0}")]
    Network(String),

    #[error("Ledger node returned {status}: {body}")]
    Node { status: u16, body: String },

    #[error("Invalid ledger node response: {0}")]
    InvalidResponse(String),
}

/// Payload anchored to the external ledger.
///
/// Callers must not re-submit for the same (entity_type, entity_id,
/// action) unless the digest changed; the client itself does not
/// deduplicate, the side-effect worker does.
#[derive(Debug, Clone, Serialize)]
pub struct AnchorSubmission {
    pub entity_type: EntityType,
    pub entity_id: i64,
    pub action: String,
    pub title: String,
    /// Hex content digest of the entity state being anchored.
    pub digest: String,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnchorReceipt {
    pub transaction_hash: String,
}

/// Client boundary to the external tamper-evident ledger node.
#[async_trait]
pub trait LedgerAnchorClient: Send + Sync {
    async fn submit(&self, submission: AnchorSubmission) -> Result<AnchorReceipt, AnchorError>;
}

/// HTTP adapter for a ledger node exposing `POST /anchors`.
///
/// Holds one reqwest client handle reused across calls; no other
/// mutable state.
pub struct HttpLedgerClient {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Serialize)]
struct AnchorRequestBody<'a> {
    entity_type: &'a str,
    entity_id: i64,
    action: &'a str,
    title: &'a str,
    digest: &'a str,
    metadata: &'a serde_json::Value,
}

#[derive(Deserialize)]
struct AnchorResponseBody {
    transaction_hash: String,
}

impl HttpLedgerClient {
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self, AnchorError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AnchorError::Network(e.to_string()))?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl LedgerAnchorClient for HttpLedgerClient {
    async fn submit(&self, submission: AnchorSubmission) -> Result<AnchorReceipt, AnchorError> {
        let body = AnchorRequestBody {
            entity_type: submission.entity_type.as_str(),
            entity_id: submission.entity_id,
            action: &submission.action,
            title: &submission.title,
            digest: &submission.digest,
            metadata: &submission.metadata,
        };
        let url = format!("{}/anchors", self.endpoint.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AnchorError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AnchorError::Node { status, body });
        }

        let parsed: AnchorResponseBody = response
            .json()
            .await
            .map_err(|e| AnchorError::InvalidResponse(e.to_string()))?;
        Ok(AnchorReceipt {
            transaction_hash: parsed.transaction_hash,
        })
    }
}
