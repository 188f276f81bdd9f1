use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::models::entity_type::EntityType;
use crate::models::identifiable::Identifiable;

/// Lifecycle of a ledger anchoring attempt.
///
/// `pending` on submission, moved to `confirmed` (or `failed`) by the
/// asynchronous reconciliation path. A record superseded by a newer
/// digest for the same (entity, operation) is marked `failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerStatus {
    Pending,
    Confirmed,
    Failed,
}

impl LedgerStatus {
    /// Active records count toward the one-per-(entity, operation) invariant.
    pub fn is_active(&self) -> bool {
        !matches!(self, LedgerStatus::Failed)
    }
}

impl std::fmt::Display for LedgerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LedgerStatus::Pending => "pending",
            LedgerStatus::Confirmed => "confirmed",
            LedgerStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

impl FromStr for LedgerStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(LedgerStatus::Pending),
            "confirmed" => Ok(LedgerStatus::Confirmed),
            "failed" => Ok(LedgerStatus::Failed),
            _ => Err(()),
        }
    }
}

/// One anchoring of an entity state to the external tamper-evident ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub id: i64,
    /// Logical operation the anchor documents, e.g. `create` or `status_change`.
    pub record_type: String,
    pub entity_type: EntityType,
    pub entity_id: i64,
    pub transaction_hash: String,
    pub status: LedgerStatus,
    /// Carries the content digest under `"digest"` plus caller metadata.
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl Identifiable for LedgerRecord {
    fn get_id(&self) -> i64 {
        self.id
    }
}

impl LedgerRecord {
    /// Content digest recorded at submission time, if any.
    pub fn digest(&self) -> Option<&str> {
        self.metadata.get("digest").and_then(|v| v.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLedgerRecord {
    pub record_type: String,
    pub entity_type: EntityType,
    pub entity_id: i64,
    pub transaction_hash: String,
    pub status: LedgerStatus,
    pub metadata: serde_json::Value,
}
