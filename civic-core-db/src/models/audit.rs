use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::models::entity_type::EntityType;

/// Operations recorded in the audit journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOperation {
    Create,
    Update,
    Delete,
    /// A delete blocked by the referential guard; nothing was removed.
    DeleteSkipped,
    StatusChange,
    AiProcess,
}

impl AuditOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditOperation::Create => "create",
            AuditOperation::Update => "update",
            AuditOperation::Delete => "delete",
            AuditOperation::DeleteSkipped => "delete_skipped",
            AuditOperation::StatusChange => "status_change",
            AuditOperation::AiProcess => "ai_process",
        }
    }
}

impl std::fmt::Display for AuditOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AuditOperation {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(AuditOperation::Create),
            "update" => Ok(AuditOperation::Update),
            "delete" => Ok(AuditOperation::Delete),
            "delete_skipped" => Ok(AuditOperation::DeleteSkipped),
            "status_change" => Ok(AuditOperation::StatusChange),
            "ai_process" => Ok(AuditOperation::AiProcess),
            _ => Err(()),
        }
    }
}

/// One append-only journal entry.
///
/// Entries reference their entity weakly by (type, id); deleting the
/// entity does not cascade here. The journal is an observability
/// artifact, never consulted by the pipeline for correctness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub operation: AuditOperation,
    pub entity_type: EntityType,
    pub entity_id: Option<i64>,
    pub description: String,
    pub actor_id: Option<i64>,
    pub metadata: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}
