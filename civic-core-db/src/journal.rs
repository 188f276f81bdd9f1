use chrono::Utc;
use civic_core_api::CoreResult;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::audit::{AuditEntry, AuditOperation};
use crate::models::entity_type::EntityType;
use crate::ports::audit::AuditStore;

/// Append-only journal of pipeline operations.
///
/// Appends are best-effort: the side-effect worker logs and swallows
/// failures so a broken journal can never contradict a successful
/// primary write. Queries back the UI history views only; the pipeline
/// never reads the journal for correctness decisions.
#[derive(Clone)]
pub struct AuditJournal {
    store: Arc<dyn AuditStore>,
}

impl AuditJournal {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    pub async fn append(
        &self,
        operation: AuditOperation,
        entity_type: EntityType,
        entity_id: Option<i64>,
        description: String,
        actor_id: Option<i64>,
        metadata: serde_json::Value,
    ) -> CoreResult<()> {
        let entry = AuditEntry {
            id: Uuid::new_v4(),
            operation,
            entity_type,
            entity_id,
            description,
            actor_id,
            metadata,
            timestamp: Utc::now(),
        };
        self.store.append(entry).await
    }

    pub async fn get_by_entity(
        &self,
        entity_type: EntityType,
        entity_id: i64,
    ) -> CoreResult<Vec<AuditEntry>> {
        self.store.get_by_entity(entity_type, entity_id).await
    }

    pub async fn get_recent(&self, limit: usize) -> CoreResult<Vec<AuditEntry>> {
        self.store.get_recent(limit).await
    }
}
