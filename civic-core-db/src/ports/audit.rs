use async_trait::async_trait;
use civic_core_api::CoreResult;

use crate::models::audit::AuditEntry;
use crate::models::entity_type::EntityType;

/// Narrow persistence port for the append-only audit journal.
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(&self, entry: AuditEntry) -> CoreResult<()>;

    async fn get_by_entity(
        &self,
        entity_type: EntityType,
        entity_id: i64,
    ) -> CoreResult<Vec<AuditEntry>>;

    /// Most recent entries first.
    async fn get_recent(&self, limit: usize) -> CoreResult<Vec<AuditEntry>>;
}
