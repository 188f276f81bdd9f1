use async_trait::async_trait;
use chrono::{DateTime, Utc};
use civic_core_api::CoreResult;

use crate::models::entity_type::EntityType;
use crate::models::ledger::{LedgerRecord, LedgerStatus, NewLedgerRecord};

/// Narrow persistence port for ledger records.
#[async_trait]
pub trait LedgerRecordStore: Send + Sync {
    async fn get_by_id(&self, id: i64) -> CoreResult<Option<LedgerRecord>>;

    async fn get_by_entity(
        &self,
        entity_type: EntityType,
        entity_id: i64,
    ) -> CoreResult<Vec<LedgerRecord>>;

    async fn get_by_transaction_hash(&self, hash: &str) -> CoreResult<Option<LedgerRecord>>;

    /// Most recent records first.
    async fn get_recent(&self, limit: usize) -> CoreResult<Vec<LedgerRecord>>;

    /// The non-failed record for (entity_type, entity_id, record_type),
    /// if one exists. At most one may be active at a time.
    async fn find_active(
        &self,
        entity_type: EntityType,
        entity_id: i64,
        record_type: &str,
    ) -> CoreResult<Option<LedgerRecord>>;

    async fn insert(&self, new: NewLedgerRecord) -> CoreResult<LedgerRecord>;

    /// Transition a record's status; used by reconciliation and by the
    /// supersede path. Returns the updated row, `None` if absent.
    async fn set_status(
        &self,
        id: i64,
        status: LedgerStatus,
        confirmed_at: Option<DateTime<Utc>>,
    ) -> CoreResult<Option<LedgerRecord>>;

    async fn count_by_entity(&self, entity_type: EntityType, entity_id: i64) -> CoreResult<i64>;
}
