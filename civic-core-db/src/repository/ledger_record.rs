use chrono::Utc;
use civic_core_api::CoreResult;
use serde_json::json;
use std::sync::Arc;

use crate::effects::{AuditCommand, SideEffects};
use crate::models::audit::AuditOperation;
use crate::models::entity_type::EntityType;
use crate::models::ledger::{LedgerRecord, LedgerStatus};
use crate::ports::ledger::LedgerRecordStore;

/// Query and reconciliation surface for ledger records.
///
/// Pending records are created by the side-effect worker after a
/// successful submission; this repository serves the UI blockchain
/// views and lets the external reconciliation poller move records to
/// `confirmed` or `failed`.
pub struct LedgerRecordRepository {
    store: Arc<dyn LedgerRecordStore>,
    effects: SideEffects,
}

impl LedgerRecordRepository {
    pub fn new(store: Arc<dyn LedgerRecordStore>, effects: SideEffects) -> Self {
        Self { store, effects }
    }

    pub async fn get_by_id(&self, id: i64) -> CoreResult<Option<LedgerRecord>> {
        self.store.get_by_id(id).await
    }

    pub async fn get_by_entity(
        &self,
        entity_type: EntityType,
        entity_id: i64,
    ) -> CoreResult<Vec<LedgerRecord>> {
        self.store.get_by_entity(entity_type, entity_id).await
    }

    pub async fn get_by_transaction_hash(&self, hash: &str) -> CoreResult<Option<LedgerRecord>> {
        self.store.get_by_transaction_hash(hash).await
    }

    pub async fn get_recent(&self, limit: usize) -> CoreResult<Vec<LedgerRecord>> {
        self.store.get_recent(limit).await
    }

    /// Reconciliation: the ledger node confirmed this transaction.
    pub async fn mark_confirmed(&self, id: i64) -> CoreResult<Option<LedgerRecord>> {
        let updated = self
            .store
            .set_status(id, LedgerStatus::Confirmed, Some(Utc::now()))
            .await?;
        if let Some(record) = &updated {
            self.audit_status(record, "confirmed");
        }
        Ok(updated)
    }

    /// Reconciliation: the ledger node rejected or lost this transaction.
    pub async fn mark_failed(&self, id: i64) -> CoreResult<Option<LedgerRecord>> {
        let updated = self.store.set_status(id, LedgerStatus::Failed, None).await?;
        if let Some(record) = &updated {
            self.audit_status(record, "failed");
        }
        Ok(updated)
    }

    fn audit_status(&self, record: &LedgerRecord, status: &str) {
        self.effects.enqueue_audit(AuditCommand {
            operation: AuditOperation::Update,
            entity_type: EntityType::LedgerRecord,
            entity_id: Some(record.id),
            description: format!("ledger record {status}"),
            actor_id: None,
            metadata: json!({
                "transaction_hash": record.transaction_hash,
                "anchored_entity_type": record.entity_type.to_string(),
                "anchored_entity_id": record.entity_id,
            }),
        });
    }
}
