use std::error::Error;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use civic_core_api::CoreResult;
use civic_core_db::models::entity_type::EntityType;
use civic_core_db::models::ledger::{LedgerRecord, LedgerStatus, NewLedgerRecord};
use civic_core_db::ports::ledger::LedgerRecordStore;

use crate::utils::{get_parsed, map_rows, pg_err, row_err, TryFromRow};

/// `LedgerRecordStore` backed by the `ledger_record` table.
///
/// The one-active-record invariant is also enforced in the schema by a
/// partial unique index over (entity_type, entity_id, record_type)
/// where status is not `failed`.
pub struct PgLedgerRecordStore {
    pool: Arc<PgPool>,
}

impl PgLedgerRecordStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

impl TryFromRow<PgRow> for LedgerRecord {
    fn try_from_row(row: &PgRow) -> Result<Self, Box<dyn Error + Send + Sync>> {
        Ok(LedgerRecord {
            id: row.try_get("id")?,
            record_type: row.try_get("record_type")?,
            entity_type: get_parsed(row, "entity_type")?,
            entity_id: row.try_get("entity_id")?,
            transaction_hash: row.try_get("transaction_hash")?,
            status: get_parsed(row, "status")?,
            metadata: row.try_get("metadata")?,
            created_at: row.try_get("created_at")?,
            confirmed_at: row.try_get("confirmed_at")?,
        })
    }
}

#[async_trait]
impl LedgerRecordStore for PgLedgerRecordStore {
    async fn get_by_id(&self, id: i64) -> CoreResult<Option<LedgerRecord>> {
        let row = sqlx::query("SELECT * FROM ledger_record WHERE id = $1")
            .bind(id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(pg_err)?;
        row.as_ref().map(LedgerRecord::try_from_row).transpose().map_err(row_err)
    }

    async fn get_by_entity(
        &self,
        entity_type: EntityType,
        entity_id: i64,
    ) -> CoreResult<Vec<LedgerRecord>> {
        let rows = sqlx::query(
            "SELECT * FROM ledger_record WHERE entity_type = $1 AND entity_id = $2 ORDER BY id",
        )
        .bind(entity_type.to_string())
        .bind(entity_id)
        .fetch_all(&*self.pool)
        .await
        .map_err(pg_err)?;
        map_rows(&rows)
    }

    async fn get_by_transaction_hash(&self, hash: &str) -> CoreResult<Option<LedgerRecord>> {
        let row = sqlx::query("SELECT * FROM ledger_record WHERE transaction_hash = $1")
            .bind(hash)
            .fetch_optional(&*self.pool)
            .await
            .map_err(pg_err)?;
        row.as_ref().map(LedgerRecord::try_from_row).transpose().map_err(row_err)
    }

    async fn get_recent(&self, limit: usize) -> CoreResult<Vec<LedgerRecord>> {
        let rows = sqlx::query("SELECT * FROM ledger_record ORDER BY created_at DESC LIMIT $1")
            .bind(limit as i64)
            .fetch_all(&*self.pool)
            .await
            .map_err(pg_err)?;
        map_rows(&rows)
    }

    async fn find_active(
        &self,
        entity_type: EntityType,
        entity_id: i64,
        record_type: &str,
    ) -> CoreResult<Option<LedgerRecord>> {
        let row = sqlx::query(
            r#"
            SELECT * FROM ledger_record
            WHERE entity_type = $1 AND entity_id = $2 AND record_type = $3
              AND status <> $4
            "#,
        )
        .bind(entity_type.to_string())
        .bind(entity_id)
        .bind(record_type)
        .bind(LedgerStatus::Failed.to_string())
        .fetch_optional(&*self.pool)
        .await
        .map_err(pg_err)?;
        row.as_ref().map(LedgerRecord::try_from_row).transpose().map_err(row_err)
    }

    async fn insert(&self, new: NewLedgerRecord) -> CoreResult<LedgerRecord> {
        let row = sqlx::query(
            r#"
            INSERT INTO ledger_record
                (record_type, entity_type, entity_id, transaction_hash, status, metadata)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&new.record_type)
        .bind(new.entity_type.to_string())
        .bind(new.entity_id)
        .bind(&new.transaction_hash)
        .bind(new.status.to_string())
        .bind(&new.metadata)
        .fetch_one(&*self.pool)
        .await
        .map_err(pg_err)?;
        LedgerRecord::try_from_row(&row).map_err(row_err)
    }

    async fn set_status(
        &self,
        id: i64,
        status: LedgerStatus,
        confirmed_at: Option<DateTime<Utc>>,
    ) -> CoreResult<Option<LedgerRecord>> {
        let row = sqlx::query(
            r#"
            UPDATE ledger_record
            SET status = $2, confirmed_at = COALESCE($3, confirmed_at)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status.to_string())
        .bind(confirmed_at)
        .fetch_optional(&*self.pool)
        .await
        .map_err(pg_err)?;
        row.as_ref().map(LedgerRecord::try_from_row).transpose().map_err(row_err)
    }

    async fn count_by_entity(&self, entity_type: EntityType, entity_id: i64) -> CoreResult<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM ledger_record WHERE entity_type = $1 AND entity_id = $2",
        )
        .bind(entity_type.to_string())
        .bind(entity_id)
        .fetch_one(&*self.pool)
        .await
        .map_err(pg_err)?;
        row.try_get("n").map_err(pg_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helper::setup_test_stores;
    use serde_json::json;
    use serial_test::serial;

    fn new_test_record(entity_id: i64, record_type: &str, hash: &str) -> NewLedgerRecord {
        NewLedgerRecord {
            record_type: record_type.to_string(),
            entity_type: EntityType::CitizenRequest,
            entity_id,
            transaction_hash: hash.to_string(),
            status: LedgerStatus::Pending,
            metadata: json!({ "digest": "d0" }),
        }
    }

    #[tokio::test]
    #[serial]
    #[ignore = "requires a running Postgres (DATABASE_URL)"]
    async fn test_find_active_skips_failed_records(
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let stores = setup_test_stores().await?;
        let store = PgLedgerRecordStore::new(stores.pool());

        // Fresh entity id per run; rows are never cleaned up.
        let entity_id = Utc::now().timestamp_micros();
        let first = store.insert(new_test_record(entity_id, "create", "0xaaa")).await?;
        store.set_status(first.id, LedgerStatus::Failed, None).await?;
        let second = store.insert(new_test_record(entity_id, "create", "0xbbb")).await?;

        let active = store
            .find_active(EntityType::CitizenRequest, entity_id, "create")
            .await?
            .unwrap();
        assert_eq!(active.id, second.id);
        assert_eq!(store.count_by_entity(EntityType::CitizenRequest, entity_id).await?, 2);
        Ok(())
    }

    #[tokio::test]
    #[serial]
    #[ignore = "requires a running Postgres (DATABASE_URL)"]
    async fn test_set_status_stamps_confirmation(
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let stores = setup_test_stores().await?;
        let store = PgLedgerRecordStore::new(stores.pool());

        let entity_id = Utc::now().timestamp_micros();
        let record = store.insert(new_test_record(entity_id, "update", "0xccc")).await?;
        let confirmed = store
            .set_status(record.id, LedgerStatus::Confirmed, Some(Utc::now()))
            .await?
            .unwrap();
        assert_eq!(confirmed.status, LedgerStatus::Confirmed);
        assert!(confirmed.confirmed_at.is_some());
        Ok(())
    }
}
