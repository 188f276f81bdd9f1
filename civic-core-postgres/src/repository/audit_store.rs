use std::error::Error;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use civic_core_api::CoreResult;
use civic_core_db::models::audit::AuditEntry;
use civic_core_db::models::entity_type::EntityType;
use civic_core_db::ports::audit::AuditStore;

use crate::utils::{get_parsed, map_rows, pg_err, row_err, TryFromRow};

/// `AuditStore` backed by the append-only `audit_entry` table.
///
/// Rows are never updated or deleted; entries reference their entity
/// weakly by (type, id) with no foreign key.
pub struct PgAuditStore {
    pool: Arc<PgPool>,
}

impl PgAuditStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

impl TryFromRow<PgRow> for AuditEntry {
    fn try_from_row(row: &PgRow) -> Result<Self, Box<dyn Error + Send + Sync>> {
        Ok(AuditEntry {
            id: row.try_get("id")?,
            operation: get_parsed(row, "operation")?,
            entity_type: get_parsed(row, "entity_type")?,
            entity_id: row.try_get("entity_id")?,
            description: row.try_get("description")?,
            actor_id: row.try_get("actor_id")?,
            metadata: row.try_get("metadata")?,
            timestamp: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl AuditStore for PgAuditStore {
    async fn append(&self, entry: AuditEntry) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_entry
                (id, operation, entity_type, entity_id, description, actor_id, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.id)
        .bind(entry.operation.to_string())
        .bind(entry.entity_type.to_string())
        .bind(entry.entity_id)
        .bind(&entry.description)
        .bind(entry.actor_id)
        .bind(&entry.metadata)
        .bind(entry.timestamp)
        .execute(&*self.pool)
        .await
        .map_err(pg_err)?;
        Ok(())
    }

    async fn get_by_entity(
        &self,
        entity_type: EntityType,
        entity_id: i64,
    ) -> CoreResult<Vec<AuditEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM audit_entry
            WHERE entity_type = $1 AND entity_id = $2
            ORDER BY created_at, id
            "#,
        )
        .bind(entity_type.to_string())
        .bind(entity_id)
        .fetch_all(&*self.pool)
        .await
        .map_err(pg_err)?;
        map_rows(&rows)
    }

    async fn get_recent(&self, limit: usize) -> CoreResult<Vec<AuditEntry>> {
        let rows = sqlx::query("SELECT * FROM audit_entry ORDER BY created_at DESC LIMIT $1")
            .bind(limit as i64)
            .fetch_all(&*self.pool)
            .await
            .map_err(pg_err)?;
        map_rows(&rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helper::setup_test_stores;
    use chrono::Utc;
    use civic_core_db::models::audit::AuditOperation;
    use serde_json::json;
    use serial_test::serial;
    use uuid::Uuid;

    #[tokio::test]
    #[serial]
    #[ignore = "requires a running Postgres (DATABASE_URL)"]
    async fn test_append_then_read_back_by_entity(
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let stores = setup_test_stores().await?;
        let store = PgAuditStore::new(stores.pool());

        let entity_id = Utc::now().timestamp_micros();
        let entry = AuditEntry {
            id: Uuid::new_v4(),
            operation: AuditOperation::Create,
            entity_type: EntityType::CitizenRequest,
            entity_id: Some(entity_id),
            description: "Created citizen request".to_string(),
            actor_id: Some(1),
            metadata: json!({}),
            timestamp: Utc::now(),
        };
        store.append(entry.clone()).await?;

        let entries = store.get_by_entity(EntityType::CitizenRequest, entity_id).await?;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, entry.id);
        assert_eq!(entries[0].operation, AuditOperation::Create);
        Ok(())
    }
}
