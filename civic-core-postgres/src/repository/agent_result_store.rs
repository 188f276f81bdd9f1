use std::error::Error;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use civic_core_api::CoreResult;
use civic_core_db::models::agent_result::{AgentResult, NewAgentResult};
use civic_core_db::models::entity_type::EntityType;
use civic_core_db::ports::agent_result::AgentResultStore;

use crate::utils::{get_parsed, map_rows, pg_err, row_err, TryFromRow};

/// `AgentResultStore` backed by the append-only `agent_result` table.
pub struct PgAgentResultStore {
    pool: Arc<PgPool>,
}

impl PgAgentResultStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

impl TryFromRow<PgRow> for AgentResult {
    fn try_from_row(row: &PgRow) -> Result<Self, Box<dyn Error + Send + Sync>> {
        Ok(AgentResult {
            id: row.try_get("id")?,
            agent_id: row.try_get("agent_id")?,
            entity_type: get_parsed(row, "entity_type")?,
            entity_id: row.try_get("entity_id")?,
            action_type: row.try_get("action_type")?,
            result: row.try_get("result")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl AgentResultStore for PgAgentResultStore {
    async fn get_by_id(&self, id: i64) -> CoreResult<Option<AgentResult>> {
        let row = sqlx::query("SELECT * FROM agent_result WHERE id = $1")
            .bind(id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(pg_err)?;
        row.as_ref().map(AgentResult::try_from_row).transpose().map_err(row_err)
    }

    async fn get_by_agent(&self, agent_id: i64) -> CoreResult<Vec<AgentResult>> {
        let rows = sqlx::query("SELECT * FROM agent_result WHERE agent_id = $1 ORDER BY id")
            .bind(agent_id)
            .fetch_all(&*self.pool)
            .await
            .map_err(pg_err)?;
        map_rows(&rows)
    }

    async fn get_by_entity(
        &self,
        entity_type: EntityType,
        entity_id: i64,
    ) -> CoreResult<Vec<AgentResult>> {
        let rows = sqlx::query(
            "SELECT * FROM agent_result WHERE entity_type = $1 AND entity_id = $2 ORDER BY id",
        )
        .bind(entity_type.to_string())
        .bind(entity_id)
        .fetch_all(&*self.pool)
        .await
        .map_err(pg_err)?;
        map_rows(&rows)
    }

    async fn insert(&self, new: NewAgentResult) -> CoreResult<AgentResult> {
        let row = sqlx::query(
            r#"
            INSERT INTO agent_result (agent_id, entity_type, entity_id, action_type, result)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(new.agent_id)
        .bind(new.entity_type.to_string())
        .bind(new.entity_id)
        .bind(&new.action_type)
        .bind(&new.result)
        .fetch_one(&*self.pool)
        .await
        .map_err(pg_err)?;
        AgentResult::try_from_row(&row).map_err(row_err)
    }

    async fn count_by_agent(&self, agent_id: i64) -> CoreResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM agent_result WHERE agent_id = $1")
            .bind(agent_id)
            .fetch_one(&*self.pool)
            .await
            .map_err(pg_err)?;
        row.try_get("n").map_err(pg_err)
    }

    async fn count_by_entity(&self, entity_type: EntityType, entity_id: i64) -> CoreResult<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM agent_result WHERE entity_type = $1 AND entity_id = $2",
        )
        .bind(entity_type.to_string())
        .bind(entity_id)
        .fetch_one(&*self.pool)
        .await
        .map_err(pg_err)?;
        row.try_get("n").map_err(pg_err)
    }
}
