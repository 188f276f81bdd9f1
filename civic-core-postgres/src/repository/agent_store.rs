use std::error::Error;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use civic_core_api::CoreResult;
use civic_core_db::models::agent::{Agent, AgentPatch, NewAgent};
use civic_core_db::ports::agent::AgentStore;

use crate::utils::{map_rows, pg_err, row_err, TryFromRow};

/// `AgentStore` backed by the `agent` table.
pub struct PgAgentStore {
    pool: Arc<PgPool>,
}

impl PgAgentStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

impl TryFromRow<PgRow> for Agent {
    fn try_from_row(row: &PgRow) -> Result<Self, Box<dyn Error + Send + Sync>> {
        Ok(Agent {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            agent_type: row.try_get("agent_type")?,
            description: row.try_get("description")?,
            model_id: row.try_get("model_id")?,
            is_active: row.try_get("is_active")?,
            system_prompt: row.try_get("system_prompt")?,
            config: row.try_get("config")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl AgentStore for PgAgentStore {
    async fn get_all(&self) -> CoreResult<Vec<Agent>> {
        let rows = sqlx::query("SELECT * FROM agent ORDER BY id")
            .fetch_all(&*self.pool)
            .await
            .map_err(pg_err)?;
        map_rows(&rows)
    }

    async fn get_by_id(&self, id: i64) -> CoreResult<Option<Agent>> {
        let row = sqlx::query("SELECT * FROM agent WHERE id = $1")
            .bind(id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(pg_err)?;
        row.as_ref().map(Agent::try_from_row).transpose().map_err(row_err)
    }

    async fn insert(&self, new: NewAgent) -> CoreResult<Agent> {
        let row = sqlx::query(
            r#"
            INSERT INTO agent (name, agent_type, description, model_id, system_prompt, config)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&new.name)
        .bind(&new.agent_type)
        .bind(&new.description)
        .bind(&new.model_id)
        .bind(&new.system_prompt)
        .bind(&new.config)
        .fetch_one(&*self.pool)
        .await
        .map_err(pg_err)?;
        Agent::try_from_row(&row).map_err(row_err)
    }

    async fn update(&self, id: i64, patch: AgentPatch) -> CoreResult<Option<Agent>> {
        let row = sqlx::query(
            r#"
            UPDATE agent SET
                name          = COALESCE($2, name),
                description   = CASE WHEN $3 THEN $4 ELSE description END,
                model_id      = COALESCE($5, model_id),
                is_active     = COALESCE($6, is_active),
                system_prompt = CASE WHEN $7 THEN $8 ELSE system_prompt END,
                config        = COALESCE($9, config),
                updated_at    = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&patch.name)
        .bind(patch.description.is_some())
        .bind(patch.description.flatten())
        .bind(&patch.model_id)
        .bind(patch.is_active)
        .bind(patch.system_prompt.is_some())
        .bind(patch.system_prompt.flatten())
        .bind(&patch.config)
        .fetch_optional(&*self.pool)
        .await
        .map_err(pg_err)?;
        row.as_ref().map(Agent::try_from_row).transpose().map_err(row_err)
    }

    async fn delete(&self, id: i64) -> CoreResult<bool> {
        let result = sqlx::query("DELETE FROM agent WHERE id = $1")
            .bind(id)
            .execute(&*self.pool)
            .await
            .map_err(pg_err)?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helper::{new_test_agent, setup_test_stores};
    use serial_test::serial;

    #[tokio::test]
    #[serial]
    #[ignore = "requires a running Postgres (DATABASE_URL)"]
    async fn test_agent_crud_roundtrip() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let stores = setup_test_stores().await?;
        let store = PgAgentStore::new(stores.pool());

        let created = store.insert(new_test_agent("triage")).await?;
        assert!(created.is_active);

        let patch = AgentPatch {
            is_active: Some(false),
            description: Some(None),
            ..Default::default()
        };
        let updated = store.update(created.id, patch).await?.unwrap();
        assert!(!updated.is_active);
        assert_eq!(updated.description, None);
        assert_eq!(updated.name, created.name);

        assert!(store.delete(created.id).await?);
        assert!(store.get_by_id(created.id).await?.is_none());
        Ok(())
    }
}
