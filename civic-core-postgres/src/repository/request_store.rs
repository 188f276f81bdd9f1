use std::error::Error;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use civic_core_api::CoreResult;
use civic_core_db::models::request::{
    CitizenRequest, CitizenRequestPatch, NewCitizenRequest, RequestStatus,
};
use civic_core_db::ports::request::RequestStore;

use crate::utils::{get_parsed, map_rows, pg_err, row_err, TryFromRow};

/// `RequestStore` backed by the `citizen_request` table.
pub struct PgRequestStore {
    pool: Arc<PgPool>,
}

impl PgRequestStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

impl TryFromRow<PgRow> for CitizenRequest {
    fn try_from_row(row: &PgRow) -> Result<Self, Box<dyn Error + Send + Sync>> {
        Ok(CitizenRequest {
            id: row.try_get("id")?,
            full_name: row.try_get("full_name")?,
            contact_info: row.try_get("contact_info")?,
            request_type: row.try_get("request_type")?,
            subject: row.try_get("subject")?,
            description: row.try_get("description")?,
            status: get_parsed(row, "status")?,
            priority: get_parsed(row, "priority")?,
            assigned_to: row.try_get("assigned_to")?,
            ai_processed: row.try_get("ai_processed")?,
            ai_classification: row.try_get("ai_classification")?,
            response_text: row.try_get("response_text")?,
            blockchain_hash: row.try_get("blockchain_hash")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl RequestStore for PgRequestStore {
    async fn get_all(&self) -> CoreResult<Vec<CitizenRequest>> {
        let rows = sqlx::query("SELECT * FROM citizen_request ORDER BY id")
            .fetch_all(&*self.pool)
            .await
            .map_err(pg_err)?;
        map_rows(&rows)
    }

    async fn get_by_id(&self, id: i64) -> CoreResult<Option<CitizenRequest>> {
        let row = sqlx::query("SELECT * FROM citizen_request WHERE id = $1")
            .bind(id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(pg_err)?;
        row.as_ref()
            .map(CitizenRequest::try_from_row)
            .transpose()
            .map_err(row_err)
    }

    async fn insert(&self, new: NewCitizenRequest) -> CoreResult<CitizenRequest> {
        let row = sqlx::query(
            r#"
            INSERT INTO citizen_request
                (full_name, contact_info, request_type, subject, description, status, priority)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(&new.full_name)
        .bind(&new.contact_info)
        .bind(&new.request_type)
        .bind(&new.subject)
        .bind(&new.description)
        .bind(RequestStatus::New.to_string())
        .bind(new.priority.to_string())
        .fetch_one(&*self.pool)
        .await
        .map_err(pg_err)?;
        CitizenRequest::try_from_row(&row).map_err(row_err)
    }

    async fn update(
        &self,
        id: i64,
        patch: CitizenRequestPatch,
    ) -> CoreResult<Option<CitizenRequest>> {
        // Double-option fields distinguish "leave as-is" from "set to
        // NULL" via an explicit flag bind; plain options use COALESCE.
        let row = sqlx::query(
            r#"
            UPDATE citizen_request SET
                subject       = COALESCE($2, subject),
                description   = COALESCE($3, description),
                status        = COALESCE($4, status),
                priority      = COALESCE($5, priority),
                assigned_to   = CASE WHEN $6 THEN $7 ELSE assigned_to END,
                response_text = COALESCE($8, response_text),
                updated_at    = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&patch.subject)
        .bind(&patch.description)
        .bind(patch.status.map(|s| s.to_string()))
        .bind(patch.priority.map(|p| p.to_string()))
        .bind(patch.assigned_to.is_some())
        .bind(patch.assigned_to.flatten())
        .bind(&patch.response_text)
        .fetch_optional(&*self.pool)
        .await
        .map_err(pg_err)?;
        row.as_ref()
            .map(CitizenRequest::try_from_row)
            .transpose()
            .map_err(row_err)
    }

    async fn mark_ai_processed(
        &self,
        id: i64,
        classification: &str,
    ) -> CoreResult<Option<CitizenRequest>> {
        let row = sqlx::query(
            r#"
            UPDATE citizen_request
            SET ai_processed = TRUE, ai_classification = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(classification)
        .fetch_optional(&*self.pool)
        .await
        .map_err(pg_err)?;
        row.as_ref()
            .map(CitizenRequest::try_from_row)
            .transpose()
            .map_err(row_err)
    }

    async fn set_blockchain_hash(&self, id: i64, hash: &str) -> CoreResult<()> {
        sqlx::query("UPDATE citizen_request SET blockchain_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(hash)
            .execute(&*self.pool)
            .await
            .map_err(pg_err)?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> CoreResult<bool> {
        let result = sqlx::query("DELETE FROM citizen_request WHERE id = $1")
            .bind(id)
            .execute(&*self.pool)
            .await
            .map_err(pg_err)?;
        Ok(result.rows_affected() > 0)
    }
}
