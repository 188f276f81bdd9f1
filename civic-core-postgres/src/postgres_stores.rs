use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use civic_core_api::{CoreError, CoreResult};
use civic_core_db::repository::pipeline::PipelinePorts;

use crate::repository::{
    PgAgentResultStore, PgAgentStore, PgAuditStore, PgLedgerRecordStore, PgRequestStore,
};
use crate::utils::pg_err;

/// Connection settings, read from the environment in deployments.
#[derive(Debug, Clone)]
pub struct PgSettings {
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl PgSettings {
    /// Reads `DATABASE_URL` (required) and `DATABASE_MAX_CONNECTIONS`
    /// (optional, default 5).
    pub fn from_env() -> CoreResult<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| CoreError::Internal("DATABASE_URL is not set".to_string()))?;
        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);
        Ok(Self {
            database_url,
            max_connections,
            acquire_timeout: Duration::from_secs(30),
        })
    }
}

/// Factory for the Postgres-backed persistence ports.
pub struct PostgresStores {
    pool: Arc<PgPool>,
}

impl PostgresStores {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    pub async fn connect(settings: &PgSettings) -> CoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.acquire_timeout)
            .connect(&settings.database_url)
            .await
            .map_err(pg_err)?;
        Ok(Self::new(Arc::new(pool)))
    }

    pub fn pool(&self) -> Arc<PgPool> {
        self.pool.clone()
    }

    /// Ports backed by this pool, ready for `Pipeline::new`.
    pub fn ports(&self) -> PipelinePorts {
        PipelinePorts {
            requests: Arc::new(PgRequestStore::new(self.pool.clone())),
            agents: Arc::new(PgAgentStore::new(self.pool.clone())),
            agent_results: Arc::new(PgAgentResultStore::new(self.pool.clone())),
            ledger_records: Arc::new(PgLedgerRecordStore::new(self.pool.clone())),
            audit: Arc::new(PgAuditStore::new(self.pool.clone())),
        }
    }
}
