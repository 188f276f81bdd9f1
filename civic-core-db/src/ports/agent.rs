use async_trait::async_trait;
use civic_core_api::CoreResult;

use crate::models::agent::{Agent, AgentPatch, NewAgent};

/// Narrow persistence port for agents.
#[async_trait]
pub trait AgentStore: Send + Sync {
    async fn get_all(&self) -> CoreResult<Vec<Agent>>;

    async fn get_by_id(&self, id: i64) -> CoreResult<Option<Agent>>;

    async fn insert(&self, new: NewAgent) -> CoreResult<Agent>;

    async fn update(&self, id: i64, patch: AgentPatch) -> CoreResult<Option<Agent>>;

    /// Returns `true` if a row was removed.
    async fn delete(&self, id: i64) -> CoreResult<bool>;
}
