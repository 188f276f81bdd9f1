use async_trait::async_trait;
use civic_core_api::CoreResult;

use crate::models::agent_result::{AgentResult, NewAgentResult};
use crate::models::entity_type::EntityType;

/// Narrow persistence port for agent results.
///
/// Results are immutable; no update or delete exists. The count methods
/// back the referential guards on agent and request deletion.
#[async_trait]
pub trait AgentResultStore: Send + Sync {
    async fn get_by_id(&self, id: i64) -> CoreResult<Option<AgentResult>>;

    async fn get_by_agent(&self, agent_id: i64) -> CoreResult<Vec<AgentResult>>;

    async fn get_by_entity(
        &self,
        entity_type: EntityType,
        entity_id: i64,
    ) -> CoreResult<Vec<AgentResult>>;

    async fn insert(&self, new: NewAgentResult) -> CoreResult<AgentResult>;

    async fn count_by_agent(&self, agent_id: i64) -> CoreResult<i64>;

    async fn count_by_entity(&self, entity_type: EntityType, entity_id: i64) -> CoreResult<i64>;
}
