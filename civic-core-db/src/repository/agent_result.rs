use async_trait::async_trait;
use civic_core_api::CoreResult;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{entity_cache_key, read_through, EntityCache};
use crate::effects::{AuditCommand, SideEffects};
use crate::models::agent_result::{AgentResult, NewAgentResult};
use crate::models::audit::AuditOperation;
use crate::models::entity_type::EntityType;
use crate::ports::agent_result::AgentResultStore;
use crate::repository::create::Create;
use crate::repository::get_by_id::GetById;

/// Lifecycle repository for agent results.
///
/// Results are immutable: create and read only, no update or delete.
pub struct AgentResultRepository {
    store: Arc<dyn AgentResultStore>,
    cache: Arc<dyn EntityCache>,
    effects: SideEffects,
    cache_ttl: Duration,
}

impl AgentResultRepository {
    pub fn new(
        store: Arc<dyn AgentResultStore>,
        cache: Arc<dyn EntityCache>,
        effects: SideEffects,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            store,
            cache,
            effects,
            cache_ttl,
        }
    }

    fn cache_key(id: i64) -> String {
        entity_cache_key(EntityType::AgentResult, id)
    }

    pub async fn get_by_agent(&self, agent_id: i64) -> CoreResult<Vec<AgentResult>> {
        self.store.get_by_agent(agent_id).await
    }

    pub async fn get_by_entity(
        &self,
        entity_type: EntityType,
        entity_id: i64,
    ) -> CoreResult<Vec<AgentResult>> {
        self.store.get_by_entity(entity_type, entity_id).await
    }
}

#[async_trait]
impl GetById<AgentResult> for AgentResultRepository {
    async fn get_by_id(&self, id: i64) -> CoreResult<Option<AgentResult>> {
        let key = Self::cache_key(id);
        read_through(self.cache.as_ref(), &key, self.cache_ttl, || {
            self.store.get_by_id(id)
        })
        .await
    }
}

#[async_trait]
impl Create<AgentResult, NewAgentResult> for AgentResultRepository {
    async fn create(&self, dto: NewAgentResult, actor_id: Option<i64>) -> CoreResult<AgentResult> {
        let created = self.store.insert(dto).await?;

        self.effects.enqueue_audit(AuditCommand {
            operation: AuditOperation::Create,
            entity_type: EntityType::AgentResult,
            entity_id: Some(created.id),
            description: format!("agent result recorded for agent {}", created.agent_id),
            actor_id,
            metadata: json!({
                "agent_id": created.agent_id,
                "target_entity_type": created.entity_type.to_string(),
                "target_entity_id": created.entity_id,
            }),
        });

        self.cache.invalidate(&Self::cache_key(created.id)).await;
        Ok(created)
    }
}
