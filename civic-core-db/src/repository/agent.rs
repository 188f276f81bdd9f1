use async_trait::async_trait;
use civic_core_api::CoreResult;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::cache::{entity_cache_key, read_through, EntityCache};
use crate::effects::{AuditCommand, SideEffects};
use crate::models::agent::{Agent, AgentPatch, NewAgent};
use crate::models::audit::AuditOperation;
use crate::models::entity_type::EntityType;
use crate::ports::agent::AgentStore;
use crate::ports::agent_result::AgentResultStore;
use crate::repository::create::Create;
use crate::repository::delete::Delete;
use crate::repository::get_all::GetAll;
use crate::repository::get_by_id::GetById;
use crate::repository::update::Update;
use crate::utils::text::CleanText;

/// Lifecycle repository for agents.
///
/// Agents are not anchored to the ledger; writes dispatch an audit
/// append and invalidate the cache key. Free-text fields are sanitized
/// at this boundary so stored text is always well-formed; stripping is
/// logged, never silent.
pub struct AgentRepository {
    store: Arc<dyn AgentStore>,
    agent_results: Arc<dyn AgentResultStore>,
    cache: Arc<dyn EntityCache>,
    effects: SideEffects,
    cache_ttl: Duration,
}

impl AgentRepository {
    pub fn new(
        store: Arc<dyn AgentStore>,
        agent_results: Arc<dyn AgentResultStore>,
        cache: Arc<dyn EntityCache>,
        effects: SideEffects,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            store,
            agent_results,
            cache,
            effects,
            cache_ttl,
        }
    }

    fn cache_key(id: i64) -> String {
        entity_cache_key(EntityType::Agent, id)
    }

    fn enqueue_audit(
        &self,
        operation: AuditOperation,
        entity_id: i64,
        description: String,
        actor_id: Option<i64>,
        metadata: serde_json::Value,
    ) {
        self.effects.enqueue_audit(AuditCommand {
            operation,
            entity_type: EntityType::Agent,
            entity_id: Some(entity_id),
            description,
            actor_id,
            metadata,
        });
    }
}

#[async_trait]
impl GetAll<Agent> for AgentRepository {
    async fn get_all(&self) -> CoreResult<Vec<Agent>> {
        self.store.get_all().await
    }
}

#[async_trait]
impl GetById<Agent> for AgentRepository {
    async fn get_by_id(&self, id: i64) -> CoreResult<Option<Agent>> {
        let key = Self::cache_key(id);
        read_through(self.cache.as_ref(), &key, self.cache_ttl, || {
            self.store.get_by_id(id)
        })
        .await
    }
}

#[async_trait]
impl Create<Agent, NewAgent> for AgentRepository {
    async fn create(&self, dto: NewAgent, actor_id: Option<i64>) -> CoreResult<Agent> {
        let dto = NewAgent {
            name: CleanText::sanitize(&dto.name).into_string(),
            description: dto.description.map(|s| CleanText::sanitize(&s).into_string()),
            system_prompt: dto
                .system_prompt
                .map(|s| CleanText::sanitize(&s).into_string()),
            ..dto
        };

        let created = self.store.insert(dto).await?;

        self.enqueue_audit(
            AuditOperation::Create,
            created.id,
            format!("agent created: {}", created.name),
            actor_id,
            json!({ "agent_type": created.agent_type, "model_id": created.model_id }),
        );

        self.cache.invalidate(&Self::cache_key(created.id)).await;
        Ok(created)
    }
}

#[async_trait]
impl Update<Agent, AgentPatch> for AgentRepository {
    async fn update(&self, id: i64, patch: AgentPatch, actor_id: Option<i64>) -> CoreResult<Option<Agent>> {
        let patch = AgentPatch {
            name: patch.name.map(|s| CleanText::sanitize(&s).into_string()),
            description: patch
                .description
                .map(|opt| opt.map(|s| CleanText::sanitize(&s).into_string())),
            system_prompt: patch
                .system_prompt
                .map(|opt| opt.map(|s| CleanText::sanitize(&s).into_string())),
            ..patch
        };

        let Some(updated) = self.store.update(id, patch).await? else {
            return Ok(None);
        };

        self.enqueue_audit(
            AuditOperation::Update,
            id,
            format!("agent updated: {}", updated.name),
            actor_id,
            json!({}),
        );

        self.cache.invalidate(&Self::cache_key(id)).await;
        Ok(Some(updated))
    }
}

#[async_trait]
impl Delete for AgentRepository {
    async fn delete(&self, id: i64, actor_id: Option<i64>) -> CoreResult<bool> {
        let inbound = self.agent_results.count_by_agent(id).await?;
        if inbound > 0 {
            warn!(agent_id = id, inbound, "delete skipped, agent results reference this agent");
            self.enqueue_audit(
                AuditOperation::DeleteSkipped,
                id,
                "delete skipped, agent results reference this agent".to_string(),
                actor_id,
                json!({ "agent_results": inbound }),
            );
            return Ok(false);
        }

        let removed = self.store.delete(id).await?;
        if removed {
            self.enqueue_audit(
                AuditOperation::Delete,
                id,
                "agent deleted".to_string(),
                actor_id,
                json!({}),
            );
            self.cache.invalidate(&Self::cache_key(id)).await;
        }
        Ok(removed)
    }
}
