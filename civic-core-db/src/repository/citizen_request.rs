use async_trait::async_trait;
use civic_core_api::{CoreError, CoreResult};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::cache::{entity_cache_key, read_through, EntityCache};
use crate::effects::{AnchorCommand, AuditCommand, SideEffects};
use crate::models::audit::AuditOperation;
use crate::models::entity_type::EntityType;
use crate::models::request::{
    CitizenRequest, CitizenRequestPatch, NewCitizenRequest, RequestStatus,
};
use crate::ports::agent_result::AgentResultStore;
use crate::ports::ledger::LedgerRecordStore;
use crate::ports::request::RequestStore;
use crate::repository::create::Create;
use crate::repository::delete::Delete;
use crate::repository::get_all::GetAll;
use crate::repository::get_by_id::GetById;
use crate::repository::update::Update;
use crate::utils::content_digest;
use crate::utils::text::CleanText;

/// Lifecycle repository for citizen requests, the primary anchorable
/// entity family.
///
/// Every write runs the fixed dispatch order: persistence write, audit
/// append, ledger submission, cache invalidation. Audit and ledger go
/// through the side-effect queue and never block or fail the caller;
/// cache invalidation is synchronous before the call returns.
pub struct CitizenRequestRepository {
    store: Arc<dyn RequestStore>,
    agent_results: Arc<dyn AgentResultStore>,
    ledger_records: Arc<dyn LedgerRecordStore>,
    cache: Arc<dyn EntityCache>,
    effects: SideEffects,
    cache_ttl: Duration,
}

impl CitizenRequestRepository {
    pub fn new(
        store: Arc<dyn RequestStore>,
        agent_results: Arc<dyn AgentResultStore>,
        ledger_records: Arc<dyn LedgerRecordStore>,
        cache: Arc<dyn EntityCache>,
        effects: SideEffects,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            store,
            agent_results,
            ledger_records,
            cache,
            effects,
            cache_ttl,
        }
    }

    fn cache_key(id: i64) -> String {
        entity_cache_key(EntityType::CitizenRequest, id)
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
            entity_type: EntityType::CitizenRequest,
            entity_id: Some(entity_id),
            description,
            actor_id,
            metadata,
        });
    }

    fn enqueue_anchor(&self, request: &CitizenRequest, action: &str) {
        let digest = match content_digest(&request.anchor_payload()) {
            Ok(digest) => digest,
            Err(err) => {
                warn!(%err, request_id = request.id, "skipping anchor, digest failed");
                return;
            }
        };
        self.effects.enqueue_anchor(AnchorCommand {
            entity_type: EntityType::CitizenRequest,
            entity_id: request.id,
            action: action.to_string(),
            title: request.subject.clone(),
            digest,
            metadata: json!({ "request_type": request.request_type }),
        });
    }

    /// Change the request status. Thin wrapper over `update`; the state
    /// machine check happens there.
    pub async fn update_status(
        &self,
        id: i64,
        status: RequestStatus,
        actor_id: Option<i64>,
    ) -> CoreResult<Option<CitizenRequest>> {
        self.update(
            id,
            CitizenRequestPatch {
                status: Some(status),
                ..Default::default()
            },
            actor_id,
        )
        .await
    }

    /// Assign the request to a handler. Assignment does not itself change
    /// the status.
    pub async fn assign(
        &self,
        id: i64,
        assigned_to: Option<i64>,
        actor_id: Option<i64>,
    ) -> CoreResult<Option<CitizenRequest>> {
        self.update(
            id,
            CitizenRequestPatch {
                assigned_to: Some(assigned_to),
                ..Default::default()
            },
            actor_id,
        )
        .await
    }

    /// Record the outcome of an AI agent run against this request.
    ///
    /// Marks the request processed, stores the classification, moves
    /// `new` to `in_progress` when the request is not already past
    /// intake, and writes one immutable agent-result row. The whole run
    /// is journaled as a single `ai_process` entry.
    pub async fn process_ai_result(
        &self,
        id: i64,
        agent_id: i64,
        classification: &str,
        result: serde_json::Value,
        actor_id: Option<i64>,
    ) -> CoreResult<Option<CitizenRequest>> {
        let Some(current) = self.store.get_by_id(id).await? else {
            return Ok(None);
        };

        let mut updated = match self.store.mark_ai_processed(id, classification).await? {
            Some(updated) => updated,
            None => return Ok(None),
        };

        let old_status = current.status;
        let moved = old_status == RequestStatus::New;
        if moved {
            current.check_transition(RequestStatus::InProgress)?;
            if let Some(after) = self
                .store
                .update(
                    id,
                    CitizenRequestPatch {
                        status: Some(RequestStatus::InProgress),
                        ..Default::default()
                    },
                )
                .await?
            {
                updated = after;
            }
        }

        self.agent_results
            .insert(crate::models::agent_result::NewAgentResult {
                agent_id,
                entity_type: EntityType::CitizenRequest,
                entity_id: id,
                action_type: "classification".to_string(),
                result,
            })
            .await?;

        self.enqueue_audit(
            AuditOperation::AiProcess,
            id,
            format!("request processed by agent {agent_id}"),
            actor_id,
            json!({
                "agent_id": agent_id,
                "classification": classification,
                "old_status": old_status.to_string(),
                "new_status": updated.status.to_string(),
            }),
        );
        self.enqueue_anchor(&updated, if moved { "status_change" } else { "ai_process" });

        self.cache.invalidate(&Self::cache_key(id)).await;
        Ok(Some(updated))
    }
}

#[async_trait]
impl GetAll<CitizenRequest> for CitizenRequestRepository {
    async fn get_all(&self) -> CoreResult<Vec<CitizenRequest>> {
        self.store.get_all().await
    }
}

#[async_trait]
impl GetById<CitizenRequest> for CitizenRequestRepository {
    async fn get_by_id(&self, id: i64) -> CoreResult<Option<CitizenRequest>> {
        let key = Self::cache_key(id);
        read_through(self.cache.as_ref(), &key, self.cache_ttl, || {
            self.store.get_by_id(id)
        })
        .await
    }
}

#[async_trait]
impl Create<CitizenRequest, NewCitizenRequest> for CitizenRequestRepository {
    async fn create(&self, dto: NewCitizenRequest, actor_id: Option<i64>) -> CoreResult<CitizenRequest> {
        let dto = NewCitizenRequest {
            subject: CleanText::sanitize(&dto.subject).into_string(),
            description: CleanText::sanitize(&dto.description).into_string(),
            ..dto
        };

        let created = self.store.insert(dto).await?;

        self.enqueue_audit(
            AuditOperation::Create,
            created.id,
            format!("citizen request created: {}", created.subject),
            actor_id,
            json!({ "request_type": created.request_type }),
        );
        self.enqueue_anchor(&created, "create");

        self.cache.invalidate(&Self::cache_key(created.id)).await;
        Ok(created)
    }
}

#[async_trait]
impl Update<CitizenRequest, CitizenRequestPatch> for CitizenRequestRepository {
    async fn update(
        &self,
        id: i64,
        patch: CitizenRequestPatch,
        actor_id: Option<i64>,
    ) -> CoreResult<Option<CitizenRequest>> {
        // Transition validation happens before any persistence attempt.
        let mut status_change: Option<(RequestStatus, RequestStatus)> = None;
        if let Some(to) = patch.status {
            let Some(current) = self.store.get_by_id(id).await? else {
                return Ok(None);
            };
            let old = current.check_transition(to)?;
            if old != to {
                status_change = Some((old, to));
            }
        }

        let patch = CitizenRequestPatch {
            subject: patch.subject.map(|s| CleanText::sanitize(&s).into_string()),
            description: patch
                .description
                .map(|s| CleanText::sanitize(&s).into_string()),
            response_text: patch
                .response_text
                .map(|s| CleanText::sanitize(&s).into_string()),
            ..patch
        };

        let Some(updated) = self.store.update(id, patch).await? else {
            return Ok(None);
        };

        match status_change {
            Some((old, new)) => {
                self.enqueue_audit(
                    AuditOperation::StatusChange,
                    id,
                    format!("status {old} -> {new}"),
                    actor_id,
                    json!({ "old_status": old.to_string(), "new_status": new.to_string() }),
                );
                self.enqueue_anchor(&updated, "status_change");
            }
            None => {
                self.enqueue_audit(
                    AuditOperation::Update,
                    id,
                    "citizen request updated".to_string(),
                    actor_id,
                    json!({}),
                );
                self.enqueue_anchor(&updated, "update");
            }
        }

        self.cache.invalidate(&Self::cache_key(id)).await;
        Ok(Some(updated))
    }
}

#[async_trait]
impl Delete for CitizenRequestRepository {
    async fn delete(&self, id: i64, actor_id: Option<i64>) -> CoreResult<bool> {
        let inbound_results = self
            .agent_results
            .count_by_entity(EntityType::CitizenRequest, id)
            .await?;
        let inbound_anchors = self
            .ledger_records
            .count_by_entity(EntityType::CitizenRequest, id)
            .await?;
        if inbound_results > 0 || inbound_anchors > 0 {
            warn!(
                request_id = id,
                inbound_results, inbound_anchors, "delete skipped, inbound references exist"
            );
            self.enqueue_audit(
                AuditOperation::DeleteSkipped,
                id,
                "delete skipped, inbound references exist".to_string(),
                actor_id,
                json!({
                    "agent_results": inbound_results,
                    "ledger_records": inbound_anchors,
                }),
            );
            return Ok(false);
        }

        let removed = self.store.delete(id).await?;
        if removed {
            self.enqueue_audit(
                AuditOperation::Delete,
                id,
                "citizen request deleted".to_string(),
                actor_id,
                json!({}),
            );
            self.cache.invalidate(&Self::cache_key(id)).await;
        }
        Ok(removed)
    }
}

impl CitizenRequestRepository {
    /// Surface the store error taxonomy on absent ids where callers want
    /// an error instead of `None`.
    pub async fn require(&self, id: i64) -> CoreResult<CitizenRequest> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("citizen request {id}")))
    }
}
