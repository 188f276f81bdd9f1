//! In-memory port adapters for development and testing.
//!
//! Same contracts as the Postgres adapters in `civic-core-postgres`,
//! backed by mutex-guarded maps. Ids are assigned from a per-store
//! sequence, timestamps at insertion time.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use civic_core_api::{CoreError, CoreResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::models::agent::{Agent, AgentPatch, NewAgent};
use crate::models::agent_result::{AgentResult, NewAgentResult};
use crate::models::audit::AuditEntry;
use crate::models::entity_type::EntityType;
use crate::models::ledger::{LedgerRecord, LedgerStatus, NewLedgerRecord};
use crate::models::request::{CitizenRequest, CitizenRequestPatch, NewCitizenRequest, RequestStatus};
use crate::ports::agent::AgentStore;
use crate::ports::agent_result::AgentResultStore;
use crate::ports::audit::AuditStore;
use crate::ports::ledger::LedgerRecordStore;
use crate::ports::request::RequestStore;

fn lock<'a, T>(mutex: &'a Mutex<T>) -> CoreResult<MutexGuard<'a, T>> {
    mutex
        .lock()
        .map_err(|_| CoreError::Internal("mutex poisoned".to_string()))
}

#[derive(Clone)]
pub struct MemoryRequestStore {
    rows: Arc<Mutex<HashMap<i64, CitizenRequest>>>,
    next_id: Arc<AtomicI64>,
}

impl MemoryRequestStore {
    pub fn new() -> Self {
        Self {
            rows: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }
}

#[async_trait]
impl RequestStore for MemoryRequestStore {
    async fn get_all(&self) -> CoreResult<Vec<CitizenRequest>> {
        let rows = lock(&self.rows)?;
        let mut all: Vec<_> = rows.values().cloned().collect();
        all.sort_by_key(|r| r.id);
        Ok(all)
    }

    async fn get_by_id(&self, id: i64) -> CoreResult<Option<CitizenRequest>> {
        Ok(lock(&self.rows)?.get(&id).cloned())
    }

    async fn insert(&self, new: NewCitizenRequest) -> CoreResult<CitizenRequest> {
        let now = Utc::now();
        let request = CitizenRequest {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            full_name: new.full_name,
            contact_info: new.contact_info,
            request_type: new.request_type,
            subject: new.subject,
            description: new.description,
            status: RequestStatus::New,
            priority: new.priority,
            assigned_to: None,
            ai_processed: false,
            ai_classification: None,
            response_text: None,
            blockchain_hash: None,
            created_at: now,
            updated_at: now,
        };
        lock(&self.rows)?.insert(request.id, request.clone());
        Ok(request)
    }

    async fn update(&self, id: i64, patch: CitizenRequestPatch) -> CoreResult<Option<CitizenRequest>> {
        let mut rows = lock(&self.rows)?;
        let Some(row) = rows.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(subject) = patch.subject {
            row.subject = subject;
        }
        if let Some(description) = patch.description {
            row.description = description;
        }
        if let Some(status) = patch.status {
            row.status = status;
        }
        if let Some(priority) = patch.priority {
            row.priority = priority;
        }
        if let Some(assigned_to) = patch.assigned_to {
            row.assigned_to = assigned_to;
        }
        if let Some(response_text) = patch.response_text {
            row.response_text = Some(response_text);
        }
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn mark_ai_processed(
        &self,
        id: i64,
        classification: &str,
    ) -> CoreResult<Option<CitizenRequest>> {
        let mut rows = lock(&self.rows)?;
        let Some(row) = rows.get_mut(&id) else {
            return Ok(None);
        };
        row.ai_processed = true;
        row.ai_classification = Some(classification.to_string());
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn set_blockchain_hash(&self, id: i64, hash: &str) -> CoreResult<()> {
        let mut rows = lock(&self.rows)?;
        if let Some(row) = rows.get_mut(&id) {
            row.blockchain_hash = Some(hash.to_string());
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> CoreResult<bool> {
        Ok(lock(&self.rows)?.remove(&id).is_some())
    }
}

#[derive(Clone)]
pub struct MemoryAgentStore {
    rows: Arc<Mutex<HashMap<i64, Agent>>>,
    next_id: Arc<AtomicI64>,
}

impl MemoryAgentStore {
    pub fn new() -> Self {
        Self {
            rows: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }
}

#[async_trait]
impl AgentStore for MemoryAgentStore {
    async fn get_all(&self) -> CoreResult<Vec<Agent>> {
        let rows = lock(&self.rows)?;
        let mut all: Vec<_> = rows.values().cloned().collect();
        all.sort_by_key(|a| a.id);
        Ok(all)
    }

    async fn get_by_id(&self, id: i64) -> CoreResult<Option<Agent>> {
        Ok(lock(&self.rows)?.get(&id).cloned())
    }

    async fn insert(&self, new: NewAgent) -> CoreResult<Agent> {
        let now = Utc::now();
        let agent = Agent {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            name: new.name,
            agent_type: new.agent_type,
            description: new.description,
            model_id: new.model_id,
            is_active: true,
            system_prompt: new.system_prompt,
            config: new.config,
            created_at: now,
            updated_at: now,
        };
        lock(&self.rows)?.insert(agent.id, agent.clone());
        Ok(agent)
    }

    async fn update(&self, id: i64, patch: AgentPatch) -> CoreResult<Option<Agent>> {
        let mut rows = lock(&self.rows)?;
        let Some(row) = rows.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = patch.name {
            row.name = name;
        }
        if let Some(description) = patch.description {
            row.description = description;
        }
        if let Some(model_id) = patch.model_id {
            row.model_id = model_id;
        }
        if let Some(is_active) = patch.is_active {
            row.is_active = is_active;
        }
        if let Some(system_prompt) = patch.system_prompt {
            row.system_prompt = system_prompt;
        }
        if let Some(config) = patch.config {
            row.config = config;
        }
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn delete(&self, id: i64) -> CoreResult<bool> {
        Ok(lock(&self.rows)?.remove(&id).is_some())
    }
}

#[derive(Clone)]
pub struct MemoryAgentResultStore {
    rows: Arc<Mutex<HashMap<i64, AgentResult>>>,
    next_id: Arc<AtomicI64>,
}

impl MemoryAgentResultStore {
    pub fn new() -> Self {
        Self {
            rows: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }
}

#[async_trait]
impl AgentResultStore for MemoryAgentResultStore {
    async fn get_by_id(&self, id: i64) -> CoreResult<Option<AgentResult>> {
        Ok(lock(&self.rows)?.get(&id).cloned())
    }

    async fn get_by_agent(&self, agent_id: i64) -> CoreResult<Vec<AgentResult>> {
        let rows = lock(&self.rows)?;
        let mut matching: Vec<_> = rows
            .values()
            .filter(|r| r.agent_id == agent_id)
            .cloned()
            .collect();
        matching.sort_by_key(|r| r.id);
        Ok(matching)
    }

    async fn get_by_entity(
        &self,
        entity_type: EntityType,
        entity_id: i64,
    ) -> CoreResult<Vec<AgentResult>> {
        let rows = lock(&self.rows)?;
        let mut matching: Vec<_> = rows
            .values()
            .filter(|r| r.entity_type == entity_type && r.entity_id == entity_id)
            .cloned()
            .collect();
        matching.sort_by_key(|r| r.id);
        Ok(matching)
    }

    async fn insert(&self, new: NewAgentResult) -> CoreResult<AgentResult> {
        let result = AgentResult {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            agent_id: new.agent_id,
            entity_type: new.entity_type,
            entity_id: new.entity_id,
            action_type: new.action_type,
            result: new.result,
            created_at: Utc::now(),
        };
        lock(&self.rows)?.insert(result.id, result.clone());
        Ok(result)
    }

    async fn count_by_agent(&self, agent_id: i64) -> CoreResult<i64> {
        let rows = lock(&self.rows)?;
        Ok(rows.values().filter(|r| r.agent_id == agent_id).count() as i64)
    }

    async fn count_by_entity(&self, entity_type: EntityType, entity_id: i64) -> CoreResult<i64> {
        let rows = lock(&self.rows)?;
        Ok(rows
            .values()
            .filter(|r| r.entity_type == entity_type && r.entity_id == entity_id)
            .count() as i64)
    }
}

#[derive(Clone)]
pub struct MemoryLedgerRecordStore {
    rows: Arc<Mutex<HashMap<i64, LedgerRecord>>>,
    next_id: Arc<AtomicI64>,
}

impl MemoryLedgerRecordStore {
    pub fn new() -> Self {
        Self {
            rows: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }
}

#[async_trait]
impl LedgerRecordStore for MemoryLedgerRecordStore {
    async fn get_by_id(&self, id: i64) -> CoreResult<Option<LedgerRecord>> {
        Ok(lock(&self.rows)?.get(&id).cloned())
    }

    async fn get_by_entity(
        &self,
        entity_type: EntityType,
        entity_id: i64,
    ) -> CoreResult<Vec<LedgerRecord>> {
        let rows = lock(&self.rows)?;
        let mut matching: Vec<_> = rows
            .values()
            .filter(|r| r.entity_type == entity_type && r.entity_id == entity_id)
            .cloned()
            .collect();
        matching.sort_by_key(|r| r.id);
        Ok(matching)
    }

    async fn get_by_transaction_hash(&self, hash: &str) -> CoreResult<Option<LedgerRecord>> {
        let rows = lock(&self.rows)?;
        Ok(rows.values().find(|r| r.transaction_hash == hash).cloned())
    }

    async fn get_recent(&self, limit: usize) -> CoreResult<Vec<LedgerRecord>> {
        let rows = lock(&self.rows)?;
        let mut all: Vec<_> = rows.values().cloned().collect();
        all.sort_by_key(|r| std::cmp::Reverse(r.id));
        all.truncate(limit);
        Ok(all)
    }

    async fn find_active(
        &self,
        entity_type: EntityType,
        entity_id: i64,
        record_type: &str,
    ) -> CoreResult<Option<LedgerRecord>> {
        let rows = lock(&self.rows)?;
        Ok(rows
            .values()
            .find(|r| {
                r.entity_type == entity_type
                    && r.entity_id == entity_id
                    && r.record_type == record_type
                    && r.status.is_active()
            })
            .cloned())
    }

    async fn insert(&self, new: NewLedgerRecord) -> CoreResult<LedgerRecord> {
        let record = LedgerRecord {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            record_type: new.record_type,
            entity_type: new.entity_type,
            entity_id: new.entity_id,
            transaction_hash: new.transaction_hash,
            status: new.status,
            metadata: new.metadata,
            created_at: Utc::now(),
            confirmed_at: None,
        };
        lock(&self.rows)?.insert(record.id, record.clone());
        Ok(record)
    }

    async fn set_status(
        &self,
        id: i64,
        status: LedgerStatus,
        confirmed_at: Option<DateTime<Utc>>,
    ) -> CoreResult<Option<LedgerRecord>> {
        let mut rows = lock(&self.rows)?;
        let Some(row) = rows.get_mut(&id) else {
            return Ok(None);
        };
        row.status = status;
        row.confirmed_at = confirmed_at;
        Ok(Some(row.clone()))
    }

    async fn count_by_entity(&self, entity_type: EntityType, entity_id: i64) -> CoreResult<i64> {
        let rows = lock(&self.rows)?;
        Ok(rows
            .values()
            .filter(|r| r.entity_type == entity_type && r.entity_id == entity_id)
            .count() as i64)
    }
}

#[derive(Clone, Default)]
pub struct MemoryAuditStore {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn append(&self, entry: AuditEntry) -> CoreResult<()> {
        lock(&self.entries)?.push(entry);
        Ok(())
    }

    async fn get_by_entity(
        &self,
        entity_type: EntityType,
        entity_id: i64,
    ) -> CoreResult<Vec<AuditEntry>> {
        let entries = lock(&self.entries)?;
        Ok(entries
            .iter()
            .filter(|e| e.entity_type == entity_type && e.entity_id == Some(entity_id))
            .cloned()
            .collect())
    }

    async fn get_recent(&self, limit: usize) -> CoreResult<Vec<AuditEntry>> {
        let entries = lock(&self.entries)?;
        Ok(entries.iter().rev().take(limit).cloned().collect())
    }
}
