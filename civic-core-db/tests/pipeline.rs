//! End-to-end pipeline tests over the in-memory port adapters.
//!
//! The side-effect queue is drained with a barrier before asserting on
//! journal or ledger state, since audit and anchor dispatch run behind
//! the caller.

use async_trait::async_trait;
use chrono::Utc;
use civic_core_api::{CoreError, CoreResult};
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use civic_core_db::memory::{
    MemoryAgentResultStore, MemoryAgentStore, MemoryAuditStore, MemoryLedgerRecordStore,
    MemoryRequestStore,
};
use civic_core_db::models::agent::NewAgent;
use civic_core_db::models::agent_result::NewAgentResult;
use civic_core_db::models::request::{
    CitizenRequestPatch, NewCitizenRequest, RequestPriority, RequestStatus,
};
use civic_core_db::{
    AgentResultStore, AnchorCommand, AnchorError, AnchorReceipt, AnchorSubmission, AuditEntry,
    AuditOperation, AuditStore, CitizenRequest, Create, Delete, EntityType, GetById,
    LedgerAnchorClient,
    LedgerStatus, MokaCache, Pipeline, PipelineConfig, PipelinePorts, RequestStore, Update,
};

/// Ledger client double that hands out sequential transaction hashes.
struct StaticLedgerClient {
    seq: AtomicU64,
}

impl StaticLedgerClient {
    fn new() -> Self {
        Self {
            seq: AtomicU64::new(1),
        }
    }
}

#[async_trait]
impl LedgerAnchorClient for StaticLedgerClient {
    async fn submit(&self, _submission: AnchorSubmission) -> Result<AnchorReceipt, AnchorError> {
        let n = self.seq.fetch_add(1, Ordering::SeqCst);
        Ok(AnchorReceipt {
            transaction_hash: format!("0x{n:016x}"),
        })
    }
}

/// Ledger client double simulating an unavailable node.
struct FailingLedgerClient;

#[async_trait]
impl LedgerAnchorClient for FailingLedgerClient {
    async fn submit(&self, _submission: AnchorSubmission) -> Result<AnchorReceipt, AnchorError> {
        Err(AnchorError::Network("connection refused".to_string()))
    }
}

/// Request store decorator counting persistence reads, for the
/// cache-hit assertions.
struct CountingRequestStore {
    inner: MemoryRequestStore,
    reads: AtomicU64,
}

impl CountingRequestStore {
    fn new() -> Self {
        Self {
            inner: MemoryRequestStore::new(),
            reads: AtomicU64::new(0),
        }
    }

    fn read_count(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RequestStore for CountingRequestStore {
    async fn get_all(&self) -> CoreResult<Vec<CitizenRequest>> {
        self.inner.get_all().await
    }

    async fn get_by_id(&self, id: i64) -> CoreResult<Option<CitizenRequest>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get_by_id(id).await
    }

    async fn insert(&self, new: NewCitizenRequest) -> CoreResult<CitizenRequest> {
        self.inner.insert(new).await
    }

    async fn update(
        &self,
        id: i64,
        patch: CitizenRequestPatch,
    ) -> CoreResult<Option<CitizenRequest>> {
        self.inner.update(id, patch).await
    }

    async fn mark_ai_processed(
        &self,
        id: i64,
        classification: &str,
    ) -> CoreResult<Option<CitizenRequest>> {
        self.inner.mark_ai_processed(id, classification).await
    }

    async fn set_blockchain_hash(&self, id: i64, hash: &str) -> CoreResult<()> {
        self.inner.set_blockchain_hash(id, hash).await
    }

    async fn delete(&self, id: i64) -> CoreResult<bool> {
        self.inner.delete(id).await
    }
}

/// Request store decorator that can hold one read open until released,
/// so a write can land between the load and the cache populate.
struct GatedRequestStore {
    inner: MemoryRequestStore,
    armed: AtomicBool,
    entered: Semaphore,
    release: Semaphore,
}

impl GatedRequestStore {
    fn new() -> Self {
        Self {
            inner: MemoryRequestStore::new(),
            armed: AtomicBool::new(false),
            entered: Semaphore::new(0),
            release: Semaphore::new(0),
        }
    }

    /// Gate the next `get_by_id`.
    fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl RequestStore for GatedRequestStore {
    async fn get_all(&self) -> CoreResult<Vec<CitizenRequest>> {
        self.inner.get_all().await
    }

    async fn get_by_id(&self, id: i64) -> CoreResult<Option<CitizenRequest>> {
        let row = self.inner.get_by_id(id).await;
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.add_permits(1);
            let _ = self.release.acquire().await;
        }
        row
    }

    async fn insert(&self, new: NewCitizenRequest) -> CoreResult<CitizenRequest> {
        self.inner.insert(new).await
    }

    async fn update(
        &self,
        id: i64,
        patch: CitizenRequestPatch,
    ) -> CoreResult<Option<CitizenRequest>> {
        self.inner.update(id, patch).await
    }

    async fn mark_ai_processed(
        &self,
        id: i64,
        classification: &str,
    ) -> CoreResult<Option<CitizenRequest>> {
        self.inner.mark_ai_processed(id, classification).await
    }

    async fn set_blockchain_hash(&self, id: i64, hash: &str) -> CoreResult<()> {
        self.inner.set_blockchain_hash(id, hash).await
    }

    async fn delete(&self, id: i64) -> CoreResult<bool> {
        self.inner.delete(id).await
    }
}

/// Audit store double simulating an unavailable journal.
struct FailingAuditStore;

#[async_trait]
impl AuditStore for FailingAuditStore {
    async fn append(&self, _entry: AuditEntry) -> CoreResult<()> {
        Err(CoreError::Persistence("journal unavailable".to_string()))
    }

    async fn get_by_entity(
        &self,
        _entity_type: EntityType,
        _entity_id: i64,
    ) -> CoreResult<Vec<AuditEntry>> {
        Ok(Vec::new())
    }

    async fn get_recent(&self, _limit: usize) -> CoreResult<Vec<AuditEntry>> {
        Ok(Vec::new())
    }
}

struct Harness {
    pipeline: Pipeline,
    requests: Arc<CountingRequestStore>,
    agent_results: Arc<MemoryAgentResultStore>,
}

fn harness(anchor_client: Arc<dyn LedgerAnchorClient>) -> Harness {
    let requests = Arc::new(CountingRequestStore::new());
    let agent_results = Arc::new(MemoryAgentResultStore::new());
    let ledger_records = Arc::new(MemoryLedgerRecordStore::new());
    let ports = PipelinePorts {
        requests: requests.clone(),
        agents: Arc::new(MemoryAgentStore::new()),
        agent_results: agent_results.clone(),
        ledger_records: ledger_records.clone(),
        audit: Arc::new(MemoryAuditStore::new()),
    };
    let cache = Arc::new(MokaCache::new(1_000));
    let pipeline = Pipeline::new(ports, cache, anchor_client, PipelineConfig::default());
    Harness {
        pipeline,
        requests,
        agent_results,
    }
}

fn new_request(full_name: &str) -> NewCitizenRequest {
    NewCitizenRequest {
        full_name: full_name.to_string(),
        contact_info: "citizen@example.org".to_string(),
        request_type: "infrastructure".to_string(),
        subject: "Streetlight out on Oak Avenue".to_string(),
        description: "The light at the corner has been dark for a week.".to_string(),
        priority: RequestPriority::Medium,
    }
}

#[tokio::test]
async fn write_then_read_returns_persisted_fields() {
    let h = harness(Arc::new(StaticLedgerClient::new()));

    let created = h.pipeline.requests.create(new_request("A"), None).await.unwrap();
    let read = h.pipeline.requests.get_by_id(created.id).await.unwrap().unwrap();
    assert_eq!(read.full_name, "A");
    assert_eq!(read.status, RequestStatus::New);

    let updated = h
        .pipeline
        .requests
        .update(
            created.id,
            CitizenRequestPatch {
                subject: Some("Streetlight out, pole 14".to_string()),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.subject, "Streetlight out, pole 14");

    // The write invalidated the key, so this read must see the new value.
    let read = h.pipeline.requests.get_by_id(created.id).await.unwrap().unwrap();
    assert_eq!(read.subject, "Streetlight out, pole 14");
}

#[tokio::test]
async fn agent_delete_is_blocked_by_referencing_results() {
    let h = harness(Arc::new(StaticLedgerClient::new()));

    let agent = h
        .pipeline
        .agents
        .create(
            NewAgent {
                name: "X".to_string(),
                agent_type: "classifier".to_string(),
                description: None,
                model_id: "mistral".to_string(),
                system_prompt: None,
                config: json!({}),
            },
            None,
        )
        .await
        .unwrap();

    h.pipeline
        .agent_results
        .create(
            NewAgentResult {
                agent_id: agent.id,
                entity_type: EntityType::CitizenRequest,
                entity_id: 99,
                action_type: "classification".to_string(),
                result: json!({"label": "roads"}),
            },
            None,
        )
        .await
        .unwrap();

    let removed = h.pipeline.agents.delete(agent.id, None).await.unwrap();
    assert!(!removed);

    let still_there = h.pipeline.agents.get_by_id(agent.id).await.unwrap();
    assert!(still_there.is_some());
}

#[tokio::test]
async fn every_successful_write_lands_in_the_journal() {
    let h = harness(Arc::new(StaticLedgerClient::new()));
    let start = Utc::now();

    let created = h.pipeline.requests.create(new_request("B"), None).await.unwrap();
    h.pipeline.effects.drain().await;

    let entries = h
        .pipeline
        .journal
        .get_by_entity(EntityType::CitizenRequest, created.id)
        .await
        .unwrap();
    assert!(!entries.is_empty());
    assert!(entries.iter().all(|e| e.timestamp >= start));
    assert!(entries
        .iter()
        .any(|e| e.operation == AuditOperation::Create));
}

#[tokio::test]
async fn ledger_failure_does_not_block_the_write() {
    let h = harness(Arc::new(FailingLedgerClient));

    let created = h.pipeline.requests.create(new_request("C"), None).await.unwrap();
    h.pipeline.effects.drain().await;

    let read = h.pipeline.requests.get_by_id(created.id).await.unwrap().unwrap();
    assert_eq!(read.full_name, "C");
    assert_eq!(read.blockchain_hash, None);

    let anchors = h
        .pipeline
        .ledger_records
        .get_by_entity(EntityType::CitizenRequest, created.id)
        .await
        .unwrap();
    assert!(anchors.is_empty());
}

#[tokio::test]
async fn status_transitions_are_validated_and_journaled() {
    let h = harness(Arc::new(StaticLedgerClient::new()));
    let created = h.pipeline.requests.create(new_request("D"), None).await.unwrap();

    h.pipeline
        .requests
        .update_status(created.id, RequestStatus::InProgress, None)
        .await
        .unwrap()
        .unwrap();
    h.pipeline
        .requests
        .update_status(created.id, RequestStatus::Completed, None)
        .await
        .unwrap()
        .unwrap();

    // Terminal: no way back to new.
    let err = h
        .pipeline
        .requests
        .update_status(created.id, RequestStatus::New, None)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));

    h.pipeline.effects.drain().await;
    let entries = h
        .pipeline
        .journal
        .get_by_entity(EntityType::CitizenRequest, created.id)
        .await
        .unwrap();
    let transitions: Vec<_> = entries
        .iter()
        .filter(|e| e.operation == AuditOperation::StatusChange)
        .collect();
    assert_eq!(transitions.len(), 2);
    assert_eq!(transitions[0].metadata["old_status"], "new");
    assert_eq!(transitions[0].metadata["new_status"], "in_progress");
    assert_eq!(transitions[1].metadata["old_status"], "in_progress");
    assert_eq!(transitions[1].metadata["new_status"], "completed");
}

#[tokio::test]
async fn ai_processing_marks_the_request_and_records_one_result() {
    let h = harness(Arc::new(StaticLedgerClient::new()));
    let created = h.pipeline.requests.create(new_request("A"), None).await.unwrap();

    let processed = h
        .pipeline
        .requests
        .process_ai_result(created.id, 7, "roads", json!({"confidence": 0.93}), None)
        .await
        .unwrap()
        .unwrap();
    assert!(processed.ai_processed);
    assert_eq!(processed.ai_classification.as_deref(), Some("roads"));
    assert_eq!(processed.status, RequestStatus::InProgress);

    let results = h
        .agent_results
        .get_by_entity(EntityType::CitizenRequest, created.id)
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].agent_id, 7);

    h.pipeline.effects.drain().await;
    let entries = h
        .pipeline
        .journal
        .get_by_entity(EntityType::CitizenRequest, created.id)
        .await
        .unwrap();
    let ai_entries: Vec<_> = entries
        .iter()
        .filter(|e| e.operation == AuditOperation::AiProcess)
        .collect();
    assert_eq!(ai_entries.len(), 1);
}

#[tokio::test]
async fn request_delete_is_blocked_by_ledger_records() {
    let h = harness(Arc::new(StaticLedgerClient::new()));
    let created = h.pipeline.requests.create(new_request("E"), None).await.unwrap();
    h.pipeline.effects.drain().await;

    // The create anchor left a pending ledger record behind.
    let removed = h.pipeline.requests.delete(created.id, None).await.unwrap();
    assert!(!removed);
    assert!(h.pipeline.requests.get_by_id(created.id).await.unwrap().is_some());
}

#[tokio::test]
async fn second_read_is_served_from_cache() {
    let h = harness(Arc::new(StaticLedgerClient::new()));
    let created = h.pipeline.requests.create(new_request("F"), None).await.unwrap();
    h.pipeline.effects.drain().await;

    let before = h.requests.read_count();
    h.pipeline.requests.get_by_id(created.id).await.unwrap();
    assert_eq!(h.requests.read_count(), before + 1);

    // No intervening write: this one must not re-hit persistence.
    h.pipeline.requests.get_by_id(created.id).await.unwrap();
    assert_eq!(h.requests.read_count(), before + 1);
}

#[tokio::test]
async fn duplicate_anchor_for_unchanged_digest_is_suppressed() {
    let h = harness(Arc::new(StaticLedgerClient::new()));
    let created = h.pipeline.requests.create(new_request("G"), None).await.unwrap();

    // Two identical assignments anchor the same content digest.
    h.pipeline.requests.assign(created.id, Some(5), None).await.unwrap();
    h.pipeline.requests.assign(created.id, Some(5), None).await.unwrap();
    h.pipeline.effects.drain().await;

    let anchors = h
        .pipeline
        .ledger_records
        .get_by_entity(EntityType::CitizenRequest, created.id)
        .await
        .unwrap();
    let updates: Vec<_> = anchors.iter().filter(|r| r.record_type == "update").collect();
    assert_eq!(updates.len(), 1);
}

#[tokio::test]
async fn changed_digest_supersedes_the_previous_anchor() {
    let h = harness(Arc::new(StaticLedgerClient::new()));
    let created = h.pipeline.requests.create(new_request("H"), None).await.unwrap();

    h.pipeline.requests.assign(created.id, Some(5), None).await.unwrap();
    h.pipeline.requests.assign(created.id, Some(6), None).await.unwrap();
    h.pipeline.effects.drain().await;

    let anchors = h
        .pipeline
        .ledger_records
        .get_by_entity(EntityType::CitizenRequest, created.id)
        .await
        .unwrap();
    let updates: Vec<_> = anchors.iter().filter(|r| r.record_type == "update").collect();
    assert_eq!(updates.len(), 2);
    assert_eq!(
        updates
            .iter()
            .filter(|r| r.status == LedgerStatus::Pending)
            .count(),
        1
    );
    assert_eq!(
        updates
            .iter()
            .filter(|r| r.status == LedgerStatus::Failed)
            .count(),
        1
    );
}

#[tokio::test]
async fn successful_anchor_denormalizes_the_transaction_hash() {
    let h = harness(Arc::new(StaticLedgerClient::new()));
    let created = h.pipeline.requests.create(new_request("I"), None).await.unwrap();
    h.pipeline.effects.drain().await;

    let read = h.pipeline.requests.get_by_id(created.id).await.unwrap().unwrap();
    let hash = read.blockchain_hash.expect("anchor should have landed");

    let record = h
        .pipeline
        .ledger_records
        .get_by_transaction_hash(&hash)
        .await
        .unwrap()
        .expect("pending ledger record");
    assert_eq!(record.status, LedgerStatus::Pending);
    assert_eq!(record.entity_id, created.id);

    let confirmed = h
        .pipeline
        .ledger_records
        .mark_confirmed(record.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(confirmed.status, LedgerStatus::Confirmed);
    assert!(confirmed.confirmed_at.is_some());
}

#[tokio::test]
async fn read_racing_a_write_does_not_resurrect_the_old_row() {
    let requests = Arc::new(GatedRequestStore::new());
    let ports = PipelinePorts {
        requests: requests.clone(),
        agents: Arc::new(MemoryAgentStore::new()),
        agent_results: Arc::new(MemoryAgentResultStore::new()),
        ledger_records: Arc::new(MemoryLedgerRecordStore::new()),
        audit: Arc::new(MemoryAuditStore::new()),
    };
    let pipeline = Arc::new(Pipeline::new(
        ports,
        Arc::new(MokaCache::new(1_000)),
        Arc::new(StaticLedgerClient::new()),
        PipelineConfig::default(),
    ));

    let created = pipeline.requests.create(new_request("J"), None).await.unwrap();
    pipeline.effects.drain().await;

    // Park a reader between its store load and its cache populate.
    requests.arm();
    let reader = tokio::spawn({
        let pipeline = pipeline.clone();
        let id = created.id;
        async move { pipeline.requests.get_by_id(id).await }
    });
    let _ = requests.entered.acquire().await.unwrap();

    // The write lands, including its synchronous invalidation, while
    // the reader still holds the old row.
    pipeline
        .requests
        .update(
            created.id,
            CitizenRequestPatch {
                subject: Some("Streetlight fixed".to_string()),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap()
        .unwrap();
    requests.release.add_permits(1);

    // The parked reader started before the write; the old row is a
    // valid answer for it.
    let stale = reader.await.unwrap().unwrap().unwrap();
    assert_eq!(stale.subject, "Streetlight out on Oak Avenue");

    // But its populate must not shadow the write for later readers.
    let read = pipeline.requests.get_by_id(created.id).await.unwrap().unwrap();
    assert_eq!(read.subject, "Streetlight fixed");
}

#[tokio::test]
async fn journal_failure_does_not_block_the_write() {
    let requests = Arc::new(MemoryRequestStore::new());
    let ports = PipelinePorts {
        requests: requests.clone(),
        agents: Arc::new(MemoryAgentStore::new()),
        agent_results: Arc::new(MemoryAgentResultStore::new()),
        ledger_records: Arc::new(MemoryLedgerRecordStore::new()),
        audit: Arc::new(FailingAuditStore),
    };
    let pipeline = Pipeline::new(
        ports,
        Arc::new(MokaCache::new(1_000)),
        Arc::new(StaticLedgerClient::new()),
        PipelineConfig::default(),
    );

    let created = pipeline.requests.create(new_request("K"), None).await.unwrap();
    let updated = pipeline
        .requests
        .update_status(created.id, RequestStatus::InProgress, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.status, RequestStatus::InProgress);

    // Appends fail and are retried inside the worker; nothing surfaces.
    pipeline.effects.drain().await;

    let read = pipeline.requests.get_by_id(created.id).await.unwrap().unwrap();
    assert_eq!(read.full_name, "K");
    assert_eq!(read.status, RequestStatus::InProgress);
}

#[tokio::test]
async fn anchors_for_non_anchorable_families_are_dropped() {
    let h = harness(Arc::new(StaticLedgerClient::new()));

    h.pipeline.effects.enqueue_anchor(AnchorCommand {
        entity_type: EntityType::Agent,
        entity_id: 1,
        action: "update".to_string(),
        title: "triage".to_string(),
        digest: "0f".repeat(32),
        metadata: json!({}),
    });
    h.pipeline.effects.drain().await;

    let anchors = h
        .pipeline
        .ledger_records
        .get_by_entity(EntityType::Agent, 1)
        .await
        .unwrap();
    assert!(anchors.is_empty());
}

#[tokio::test]
async fn require_surfaces_not_found_for_missing_ids() {
    let h = harness(Arc::new(StaticLedgerClient::new()));

    let err = h.pipeline.requests.require(424_242).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));

    let created = h.pipeline.requests.create(new_request("L"), None).await.unwrap();
    let found = h.pipeline.requests.require(created.id).await.unwrap();
    assert_eq!(found.id, created.id);
}
