use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::anchor::{AnchorSubmission, LedgerAnchorClient};
use crate::cache::{entity_cache_key, EntityCache};
use crate::journal::AuditJournal;
use crate::models::audit::AuditOperation;
use crate::models::entity_type::EntityType;
use crate::models::ledger::{LedgerStatus, NewLedgerRecord};
use crate::ports::ledger::LedgerRecordStore;
use crate::ports::request::RequestStore;

/// Retry policy for the dispatch worker.
#[derive(Debug, Clone)]
pub struct EffectQueueConfig {
    /// Attempts per effect before it is logged and dropped.
    pub max_attempts: u32,
    /// Base delay for exponential backoff.
    pub backoff_base: Duration,
    /// Upper bound on a single backoff delay.
    pub backoff_cap: Duration,
}

impl Default for EffectQueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_millis(50),
            backoff_cap: Duration::from_secs(2),
        }
    }
}

/// Ledger anchoring request queued by a repository write.
#[derive(Debug, Clone)]
pub struct AnchorCommand {
    pub entity_type: EntityType,
    pub entity_id: i64,
    /// Logical operation the anchor documents; becomes the record_type.
    pub action: String,
    pub title: String,
    /// Hex content digest of the entity state.
    pub digest: String,
    pub metadata: serde_json::Value,
}

/// Audit append queued by a repository write.
#[derive(Debug, Clone)]
pub struct AuditCommand {
    pub operation: AuditOperation,
    pub entity_type: EntityType,
    pub entity_id: Option<i64>,
    pub description: String,
    pub actor_id: Option<i64>,
    pub metadata: serde_json::Value,
}

enum SideEffect {
    Audit(AuditCommand),
    Anchor(AnchorCommand),
    Barrier(oneshot::Sender<()>),
}

/// Fire-and-forget dispatch of audit appends and ledger submissions.
///
/// Effects run on a single worker task in enqueue order, decoupling the
/// caller's latency from side-effect latency. Failures never reach the
/// caller: each effect is retried with backoff, then logged and dropped.
/// Once enqueued an effect is not cancellable.
#[derive(Clone)]
pub struct SideEffects {
    tx: mpsc::UnboundedSender<SideEffect>,
}

impl SideEffects {
    /// Spawn the dispatch worker and return the enqueue handle.
    pub fn spawn(
        journal: AuditJournal,
        anchor_client: Arc<dyn LedgerAnchorClient>,
        ledger_records: Arc<dyn LedgerRecordStore>,
        requests: Arc<dyn RequestStore>,
        cache: Arc<dyn EntityCache>,
        config: EffectQueueConfig,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = EffectWorker {
            journal,
            anchor_client,
            ledger_records,
            requests,
            cache,
            config,
        };
        tokio::spawn(worker.run(rx));
        Self { tx }
    }

    pub fn enqueue_audit(&self, command: AuditCommand) {
        if self.tx.send(SideEffect::Audit(command)).is_err() {
            warn!("side-effect worker is gone, dropping audit append");
        }
    }

    pub fn enqueue_anchor(&self, command: AnchorCommand) {
        if self.tx.send(SideEffect::Anchor(command)).is_err() {
            warn!("side-effect worker is gone, dropping ledger submission");
        }
    }

    /// Wait until every effect enqueued before this call has been
    /// handled. Used by tests and by graceful shutdown.
    pub async fn drain(&self) {
        let (tx, rx) = oneshot::channel();
        if self.tx.send(SideEffect::Barrier(tx)).is_ok() {
            let _ = rx.await;
        }
    }
}

struct EffectWorker {
    journal: AuditJournal,
    anchor_client: Arc<dyn LedgerAnchorClient>,
    ledger_records: Arc<dyn LedgerRecordStore>,
    requests: Arc<dyn RequestStore>,
    cache: Arc<dyn EntityCache>,
    config: EffectQueueConfig,
}

impl EffectWorker {
    async fn run(self, mut rx: mpsc::UnboundedReceiver<SideEffect>) {
        info!("side-effect dispatch worker started");
        while let Some(effect) = rx.recv().await {
            match effect {
                SideEffect::Audit(command) => self.handle_audit(command).await,
                SideEffect::Anchor(command) => self.handle_anchor(command).await,
                SideEffect::Barrier(done) => {
                    let _ = done.send(());
                }
            }
        }
        info!("side-effect dispatch worker stopped");
    }

    async fn handle_audit(&self, command: AuditCommand) {
        for attempt in 0..self.config.max_attempts {
            let result = self
                .journal
                .append(
                    command.operation,
                    command.entity_type,
                    command.entity_id,
                    command.description.clone(),
                    command.actor_id,
                    command.metadata.clone(),
                )
                .await;
            match result {
                Ok(()) => return,
                Err(err) if attempt + 1 < self.config.max_attempts => {
                    debug!(%err, attempt, "audit append failed, retrying");
                    tokio::time::sleep(self.backoff(attempt)).await;
                }
                Err(err) => {
                    warn!(
                        %err,
                        entity_type = %command.entity_type,
                        operation = %command.operation,
                        "audit append failed, dropping entry"
                    );
                }
            }
        }
    }

    async fn handle_anchor(&self, command: AnchorCommand) {
        if !command.entity_type.is_anchorable() {
            warn!(
                entity_type = %command.entity_type,
                entity_id = command.entity_id,
                "dropping anchor for non-anchorable entity family"
            );
            return;
        }

        // One active ledger record per (entity_type, entity_id, operation):
        // an unchanged digest is a duplicate submission and is suppressed;
        // a changed digest supersedes the previous active record.
        match self
            .ledger_records
            .find_active(command.entity_type, command.entity_id, &command.action)
            .await
        {
            Ok(Some(active)) if active.digest() == Some(command.digest.as_str()) => {
                debug!(
                    entity_type = %command.entity_type,
                    entity_id = command.entity_id,
                    action = %command.action,
                    "duplicate anchor suppressed, digest unchanged"
                );
                return;
            }
            Ok(Some(active)) => {
                if let Err(err) = self
                    .ledger_records
                    .set_status(active.id, LedgerStatus::Failed, None)
                    .await
                {
                    warn!(%err, record_id = active.id, "failed to supersede ledger record");
                }
            }
            Ok(None) => {}
            Err(err) => {
                warn!(%err, "active ledger record lookup failed, submitting anyway");
            }
        }

        let submission = AnchorSubmission {
            entity_type: command.entity_type,
            entity_id: command.entity_id,
            action: command.action.clone(),
            title: command.title.clone(),
            digest: command.digest.clone(),
            metadata: command.metadata.clone(),
        };

        for attempt in 0..self.config.max_attempts {
            match self.anchor_client.submit(submission.clone()).await {
                Ok(receipt) => {
                    self.record_receipt(&command, &receipt.transaction_hash).await;
                    return;
                }
                Err(err) if attempt + 1 < self.config.max_attempts => {
                    debug!(%err, attempt, "ledger submission failed, retrying");
                    tokio::time::sleep(self.backoff(attempt)).await;
                }
                Err(err) => {
                    warn!(
                        %err,
                        entity_type = %command.entity_type,
                        entity_id = command.entity_id,
                        action = %command.action,
                        "ledger submission failed, entity stays unanchored"
                    );
                }
            }
        }
    }

    /// Persist the pending ledger record and the denormalized hash on the
    /// owning entity. Both writes are best-effort.
    async fn record_receipt(&self, command: &AnchorCommand, transaction_hash: &str) {
        let mut metadata = serde_json::Map::new();
        metadata.insert("digest".into(), serde_json::Value::String(command.digest.clone()));
        if let serde_json::Value::Object(extra) = &command.metadata {
            for (key, value) in extra {
                metadata.insert(key.clone(), value.clone());
            }
        }

        let new_record = NewLedgerRecord {
            record_type: command.action.clone(),
            entity_type: command.entity_type,
            entity_id: command.entity_id,
            transaction_hash: transaction_hash.to_string(),
            status: LedgerStatus::Pending,
            metadata: serde_json::Value::Object(metadata),
        };
        if let Err(err) = self.ledger_records.insert(new_record).await {
            warn!(%err, "failed to persist pending ledger record");
        }

        if command.entity_type == EntityType::CitizenRequest {
            if let Err(err) = self
                .requests
                .set_blockchain_hash(command.entity_id, transaction_hash)
                .await
            {
                warn!(%err, entity_id = command.entity_id, "failed to denormalize ledger hash");
            }
            // The hash write bypasses the repository, so the stale cache
            // entry has to go here.
            self.cache
                .invalidate(&entity_cache_key(command.entity_type, command.entity_id))
                .await;
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let exp = self.config.backoff_base.saturating_mul(1 << attempt.min(16));
        let capped = exp.min(self.config.backoff_cap);
        let jitter = rand::thread_rng().gen_range(0..=self.config.backoff_base.as_millis() as u64);
        capped + Duration::from_millis(jitter)
    }
}
