use std::sync::Arc;
use std::time::Duration;

use crate::anchor::LedgerAnchorClient;
use crate::cache::EntityCache;
use crate::effects::{EffectQueueConfig, SideEffects};
use crate::journal::AuditJournal;
use crate::ports::agent::AgentStore;
use crate::ports::agent_result::AgentResultStore;
use crate::ports::audit::AuditStore;
use crate::ports::ledger::LedgerRecordStore;
use crate::ports::request::RequestStore;
use crate::repository::agent::AgentRepository;
use crate::repository::agent_result::AgentResultRepository;
use crate::repository::citizen_request::CitizenRequestRepository;
use crate::repository::ledger_record::LedgerRecordRepository;

/// Persistence ports the pipeline is assembled from.
///
/// Postgres adapters come from `civic-core-postgres`; in-memory adapters
/// from `crate::memory` for development and tests.
pub struct PipelinePorts {
    pub requests: Arc<dyn RequestStore>,
    pub agents: Arc<dyn AgentStore>,
    pub agent_results: Arc<dyn AgentResultStore>,
    pub ledger_records: Arc<dyn LedgerRecordStore>,
    pub audit: Arc<dyn AuditStore>,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub cache_ttl: Duration,
    pub effects: EffectQueueConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(60),
            effects: EffectQueueConfig::default(),
        }
    }
}

/// One repository per entity family, sharing the cache, the journal and
/// the side-effect queue.
pub struct Pipeline {
    pub requests: CitizenRequestRepository,
    pub agents: AgentRepository,
    pub agent_results: AgentResultRepository,
    pub ledger_records: LedgerRecordRepository,
    pub journal: AuditJournal,
    pub effects: SideEffects,
}

impl Pipeline {
    /// Assemble the repositories and spawn the side-effect worker.
    pub fn new(
        ports: PipelinePorts,
        cache: Arc<dyn EntityCache>,
        anchor_client: Arc<dyn LedgerAnchorClient>,
        config: PipelineConfig,
    ) -> Self {
        let journal = AuditJournal::new(ports.audit.clone());
        let effects = SideEffects::spawn(
            journal.clone(),
            anchor_client,
            ports.ledger_records.clone(),
            ports.requests.clone(),
            cache.clone(),
            config.effects.clone(),
        );

        let requests = CitizenRequestRepository::new(
            ports.requests.clone(),
            ports.agent_results.clone(),
            ports.ledger_records.clone(),
            cache.clone(),
            effects.clone(),
            config.cache_ttl,
        );
        let agents = AgentRepository::new(
            ports.agents.clone(),
            ports.agent_results.clone(),
            cache.clone(),
            effects.clone(),
            config.cache_ttl,
        );
        let agent_results = AgentResultRepository::new(
            ports.agent_results.clone(),
            cache.clone(),
            effects.clone(),
            config.cache_ttl,
        );
        let ledger_records =
            LedgerRecordRepository::new(ports.ledger_records.clone(), effects.clone());

        Self {
            requests,
            agents,
            agent_results,
            ledger_records,
            journal,
            effects,
        }
    }
}
