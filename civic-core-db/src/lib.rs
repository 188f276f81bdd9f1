pub mod anchor;
pub mod cache;
pub mod effects;
pub mod journal;
pub mod memory;
pub mod models;
pub mod ports;
pub mod repository;
pub mod utils;

pub use anchor::*;
pub use cache::*;
pub use effects::*;
pub use journal::*;

// The entity modules under models/, ports/ and repository/ share names
// (agent, audit, ...), so the crate root re-exports items, not globs.
pub use models::{
    Agent, AgentPatch, AgentResult, AuditEntry, AuditOperation, CitizenRequest,
    CitizenRequestPatch, EntityType, Identifiable, LedgerRecord, LedgerStatus, NewAgent,
    NewAgentResult, NewCitizenRequest, NewLedgerRecord, RequestPriority, RequestStatus,
};
pub use ports::{AgentResultStore, AgentStore, AuditStore, LedgerRecordStore, RequestStore};
pub use repository::{
    AgentRepository, AgentResultRepository, CitizenRequestRepository, Create, Delete, GetAll,
    GetById, LedgerRecordRepository, Pipeline, PipelineConfig, PipelinePorts, Update,
};
