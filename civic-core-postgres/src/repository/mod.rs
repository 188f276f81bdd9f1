pub mod agent_result_store;
pub mod agent_store;
pub mod audit_store;
pub mod ledger_record_store;
pub mod request_store;

pub use agent_result_store::PgAgentResultStore;
pub use agent_store::PgAgentStore;
pub use audit_store::PgAuditStore;
pub use ledger_record_store::PgLedgerRecordStore;
pub use request_store::PgRequestStore;
