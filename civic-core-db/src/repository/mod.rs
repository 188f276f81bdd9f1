pub mod create;
pub mod delete;
pub mod get_all;
pub mod get_by_id;
pub mod update;

pub mod agent;
pub mod agent_result;
pub mod citizen_request;
pub mod ledger_record;
pub mod pipeline;

// Re-exports
pub use create::*;
pub use delete::*;
pub use get_all::*;
pub use get_by_id::*;
pub use update::*;

pub use agent::*;
pub use agent_result::*;
pub use citizen_request::*;
pub use ledger_record::*;
pub use pipeline::*;
