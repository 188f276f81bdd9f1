pub mod agent;
pub mod agent_result;
pub mod audit;
pub mod ledger;
pub mod request;

// Re-exports
pub use agent::*;
pub use agent_result::*;
pub use audit::*;
pub use ledger::*;
pub use request::*;
