pub mod agent;
pub mod agent_result;
pub mod audit;
pub mod entity_type;
pub mod identifiable;
pub mod ledger;
pub mod request;

// Re-exports
pub use agent::*;
pub use agent_result::*;
pub use audit::*;
pub use entity_type::*;
pub use identifiable::*;
pub use ledger::*;
pub use request::*;
