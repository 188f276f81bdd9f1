use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::entity_type::EntityType;
use crate::models::identifiable::Identifiable;

/// Outcome of one agent action against one entity.
///
/// Immutable once created; no update path exists. The presence of a
/// result row referencing an agent blocks deletion of that agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    pub id: i64,
    pub agent_id: i64,
    pub entity_type: EntityType,
    pub entity_id: i64,
    pub action_type: String,
    pub result: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Identifiable for AgentResult {
    fn get_id(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAgentResult {
    pub agent_id: i64,
    pub entity_type: EntityType,
    pub entity_id: i64,
    pub action_type: String,
    pub result: serde_json::Value,
}
