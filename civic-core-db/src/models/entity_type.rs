use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Entity families handled by the lifecycle pipeline.
///
/// The snake_case wire name is what audit entries, ledger records and
/// cache keys carry; `Display`/`FromStr` round-trip it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    CitizenRequest,
    Agent,
    AgentResult,
    LedgerRecord,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::CitizenRequest => "citizen_request",
            EntityType::Agent => "agent",
            EntityType::AgentResult => "agent_result",
            EntityType::LedgerRecord => "ledger_record",
        }
    }

    /// Whether writes to this entity family are anchored to the ledger.
    pub fn is_anchorable(&self) -> bool {
        matches!(self, EntityType::CitizenRequest)
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "citizen_request" => Ok(EntityType::CitizenRequest),
            "agent" => Ok(EntityType::Agent),
            "agent_result" => Ok(EntityType::AgentResult),
            "ledger_record" => Ok(EntityType::LedgerRecord),
            _ => Err(()),
        }
    }
}
