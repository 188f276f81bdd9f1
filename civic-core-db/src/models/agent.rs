use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::identifiable::Identifiable;

/// An AI agent registered with the platform.
///
/// Free-text fields (`description`, `system_prompt`) pass encoding
/// validation at the repository boundary before persistence; see
/// `crate::utils::text`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: i64,
    pub name: String,
    pub agent_type: String,
    pub description: Option<String>,
    pub model_id: String,
    pub is_active: bool,
    pub system_prompt: Option<String>,
    pub config: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identifiable for Agent {
    fn get_id(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAgent {
    pub name: String,
    pub agent_type: String,
    pub description: Option<String>,
    pub model_id: String,
    pub system_prompt: Option<String>,
    pub config: serde_json::Value,
}

/// Partial update for an agent; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub model_id: Option<String>,
    pub is_active: Option<bool>,
    pub system_prompt: Option<Option<String>>,
    pub config: Option<serde_json::Value>,
}
