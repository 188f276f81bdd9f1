use chrono::{DateTime, Utc};
use civic_core_api::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::models::identifiable::Identifiable;

/// Finite status of a citizen request.
///
/// Transition graph:
/// `new → in_progress → waiting ⇄ in_progress → completed`;
/// `rejected` is reachable from any non-terminal state.
/// `completed` and `rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    New,
    InProgress,
    Waiting,
    Completed,
    Rejected,
}

impl RequestStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Rejected)
    }

    /// Whether the state machine allows moving from `self` to `to`.
    ///
    /// A no-op transition to the current status is always allowed; there
    /// are no reopen semantics, so terminal states admit nothing else.
    pub fn can_transition(&self, to: RequestStatus) -> bool {
        if *self == to {
            return true;
        }
        if self.is_terminal() {
            return false;
        }
        if to == RequestStatus::Rejected {
            return true;
        }
        matches!(
            (self, to),
            (RequestStatus::New, RequestStatus::InProgress)
                | (RequestStatus::InProgress, RequestStatus::Waiting)
                | (RequestStatus::InProgress, RequestStatus::Completed)
                | (RequestStatus::Waiting, RequestStatus::InProgress)
        )
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RequestStatus::New => "new",
            RequestStatus::InProgress => "in_progress",
            RequestStatus::Waiting => "waiting",
            RequestStatus::Completed => "completed",
            RequestStatus::Rejected => "rejected",
        };
        write!(f, "{s}")
    }
}

impl FromStr for RequestStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(RequestStatus::New),
            "in_progress" => Ok(RequestStatus::InProgress),
            "waiting" => Ok(RequestStatus::Waiting),
            "completed" => Ok(RequestStatus::Completed),
            "rejected" => Ok(RequestStatus::Rejected),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl std::fmt::Display for RequestPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RequestPriority::Low => "low",
            RequestPriority::Medium => "medium",
            RequestPriority::High => "high",
            RequestPriority::Urgent => "urgent",
        };
        write!(f, "{s}")
    }
}

impl FromStr for RequestPriority {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(RequestPriority::Low),
            "medium" => Ok(RequestPriority::Medium),
            "high" => Ok(RequestPriority::High),
            "urgent" => Ok(RequestPriority::Urgent),
            _ => Err(()),
        }
    }
}

/// A citizen-submitted request, the primary anchorable entity.
///
/// `blockchain_hash` is the denormalized transaction hash of the most
/// recent successful ledger anchoring; absent until the first anchor
/// confirmation round-trips through the side-effect worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitizenRequest {
    pub id: i64,
    pub full_name: String,
    pub contact_info: String,
    pub request_type: String,
    pub subject: String,
    pub description: String,
    pub status: RequestStatus,
    pub priority: RequestPriority,
    pub assigned_to: Option<i64>,
    pub ai_processed: bool,
    pub ai_classification: Option<String>,
    pub response_text: Option<String>,
    pub blockchain_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identifiable for CitizenRequest {
    fn get_id(&self) -> i64 {
        self.id
    }
}

impl CitizenRequest {
    /// Validate a status change against the state machine.
    ///
    /// Returns the old status on success so callers can describe the
    /// transition in the audit trail.
    pub fn check_transition(&self, to: RequestStatus) -> CoreResult<RequestStatus> {
        if !self.status.can_transition(to) {
            return Err(CoreError::Validation(format!(
                "invalid status transition {} -> {}",
                self.status, to
            )));
        }
        Ok(self.status)
    }

    /// Content projection whose digest is anchored to the ledger.
    ///
    /// Excludes timestamps and the denormalized ledger hash so an
    /// unchanged logical state produces an unchanged digest, which is
    /// what the duplicate-anchor suppression compares.
    pub fn anchor_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "full_name": self.full_name,
            "contact_info": self.contact_info,
            "request_type": self.request_type,
            "subject": self.subject,
            "description": self.description,
            "status": self.status,
            "priority": self.priority,
            "assigned_to": self.assigned_to,
            "ai_processed": self.ai_processed,
            "ai_classification": self.ai_classification,
            "response_text": self.response_text,
        })
    }
}

/// Intake payload for a new citizen request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCitizenRequest {
    pub full_name: String,
    pub contact_info: String,
    pub request_type: String,
    pub subject: String,
    pub description: String,
    pub priority: RequestPriority,
}

/// Partial update for a citizen request; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CitizenRequestPatch {
    pub subject: Option<String>,
    pub description: Option<String>,
    pub status: Option<RequestStatus>,
    pub priority: Option<RequestPriority>,
    pub assigned_to: Option<Option<i64>>,
    pub response_text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_transitions_are_allowed() {
        assert!(RequestStatus::New.can_transition(RequestStatus::InProgress));
        assert!(RequestStatus::InProgress.can_transition(RequestStatus::Waiting));
        assert!(RequestStatus::Waiting.can_transition(RequestStatus::InProgress));
        assert!(RequestStatus::InProgress.can_transition(RequestStatus::Completed));
    }

    #[test]
    fn rejected_is_reachable_from_non_terminal_states() {
        assert!(RequestStatus::New.can_transition(RequestStatus::Rejected));
        assert!(RequestStatus::InProgress.can_transition(RequestStatus::Rejected));
        assert!(RequestStatus::Waiting.can_transition(RequestStatus::Rejected));
        assert!(!RequestStatus::Completed.can_transition(RequestStatus::Rejected));
    }

    #[test]
    fn terminal_states_admit_no_exit() {
        assert!(!RequestStatus::Completed.can_transition(RequestStatus::New));
        assert!(!RequestStatus::Completed.can_transition(RequestStatus::InProgress));
        assert!(!RequestStatus::Rejected.can_transition(RequestStatus::Waiting));
    }

    #[test]
    fn status_round_trips_through_str() {
        for s in [
            RequestStatus::New,
            RequestStatus::InProgress,
            RequestStatus::Waiting,
            RequestStatus::Completed,
            RequestStatus::Rejected,
        ] {
            assert_eq!(s.to_string().parse::<RequestStatus>(), Ok(s));
        }
    }
}
