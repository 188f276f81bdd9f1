use async_trait::async_trait;
use civic_core_api::CoreResult;

use crate::models::identifiable::Identifiable;

/// Generic repository trait for partially updating one entity
///
/// Validation (state-machine transitions, text encoding) happens before
/// any persistence attempt. Concurrent updates to the same id are not
/// serialized by this layer; the store resolves them last-write-wins.
///
/// # Type Parameters
/// * `T` - The entity type that must implement Identifiable trait
/// * `P` - The partial-update DTO; `None` fields are left untouched
///
/// # Example
/// ```ignore
/// impl Update<Agent, AgentPatch> for AgentRepository {
///     async fn update(&self, id: i64, patch: AgentPatch, actor_id: Option<i64>) -> CoreResult<Option<Agent>> {
///         // Implementation
///     }
/// }
/// ```
#[async_trait]
pub trait Update<T: Identifiable, P>: Send + Sync {
    /// Apply a partial update to an entity
    ///
    /// # Arguments
    /// * `id` - The id of the entity to update
    /// * `patch` - The partial update
    /// * `actor_id` - The optional id of the actor recorded on the audit entry
    ///
    /// # Returns
    /// * `Ok(Some(T))` - The updated entity
    /// * `Ok(None)` - No entity with this id exists
    /// * `Err` - A `CoreError::Validation` for an illegal transition or
    ///   malformed input, a `CoreError::Persistence` if the write failed
    async fn update(&self, id: i64, patch: P, actor_id: Option<i64>) -> CoreResult<Option<T>>;
}
