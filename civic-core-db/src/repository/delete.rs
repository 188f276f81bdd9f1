use async_trait::async_trait;
use civic_core_api::CoreResult;

/// Generic repository trait for deleting one entity
///
/// Families with referential guards (agents, citizen requests) first
/// query for inbound references; if any exist the delete returns
/// `Ok(false)` and logs the skip instead of throwing. This prevents
/// dangling references without cascading deletes.
///
/// # Example
/// ```ignore
/// impl Delete for AgentRepository {
///     async fn delete(&self, id: i64, actor_id: Option<i64>) -> CoreResult<bool> {
///         // Implementation
///     }
/// }
/// ```
#[async_trait]
pub trait Delete: Send + Sync {
    /// Delete an entity by id
    ///
    /// # Arguments
    /// * `id` - The id of the entity to delete
    /// * `actor_id` - The optional id of the actor recorded on the audit entry
    ///
    /// # Returns
    /// * `Ok(true)` - The entity was removed
    /// * `Ok(false)` - Nothing existed, or inbound references blocked the delete
    /// * `Err` - A `CoreError::Persistence` if the store is unreachable
    async fn delete(&self, id: i64, actor_id: Option<i64>) -> CoreResult<bool>;
}
