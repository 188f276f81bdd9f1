use async_trait::async_trait;
use civic_core_api::CoreResult;

use crate::models::identifiable::Identifiable;

/// Generic repository trait for loading one entity by its id
///
/// This trait provides a standard interface for point reads through the
/// read-through cache: a hit is served from the cache, a miss reads the
/// persistence port and repopulates the cache before returning.
///
/// # Type Parameters
/// * `T` - The entity type that must implement Identifiable trait
///
/// # Example
/// ```ignore
/// impl GetById<CitizenRequest> for CitizenRequestRepository {
///     async fn get_by_id(&self, id: i64) -> CoreResult<Option<CitizenRequest>> {
///         // Implementation
///     }
/// }
/// ```
#[async_trait]
pub trait GetById<T: Identifiable>: Send + Sync {
    /// Load a single entity by its unique identifier
    ///
    /// # Arguments
    /// * `id` - The id of the entity to load
    ///
    /// # Returns
    /// * `Ok(Some(T))` - The entity, from cache or store
    /// * `Ok(None)` - No entity with this id exists
    /// * `Err` - A `CoreError::Persistence` if the store is unreachable
    async fn get_by_id(&self, id: i64) -> CoreResult<Option<T>>;
}
