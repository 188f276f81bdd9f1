use async_trait::async_trait;
use civic_core_api::CoreResult;

use crate::models::identifiable::Identifiable;

/// Generic repository trait for listing all entities of a family
///
/// This trait provides a standard interface for reading every entity of a
/// family from the persistence port. List reads bypass the entity cache,
/// which is keyed by single-entity identity.
///
/// # Type Parameters
/// * `T` - The entity type that must implement Identifiable trait
///
/// # Example
/// ```ignore
/// impl GetAll<Agent> for AgentRepository {
///     async fn get_all(&self) -> CoreResult<Vec<Agent>> {
///         // Implementation
///     }
/// }
/// ```
#[async_trait]
pub trait GetAll<T: Identifiable>: Send + Sync {
    /// List every entity of the family
    ///
    /// # Returns
    /// * `Ok(Vec<T>)` - All entities, ordered by id
    /// * `Err` - A `CoreError::Persistence` if the store is unreachable
    async fn get_all(&self) -> CoreResult<Vec<T>>;
}
