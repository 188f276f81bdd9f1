use async_trait::async_trait;
use civic_core_api::CoreResult;

use crate::models::identifiable::Identifiable;

/// Generic repository trait for creating one entity
///
/// The create is atomic with respect to the primary store: either the
/// record exists with a generated id afterward, or the call fails with a
/// `CoreError::Persistence` and no partial record exists. After a
/// successful write the repository dispatches the audit append (and, for
/// anchorable families, the ledger submission) through the side-effect
/// queue and synchronously invalidates the cache key.
///
/// # Type Parameters
/// * `T` - The entity type that must implement Identifiable trait
/// * `D` - The intake DTO for the entity family
///
/// # Example
/// ```ignore
/// impl Create<CitizenRequest, NewCitizenRequest> for CitizenRequestRepository {
///     async fn create(&self, dto: NewCitizenRequest, actor_id: Option<i64>) -> CoreResult<CitizenRequest> {
///         // Implementation
///     }
/// }
/// ```
#[async_trait]
pub trait Create<T: Identifiable, D>: Send + Sync {
    /// Create a new entity
    ///
    /// # Arguments
    /// * `dto` - The intake payload
    /// * `actor_id` - The optional id of the actor recorded on the audit entry
    ///
    /// # Returns
    /// * `Ok(T)` - The created entity with generated fields populated
    /// * `Err` - A `CoreError::Validation` before any persistence attempt,
    ///   or a `CoreError::Persistence` if the write failed
    async fn create(&self, dto: D, actor_id: Option<i64>) -> CoreResult<T>;
}
