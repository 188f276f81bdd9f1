use async_trait::async_trait;
use civic_core_api::CoreResult;

use crate::models::request::{CitizenRequest, CitizenRequestPatch, NewCitizenRequest};

/// Narrow persistence port for citizen requests.
///
/// Owns no business logic; the contract is "read what was last
/// successfully written". Implemented by the Postgres adapter in
/// `civic-core-postgres` and by `crate::memory::MemoryRequestStore`.
#[async_trait]
pub trait RequestStore: Send + Sync {
    async fn get_all(&self) -> CoreResult<Vec<CitizenRequest>>;

    async fn get_by_id(&self, id: i64) -> CoreResult<Option<CitizenRequest>>;

    /// Insert a new request with a generated id; either the record exists
    /// afterward or the call fails with no partial record.
    async fn insert(&self, new: NewCitizenRequest) -> CoreResult<CitizenRequest>;

    /// Apply a partial update; returns the updated row, `None` if absent.
    async fn update(&self, id: i64, patch: CitizenRequestPatch) -> CoreResult<Option<CitizenRequest>>;

    /// Record an AI processing outcome on the row.
    async fn mark_ai_processed(
        &self,
        id: i64,
        classification: &str,
    ) -> CoreResult<Option<CitizenRequest>>;

    /// Write the denormalized ledger transaction hash.
    async fn set_blockchain_hash(&self, id: i64, hash: &str) -> CoreResult<()>;

    /// Returns `true` if a row was removed.
    async fn delete(&self, id: i64) -> CoreResult<bool>;
}
