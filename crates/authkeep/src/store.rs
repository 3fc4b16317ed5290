//! Store contracts.
//!
//! These traits define the persistence interface consumed by the OAuth2
//! framework. Implementations live in backend crates (`authkeep-postgres`)
//! and in [`crate::memory`] for tests and embedding.
//!
//! Every operation takes a caller-supplied [`CancellationToken`]; a fired
//! token aborts the in-flight operation with [`crate::StoreError::Canceled`].
//! Deadlines compose on top via `tokio::time::timeout`. Callers that never
//! cancel can pass a fresh `CancellationToken::new()`.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::StoreResult;
use crate::record::{ClientRecord, TokenRecord};

/// Durable storage for issued tokens.
///
/// Rows are write-once: a record is created exactly once, looked up by any
/// of its three keys, and destroyed either explicitly (revocation or
/// rotation) or by expiry sweeps. There is no update path.
///
/// Lookups return `Ok(None)` both for an empty input key (no backend
/// round-trip) and for a miss; neither is an error. Removals are
/// idempotent: deleting zero rows is success.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// The record type this store persists.
    type Record: TokenRecord + Send + Sync;

    /// Persist a new token record.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the backend write fails, or the
    /// operation is canceled.
    async fn create(&self, cancel: &CancellationToken, record: &Self::Record) -> StoreResult<()>;

    /// Look up a record by authorization code.
    async fn get_by_code(
        &self,
        cancel: &CancellationToken,
        code: &str,
    ) -> StoreResult<Option<Self::Record>>;

    /// Look up a record by access token.
    async fn get_by_access(
        &self,
        cancel: &CancellationToken,
        access: &str,
    ) -> StoreResult<Option<Self::Record>>;

    /// Look up a record by refresh token.
    async fn get_by_refresh(
        &self,
        cancel: &CancellationToken,
        refresh: &str,
    ) -> StoreResult<Option<Self::Record>>;

    /// Delete all records carrying this authorization code.
    async fn remove_by_code(&self, cancel: &CancellationToken, code: &str) -> StoreResult<()>;

    /// Delete all records carrying this access token.
    async fn remove_by_access(&self, cancel: &CancellationToken, access: &str) -> StoreResult<()>;

    /// Delete all records carrying this refresh token.
    async fn remove_by_refresh(&self, cancel: &CancellationToken, refresh: &str) -> StoreResult<()>;
}

/// Durable storage for client registrations.
#[async_trait]
pub trait ClientStore: Send + Sync {
    /// The record type this store persists.
    type Record: ClientRecord + Send + Sync;

    /// Persist a new client registration.
    async fn create(&self, cancel: &CancellationToken, record: &Self::Record) -> StoreResult<()>;

    /// Look up a client by id. Empty id or a miss yields `Ok(None)`.
    async fn get_by_id(
        &self,
        cancel: &CancellationToken,
        id: &str,
    ) -> StoreResult<Option<Self::Record>>;
}
