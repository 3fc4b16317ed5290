//! PostgreSQL storage backend for authkeep.
//!
//! Provides durable storage for OAuth2 protocol state:
//!
//! - Issued tokens (authorization codes, access tokens, refresh tokens),
//!   with lookup by any of the three keys and a background sweep that
//!   reclaims expired rows.
//! - Client registrations (simple keyed lookup/insert).
//!
//! Token payloads are stored as opaque JSONB; the denormalized key columns
//! exist only to support indexed lookup. Tables and indexes are created
//! idempotently at store construction unless disabled.
//!
//! Every operation is one round-trip through the shared, externally owned
//! connection pool. The stores add no synchronization of their own: read
//! visibility and correctness under concurrent create/delete/sweep come
//! from the database's per-statement guarantees and isolation level.
//!
//! # Example
//!
//! ```ignore
//! use authkeep::{Token, TokenStore};
//! use authkeep_postgres::PgTokenStore;
//! use tokio_util::sync::CancellationToken;
//!
//! let store: PgTokenStore = PgTokenStore::builder(pool)
//!     .table("oauth2_tokens")
//!     .gc_interval(std::time::Duration::from_secs(300))
//!     .build()
//!     .await?;
//!
//! let cancel = CancellationToken::new();
//! store.create(&cancel, &token).await?;
//! let found = store.get_by_access(&cancel, "tok-1").await?;
//!
//! store.close().await;
//! ```

pub mod client;
mod gc;
pub mod schema;
pub mod token;

use std::future::Future;

use sqlx_core::pool::Pool;
use sqlx_postgres::Postgres;
use tokio_util::sync::CancellationToken;

use authkeep::{StoreError, StoreResult};

/// PostgreSQL connection pool type alias.
pub type PgPool = Pool<Postgres>;

pub use client::{PgClientStore, PgClientStoreBuilder};
pub use schema::TableName;
pub use token::{PgTokenStore, PgTokenStoreBuilder};

/// Run a database operation, aborting early if the caller's token fires.
///
/// The check is biased toward cancellation so a pre-canceled token never
/// reaches the pool.
pub(crate) async fn cancellable<T, F>(cancel: &CancellationToken, op: F) -> StoreResult<T>
where
    F: Future<Output = Result<T, sqlx_core::Error>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(StoreError::Canceled),
        result = op => result.map_err(StoreError::storage),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// A pool that parses but never connects; offline tests only.
    pub(crate) fn lazy_pool() -> PgPool {
        sqlx_core::pool::PoolOptions::<Postgres>::new()
            .connect_lazy("postgres://localhost/authkeep_test")
            .unwrap()
    }

    #[tokio::test]
    async fn test_cancellable_prefers_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = cancellable(&cancel, async { Ok(42_u64) }).await.unwrap_err();
        assert!(err.is_canceled());
    }

    #[tokio::test]
    async fn test_cancellable_passes_through_result() {
        let cancel = CancellationToken::new();
        let value = cancellable(&cancel, async { Ok(42_u64) }).await.unwrap();
        assert_eq!(value, 42);
    }
}
