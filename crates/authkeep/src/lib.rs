//! Durable storage contracts for OAuth2 protocol state.
//!
//! This crate defines the persistence interface an OAuth2 authorization
//! server consumes:
//!
//! - [`TokenRecord`] / [`ClientRecord`] — the capability sets a record type
//!   must expose; the stores depend on these getters, never on a concrete
//!   type.
//! - [`Token`] / [`Client`] — default record models for callers without
//!   their own types.
//! - [`codec`] — opaque JSON payload encoding plus the expiry-derivation
//!   policy shared by every backend.
//! - [`TokenStore`] / [`ClientStore`] — the async store contracts.
//! - [`memory`] — an in-process reference backend for tests and embedding.
//!
//! The PostgreSQL backend lives in the `authkeep-postgres` crate.
//!
//! # Example
//!
//! ```
//! use authkeep::{MemoryTokenStore, Token, TokenStore};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn demo() -> authkeep::StoreResult<()> {
//! let store: MemoryTokenStore = MemoryTokenStore::new();
//! let cancel = CancellationToken::new();
//!
//! let mut token = Token::new();
//! token.access = "tok-1".into();
//! token.access_created_at = time::OffsetDateTime::now_utc();
//! token.access_lifetime = time::Duration::hours(1);
//!
//! store.create(&cancel, &token).await?;
//! let found = store.get_by_access(&cancel, "tok-1").await?;
//! assert!(found.is_some());
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod error;
pub mod memory;
pub mod models;
pub mod record;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use memory::{MemoryClientStore, MemoryTokenStore};
pub use models::{Client, Token};
pub use record::{ClientRecord, TokenRecord};
pub use store::{ClientStore, TokenStore};
