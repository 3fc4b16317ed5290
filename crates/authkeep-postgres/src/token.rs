//! Token store.
//!
//! One row per issued grant: either an authorization code or an
//! access-token grant (optionally paired with its refresh token). Rows are
//! write-once and delete-only; the `code`/`access`/`refresh` columns are
//! denormalized copies of fields inside the opaque `data` payload, kept
//! solely for indexed lookup.
//!
//! Uniqueness across token values is the token generator's problem, not
//! the store's: duplicate keys are allowed, and lookups deterministically
//! return the oldest matching row (lowest surrogate id).

use std::marker::PhantomData;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx_core::query::query;
use sqlx_core::query_scalar::query_scalar;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use authkeep::record::TokenRecord;
use authkeep::store::TokenStore;
use authkeep::{StoreResult, Token, codec};

use crate::gc::{self, GcHandle};
use crate::schema::{TableName, ensure_token_table};
use crate::{PgPool, cancellable};

// =============================================================================
// Constants
// =============================================================================

/// Default token table name.
const DEFAULT_TABLE: &str = "oauth2_tokens";

/// Default sweep interval for the garbage collector.
const DEFAULT_GC_INTERVAL: Duration = Duration::from_secs(600);

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`PgTokenStore`].
pub struct PgTokenStoreBuilder<T = Token> {
    pool: PgPool,
    table: String,
    gc_interval: Duration,
    gc_disabled: bool,
    schema_disabled: bool,
    _record: PhantomData<fn() -> T>,
}

impl<T> PgTokenStoreBuilder<T> {
    fn new(pool: PgPool) -> Self {
        Self {
            pool,
            table: DEFAULT_TABLE.to_owned(),
            gc_interval: DEFAULT_GC_INTERVAL,
            gc_disabled: false,
            schema_disabled: false,
            _record: PhantomData,
        }
    }

    /// Override the token table name (default `oauth2_tokens`).
    #[must_use]
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Override the sweep interval (default 10 minutes).
    #[must_use]
    pub fn gc_interval(mut self, every: Duration) -> Self {
        self.gc_interval = every;
        self
    }

    /// Do not run the background garbage collector.
    #[must_use]
    pub fn disable_gc(mut self) -> Self {
        self.gc_disabled = true;
        self
    }

    /// Do not create the table and indexes at construction.
    #[must_use]
    pub fn disable_schema(mut self) -> Self {
        self.schema_disabled = true;
        self
    }

    /// Validate configuration, ensure the schema, and start the collector.
    ///
    /// # Errors
    ///
    /// Returns [`authkeep::StoreError::InvalidInput`] for a malformed table name and
    /// [`authkeep::StoreError::Schema`] if table or index creation fails.
    pub async fn build(self) -> StoreResult<PgTokenStore<T>> {
        let table = TableName::new(self.table)?;

        if !self.schema_disabled {
            ensure_token_table(&self.pool, &table).await?;
        }

        let gc = if self.gc_disabled {
            GcHandle::disabled()
        } else {
            let pool = self.pool.clone();
            let sweep_table = table.clone();
            gc::spawn(self.gc_interval, move || {
                let pool = pool.clone();
                let table = sweep_table.clone();
                async move { sweep_expired(&pool, &table).await }
            })
        };

        Ok(PgTokenStore {
            pool: self.pool,
            table,
            gc,
            _record: PhantomData,
        })
    }
}

// =============================================================================
// Token Store
// =============================================================================

/// PostgreSQL token store.
///
/// Generic over the record type; any `T` satisfying [`TokenRecord`] plus
/// the serde bounds can be persisted. Defaults to [`Token`].
#[derive(Debug)]
pub struct PgTokenStore<T = Token> {
    pool: PgPool,
    table: TableName,
    gc: GcHandle,
    _record: PhantomData<fn() -> T>,
}

impl<T> PgTokenStore<T> {
    /// Start building a store over `pool`.
    #[must_use]
    pub fn builder(pool: PgPool) -> PgTokenStoreBuilder<T> {
        PgTokenStoreBuilder::new(pool)
    }

    /// The validated token table name.
    #[must_use]
    pub fn table(&self) -> &TableName {
        &self.table
    }

    /// Stop the garbage collector and wait for it to exit.
    ///
    /// Idempotent. Once `close` returns, no further sweep executes.
    /// Foreground operations remain usable; only the collector stops.
    pub async fn close(&self) {
        self.gc.shutdown().await;
    }
}

impl<T> PgTokenStore<T>
where
    T: TokenRecord + Serialize + DeserializeOwned + Sync,
{
    /// Persist a new token record.
    ///
    /// The row's expiry is derived from the record's timing fields, never
    /// caller-supplied; see [`codec::expires_at`].
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the insert fails, or the operation
    /// is canceled.
    pub async fn create(&self, cancel: &CancellationToken, record: &T) -> StoreResult<()> {
        let payload = codec::encode(record)?;
        let expires_at = codec::expires_at(record);
        let created_at = OffsetDateTime::now_utc();

        let sql = format!(
            "INSERT INTO {} (created_at, expires_at, code, access, refresh, data) \
             VALUES ($1, $2, $3, $4, $5, $6)",
            self.table
        );
        cancellable(
            cancel,
            query(&sql)
                .bind(created_at)
                .bind(expires_at)
                .bind(record.code())
                .bind(record.access())
                .bind(record.refresh())
                .bind(&payload)
                .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    /// Look up a record by authorization code.
    ///
    /// # Errors
    ///
    /// Returns an error on backend failure, payload corruption, or
    /// cancellation. A miss or empty key is `Ok(None)`.
    pub async fn get_by_code(
        &self,
        cancel: &CancellationToken,
        code: &str,
    ) -> StoreResult<Option<T>> {
        self.get_by(cancel, "code", code).await
    }

    /// Look up a record by access token.
    pub async fn get_by_access(
        &self,
        cancel: &CancellationToken,
        access: &str,
    ) -> StoreResult<Option<T>> {
        self.get_by(cancel, "access", access).await
    }

    /// Look up a record by refresh token.
    pub async fn get_by_refresh(
        &self,
        cancel: &CancellationToken,
        refresh: &str,
    ) -> StoreResult<Option<T>> {
        self.get_by(cancel, "refresh", refresh).await
    }

    /// Delete all rows carrying this authorization code.
    ///
    /// Deleting zero rows is success (idempotent revocation).
    pub async fn remove_by_code(&self, cancel: &CancellationToken, code: &str) -> StoreResult<()> {
        self.remove_by(cancel, "code", code).await
    }

    /// Delete all rows carrying this access token.
    pub async fn remove_by_access(
        &self,
        cancel: &CancellationToken,
        access: &str,
    ) -> StoreResult<()> {
        self.remove_by(cancel, "access", access).await
    }

    /// Delete all rows carrying this refresh token.
    pub async fn remove_by_refresh(
        &self,
        cancel: &CancellationToken,
        refresh: &str,
    ) -> StoreResult<()> {
        self.remove_by(cancel, "refresh", refresh).await
    }

    // `column` is always one of the fixed key columns above, never caller
    // input; only `key` reaches the statement as a bind.

    async fn get_by(
        &self,
        cancel: &CancellationToken,
        column: &'static str,
        key: &str,
    ) -> StoreResult<Option<T>> {
        if key.is_empty() {
            return Ok(None);
        }

        let sql = format!(
            "SELECT data FROM {} WHERE {column} = $1 ORDER BY id ASC LIMIT 1",
            self.table
        );
        let payload: Option<serde_json::Value> =
            cancellable(cancel, query_scalar(&sql).bind(key).fetch_optional(&self.pool)).await?;

        match payload {
            Some(payload) => codec::decode(payload).map(Some),
            None => Ok(None),
        }
    }

    async fn remove_by(
        &self,
        cancel: &CancellationToken,
        column: &'static str,
        key: &str,
    ) -> StoreResult<()> {
        // An absent credential is stored as an empty string on rows of the
        // other grant type, so an empty key must never reach the delete.
        if key.is_empty() {
            return Ok(());
        }

        let sql = format!("DELETE FROM {} WHERE {column} = $1", self.table);
        let result = cancellable(cancel, query(&sql).bind(key).execute(&self.pool)).await?;

        if result.rows_affected() > 0 {
            debug!(column, count = result.rows_affected(), "removed token rows");
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl<T> TokenStore for PgTokenStore<T>
where
    T: TokenRecord + Serialize + DeserializeOwned + Send + Sync,
{
    type Record = T;

    async fn create(&self, cancel: &CancellationToken, record: &T) -> StoreResult<()> {
        PgTokenStore::create(self, cancel, record).await
    }

    async fn get_by_code(&self, cancel: &CancellationToken, code: &str) -> StoreResult<Option<T>> {
        PgTokenStore::get_by_code(self, cancel, code).await
    }

    async fn get_by_access(
        &self,
        cancel: &CancellationToken,
        access: &str,
    ) -> StoreResult<Option<T>> {
        PgTokenStore::get_by_access(self, cancel, access).await
    }

    async fn get_by_refresh(
        &self,
        cancel: &CancellationToken,
        refresh: &str,
    ) -> StoreResult<Option<T>> {
        PgTokenStore::get_by_refresh(self, cancel, refresh).await
    }

    async fn remove_by_code(&self, cancel: &CancellationToken, code: &str) -> StoreResult<()> {
        PgTokenStore::remove_by_code(self, cancel, code).await
    }

    async fn remove_by_access(&self, cancel: &CancellationToken, access: &str) -> StoreResult<()> {
        PgTokenStore::remove_by_access(self, cancel, access).await
    }

    async fn remove_by_refresh(&self, cancel: &CancellationToken, refresh: &str) -> StoreResult<()> {
        PgTokenStore::remove_by_refresh(self, cancel, refresh).await
    }
}

// =============================================================================
// Garbage Collection
// =============================================================================

/// One sweep: delete every row whose expiry has passed.
///
/// A single atomic statement; correctness under concurrent foreground
/// writes relies on the database's per-statement guarantees.
async fn sweep_expired(pool: &PgPool, table: &TableName) -> Result<u64, sqlx_core::Error> {
    let sql = format!("DELETE FROM {table} WHERE expires_at <= NOW()");
    let result = query(&sql).execute(pool).await?;
    Ok(result.rows_affected())
}

// =============================================================================
// Tests
// =============================================================================
