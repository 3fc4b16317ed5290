//! Client store.
//!
//! Static registration data: one row per client, keyed by the client id.
//! No expiry, no garbage collection, no secondary indexes. The `secret`
//! and `domain` columns are denormalized copies of fields inside the
//! opaque `data` payload.

use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx_core::query::query;
use sqlx_core::query_scalar::query_scalar;
use tokio_util::sync::CancellationToken;

use authkeep::record::ClientRecord;
use authkeep::store::ClientStore;
use authkeep::{Client, StoreResult, codec};

use crate::schema::{TableName, ensure_client_table};
use crate::{PgPool, cancellable};

/// Default client table name.
const DEFAULT_TABLE: &str = "oauth2_clients";

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`PgClientStore`].
pub struct PgClientStoreBuilder<C = Client> {
    pool: PgPool,
    table: String,
    schema_disabled: bool,
    _record: PhantomData<fn() -> C>,
}

impl<C> PgClientStoreBuilder<C> {
    fn new(pool: PgPool) -> Self {
        Self {
            pool,
            table: DEFAULT_TABLE.to_owned(),
            schema_disabled: false,
            _record: PhantomData,
        }
    }

    /// Override the client table name (default `oauth2_clients`).
    #[must_use]
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Do not create the table at construction.
    #[must_use]
    pub fn disable_schema(mut self) -> Self {
        self.schema_disabled = true;
        self
    }

    /// Validate configuration and ensure the schema.
    ///
    /// # Errors
    ///
    /// Returns [`authkeep::StoreError::InvalidInput`] for a malformed table name and
    /// [`authkeep::StoreError::Schema`] if table creation fails.
    pub async fn build(self) -> StoreResult<PgClientStore<C>> {
        let table = TableName::new(self.table)?;

        if !self.schema_disabled {
            ensure_client_table(&self.pool, &table).await?;
        }

        Ok(PgClientStore {
            pool: self.pool,
            table,
            _record: PhantomData,
        })
    }
}

// =============================================================================
// Client Store
// =============================================================================

/// PostgreSQL client store.
#[derive(Debug)]
pub struct PgClientStore<C = Client> {
    pool: PgPool,
    table: TableName,
    _record: PhantomData<fn() -> C>,
}

impl<C> PgClientStore<C> {
    /// Start building a store over `pool`.
    #[must_use]
    pub fn builder(pool: PgPool) -> PgClientStoreBuilder<C> {
        PgClientStoreBuilder::new(pool)
    }

    /// The validated client table name.
    #[must_use]
    pub fn table(&self) -> &TableName {
        &self.table
    }
}

impl<C> PgClientStore<C>
where
    C: ClientRecord + Serialize + DeserializeOwned + Sync,
{
    /// Persist a new client registration.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the insert fails (including a
    /// duplicate client id), or the operation is canceled.
    pub async fn create(&self, cancel: &CancellationToken, record: &C) -> StoreResult<()> {
        let payload = codec::encode(record)?;

        let sql = format!(
            "INSERT INTO {} (id, secret, domain, data) VALUES ($1, $2, $3, $4)",
            self.table
        );
        cancellable(
            cancel,
            query(&sql)
                .bind(record.id())
                .bind(record.secret())
                .bind(record.domain())
                .bind(&payload)
                .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    /// Look up a client by id.
    ///
    /// # Errors
    ///
    /// Returns an error on backend failure, payload corruption, or
    /// cancellation. A miss or empty id is `Ok(None)`.
    pub async fn get_by_id(&self, cancel: &CancellationToken, id: &str) -> StoreResult<Option<C>> {
        if id.is_empty() {
            return Ok(None);
        }

        let sql = format!("SELECT data FROM {} WHERE id = $1", self.table);
        let payload: Option<serde_json::Value> =
            cancellable(cancel, query_scalar(&sql).bind(id).fetch_optional(&self.pool)).await?;

        match payload {
            Some(payload) => codec::decode(payload).map(Some),
            None => Ok(None),
        }
    }
}

#[async_trait::async_trait]
impl<C> ClientStore for PgClientStore<C>
where
    C: ClientRecord + Serialize + DeserializeOwned + Send + Sync,
{
    type Record = C;

    async fn create(&self, cancel: &CancellationToken, record: &C) -> StoreResult<()> {
        PgClientStore::create(self, cancel, record).await
    }

    async fn get_by_id(&self, cancel: &CancellationToken, id: &str) -> StoreResult<Option<C>> {
        PgClientStore::get_by_id(self, cancel, id).await
    }
}

// =============================================================================
// Tests
// =============================================================================
