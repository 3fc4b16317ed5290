//! In-memory store backend.
//!
//! Implements the store contracts over process-local tables. Useful for
//! tests and for embedding without a database; it exercises the same codec
//! and key discipline as the durable backends, including sequential
//! surrogate ids so duplicate-key lookups tie-break oldest-first.
//!
//! There is no background collector here: call [`MemoryTokenStore::sweep_expired`]
//! explicitly when expiry behavior matters.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

use crate::codec;
use crate::error::{StoreError, StoreResult};
use crate::models::{Client, Token};
use crate::record::{ClientRecord, TokenRecord};
use crate::store::{ClientStore, TokenStore};

// =============================================================================
// Token Store
// =============================================================================

struct TokenRow {
    id: u64,
    expires_at: OffsetDateTime,
    code: String,
    access: String,
    refresh: String,
    payload: serde_json::Value,
}

struct TokenTable {
    next_id: u64,
    rows: Vec<TokenRow>,
}

/// In-memory token store.
pub struct MemoryTokenStore<T = Token> {
    table: RwLock<TokenTable>,
    _record: PhantomData<fn() -> T>,
}

impl<T> MemoryTokenStore<T>
where
    T: TokenRecord + Serialize + DeserializeOwned,
{
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: RwLock::new(TokenTable {
                next_id: 1,
                rows: Vec::new(),
            }),
            _record: PhantomData,
        }
    }

    /// Number of live rows, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().rows.len()
    }

    /// Returns `true` if the store holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delete every row whose expiry is at or before `now`.
    ///
    /// Returns the number of rows removed. This is the in-memory
    /// equivalent of one garbage-collector sweep.
    pub fn sweep_expired(&self, now: OffsetDateTime) -> usize {
        let mut table = self.write();
        let before = table.rows.len();
        table.rows.retain(|row| row.expires_at > now);
        before - table.rows.len()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, TokenTable> {
        self.table.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, TokenTable> {
        self.table.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn get_by<F>(&self, cancel: &CancellationToken, key: &str, matches: F) -> StoreResult<Option<T>>
    where
        F: Fn(&TokenRow) -> bool,
    {
        if cancel.is_cancelled() {
            return Err(StoreError::Canceled);
        }
        if key.is_empty() {
            return Ok(None);
        }

        let table = self.read();
        // Duplicates tie-break oldest-first: lowest surrogate id wins.
        let found = table
            .rows
            .iter()
            .filter(|row| matches(row))
            .min_by_key(|row| row.id);
        match found {
            Some(row) => codec::decode(row.payload.clone()).map(Some),
            None => Ok(None),
        }
    }

    fn remove_by<F>(&self, cancel: &CancellationToken, key: &str, matches: F) -> StoreResult<()>
    where
        F: Fn(&TokenRow) -> bool,
    {
        if cancel.is_cancelled() {
            return Err(StoreError::Canceled);
        }
        if key.is_empty() {
            return Ok(());
        }

        // Removing zero rows is success.
        self.write().rows.retain(|row| !matches(row));
        Ok(())
    }
}

impl<T> Default for MemoryTokenStore<T>
where
    T: TokenRecord + Serialize + DeserializeOwned,
{
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> TokenStore for MemoryTokenStore<T>
where
    T: TokenRecord + Serialize + DeserializeOwned + Send + Sync,
{
    type Record = T;

    async fn create(&self, cancel: &CancellationToken, record: &T) -> StoreResult<()> {
        if cancel.is_cancelled() {
            return Err(StoreError::Canceled);
        }

        let payload = codec::encode(record)?;
        let expires_at = codec::expires_at(record);

        let mut table = self.write();
        let id = table.next_id;
        table.next_id += 1;
        table.rows.push(TokenRow {
            id,
            expires_at,
            code: record.code().to_owned(),
            access: record.access().to_owned(),
            refresh: record.refresh().to_owned(),
            payload,
        });
        Ok(())
    }

    async fn get_by_code(&self, cancel: &CancellationToken, code: &str) -> StoreResult<Option<T>> {
        self.get_by(cancel, code, |row| row.code == code)
    }

    async fn get_by_access(
        &self,
        cancel: &CancellationToken,
        access: &str,
    ) -> StoreResult<Option<T>> {
        self.get_by(cancel, access, |row| row.access == access)
    }

    async fn get_by_refresh(
        &self,
        cancel: &CancellationToken,
        refresh: &str,
    ) -> StoreResult<Option<T>> {
        self.get_by(cancel, refresh, |row| row.refresh == refresh)
    }

    async fn remove_by_code(&self, cancel: &CancellationToken, code: &str) -> StoreResult<()> {
        self.remove_by(cancel, code, |row| row.code == code)
    }

    async fn remove_by_access(&self, cancel: &CancellationToken, access: &str) -> StoreResult<()> {
        self.remove_by(cancel, access, |row| row.access == access)
    }

    async fn remove_by_refresh(&self, cancel: &CancellationToken, refresh: &str) -> StoreResult<()> {
        self.remove_by(cancel, refresh, |row| row.refresh == refresh)
    }
}

// =============================================================================
// Client Store
// =============================================================================

/// In-memory client store.
pub struct MemoryClientStore<C = Client> {
    clients: RwLock<HashMap<String, serde_json::Value>>,
    _record: PhantomData<fn() -> C>,
}

impl<C> MemoryClientStore<C>
where
    C: ClientRecord + Serialize + DeserializeOwned,
{
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            _record: PhantomData,
        }
    }
}

impl<C> Default for MemoryClientStore<C>
where
    C: ClientRecord + Serialize + DeserializeOwned,
{
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<C> ClientStore for MemoryClientStore<C>
where
    C: ClientRecord + Serialize + DeserializeOwned + Send + Sync,
{
    type Record = C;

    async fn create(&self, cancel: &CancellationToken, record: &C) -> StoreResult<()> {
        if cancel.is_cancelled() {
            return Err(StoreError::Canceled);
        }

        let payload = codec::encode(record)?;
        let mut clients = self
            .clients
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if clients.contains_key(record.id()) {
            return Err(StoreError::Storage(
                format!("client {:?} already registered", record.id()).into(),
            ));
        }
        clients.insert(record.id().to_owned(), payload);
        Ok(())
    }

    async fn get_by_id(&self, cancel: &CancellationToken, id: &str) -> StoreResult<Option<C>> {
        if cancel.is_cancelled() {
            return Err(StoreError::Canceled);
        }
        if id.is_empty() {
            return Ok(None);
        }

        let clients = self.clients.read().unwrap_or_else(PoisonError::into_inner);
        match clients.get(id) {
            Some(payload) => codec::decode(payload.clone()).map(Some),
            None => Ok(None),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use time::Duration;
    use time::macros::datetime;

    use super::*;

    fn access_token(access: &str, user: &str) -> Token {
        let mut token = Token::new();
        token.client_id = "client-1".into();
        token.user_id = user.into();
        token.access = access.into();
        token.access_created_at = datetime!(2024-05-01 10:00 UTC);
        token.access_lifetime = Duration::hours(1);
        token
    }

    #[tokio::test]
    async fn test_empty_keys_are_absent_without_lookup() {
        let store: MemoryTokenStore = MemoryTokenStore::new();
        let cancel = CancellationToken::new();

        assert!(store.get_by_code(&cancel, "").await.unwrap().is_none());
        assert!(store.get_by_access(&cancel, "").await.unwrap().is_none());
        assert!(store.get_by_refresh(&cancel, "").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_get_remove_by_access() {
        let store: MemoryTokenStore = MemoryTokenStore::new();
        let cancel = CancellationToken::new();
        let token = access_token("tok-A", "user-1");

        store.create(&cancel, &token).await.unwrap();

        let found = store.get_by_access(&cancel, "tok-A").await.unwrap();
        assert_eq!(found, Some(token));

        store.remove_by_access(&cancel, "tok-A").await.unwrap();
        assert!(store.get_by_access(&cancel, "tok-A").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lookup_by_code_and_refresh() {
        let store: MemoryTokenStore = MemoryTokenStore::new();
        let cancel = CancellationToken::new();

        let mut code_grant = Token::new();
        code_grant.code = "authz-1".into();
        code_grant.code_created_at = datetime!(2024-05-01 10:00 UTC);
        code_grant.code_lifetime = Duration::minutes(5);
        store.create(&cancel, &code_grant).await.unwrap();

        let mut refresh_grant = access_token("tok-B", "user-2");
        refresh_grant.refresh = "ref-B".into();
        refresh_grant.refresh_created_at = datetime!(2024-05-01 10:00 UTC);
        refresh_grant.refresh_lifetime = Duration::days(7);
        store.create(&cancel, &refresh_grant).await.unwrap();

        let by_code = store.get_by_code(&cancel, "authz-1").await.unwrap();
        assert_eq!(by_code, Some(code_grant));

        let by_refresh = store.get_by_refresh(&cancel, "ref-B").await.unwrap();
        assert_eq!(by_refresh, Some(refresh_grant));
    }

    #[tokio::test]
    async fn test_remove_missing_key_is_ok() {
        let store: MemoryTokenStore = MemoryTokenStore::new();
        let cancel = CancellationToken::new();

        store.remove_by_code(&cancel, "never-issued").await.unwrap();
        store.remove_by_refresh(&cancel, "never-issued").await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_access_returns_oldest_row() {
        let store: MemoryTokenStore = MemoryTokenStore::new();
        let cancel = CancellationToken::new();

        store
            .create(&cancel, &access_token("dup", "first-user"))
            .await
            .unwrap();
        store
            .create(&cancel, &access_token("dup", "second-user"))
            .await
            .unwrap();

        let found = store.get_by_access(&cancel, "dup").await.unwrap().unwrap();
        assert_eq!(found.user_id, "first-user");
    }

    #[tokio::test]
    async fn test_sweep_removes_expired_rows_only() {
        let store: MemoryTokenStore = MemoryTokenStore::new();
        let cancel = CancellationToken::new();

        let mut short = access_token("tok-short", "user-1");
        short.access_lifetime = Duration::seconds(1);
        store.create(&cancel, &short).await.unwrap();

        let long = access_token("tok-long", "user-1");
        store.create(&cancel, &long).await.unwrap();

        // Two seconds past the short token's creation.
        let removed = store.sweep_expired(datetime!(2024-05-01 10:00:02 UTC));
        assert_eq!(removed, 1);

        assert!(store.get_by_access(&cancel, "tok-short").await.unwrap().is_none());
        assert!(store.get_by_access(&cancel, "tok-long").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_canceled_token_aborts_operations() {
        let store: MemoryTokenStore = MemoryTokenStore::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = store.get_by_access(&cancel, "tok").await.unwrap_err();
        assert!(err.is_canceled());

        let err = store
            .create(&cancel, &access_token("tok", "user-1"))
            .await
            .unwrap_err();
        assert!(err.is_canceled());
    }

    #[tokio::test]
    async fn test_client_store_round_trip() {
        let store: MemoryClientStore = MemoryClientStore::new();
        let cancel = CancellationToken::new();
        let client = Client {
            id: "app-1".into(),
            secret: "s3cret".into(),
            domain: "https://app.example".into(),
            public: false,
            user_id: String::new(),
        };

        store.create(&cancel, &client).await.unwrap();

        assert_eq!(
            store.get_by_id(&cancel, "app-1").await.unwrap(),
            Some(client.clone())
        );
        assert!(store.get_by_id(&cancel, "").await.unwrap().is_none());
        assert!(store.get_by_id(&cancel, "missing").await.unwrap().is_none());

        let err = store.create(&cancel, &client).await.unwrap_err();
        assert!(err.is_storage_error());
    }
}
