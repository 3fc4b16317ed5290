//! Schema management.
//!
//! Tables and indexes are created idempotently with `IF NOT EXISTS`;
//! concurrent callers can still race inside PostgreSQL's catalog, so
//! "already exists" errors are tolerated as success.
//!
//! Statement text interpolates only a [`TableName`] validated at
//! construction. All values go through `$n` binds.

use std::fmt;

use sqlx_core::query::query;

use authkeep::{StoreError, StoreResult};

use crate::PgPool;

// =============================================================================
// Table Names
// =============================================================================

/// PostgreSQL identifier limit.
const MAX_IDENT_LEN: usize = 63;

/// A validated table identifier.
///
/// Chosen once at store construction and never influenced per-call, so it
/// is safe to splice into statement text.
#[derive(Debug, Clone)]
pub struct TableName(String);

impl TableName {
    /// Validate `name` as a plain PostgreSQL identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidInput`] unless the name is non-empty,
    /// at most 63 bytes, starts with a letter or underscore, and contains
    /// only letters, digits, and underscores.
    pub fn new(name: impl Into<String>) -> StoreResult<Self> {
        let name = name.into();

        let mut chars = name.chars();
        let valid_start = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

        if !valid_start || !valid_rest || name.len() > MAX_IDENT_LEN {
            return Err(StoreError::invalid_input(format!(
                "invalid table name {name:?}: expected [A-Za-z_][A-Za-z0-9_]* of at most {MAX_IDENT_LEN} bytes"
            )));
        }
        Ok(Self(name))
    }

    /// The validated identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Table Creation
// =============================================================================

/// Create the token table and its secondary indexes if absent.
///
/// Safe to call repeatedly and concurrently.
///
/// # Errors
///
/// Returns [`StoreError::Schema`] on creation failures other than
/// "already exists".
pub async fn ensure_token_table(pool: &PgPool, table: &TableName) -> StoreResult<()> {
    let create = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            id BIGSERIAL PRIMARY KEY,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            expires_at TIMESTAMPTZ NOT NULL,
            code TEXT NOT NULL DEFAULT '',
            access TEXT NOT NULL DEFAULT '',
            refresh TEXT NOT NULL DEFAULT '',
            data JSONB NOT NULL
        )
        "#
    );
    exec_tolerant(pool, &create).await?;

    for column in ["expires_at", "code", "access", "refresh"] {
        let index = format!("CREATE INDEX IF NOT EXISTS idx_{table}_{column} ON {table} ({column})");
        exec_tolerant(pool, &index).await?;
    }
    Ok(())
}

/// Create the client table if absent.
///
/// # Errors
///
/// Returns [`StoreError::Schema`] on creation failures other than
/// "already exists".
pub async fn ensure_client_table(pool: &PgPool, table: &TableName) -> StoreResult<()> {
    let create = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            id TEXT PRIMARY KEY,
            secret TEXT NOT NULL,
            domain TEXT NOT NULL,
            data JSONB NOT NULL
        )
        "#
    );
    exec_tolerant(pool, &create).await
}

async fn exec_tolerant(pool: &PgPool, sql: &str) -> StoreResult<()> {
    if let Err(e) = query(sql).execute(pool).await {
        if is_already_exists(&e) {
            return Ok(());
        }
        return Err(StoreError::schema(e));
    }
    Ok(())
}

/// `IF NOT EXISTS` does not fully serialize concurrent DDL; losing the
/// catalog race surfaces as duplicate_table / duplicate_object / a unique
/// violation on pg_class.
fn is_already_exists(err: &sqlx_core::Error) -> bool {
    if let sqlx_core::Error::Database(db_err) = err {
        return matches!(
            db_err.code().as_deref(),
            Some("42P07") | Some("42710") | Some("23505")
        );
    }
    false
}

// =============================================================================
// Tests
// =============================================================================
