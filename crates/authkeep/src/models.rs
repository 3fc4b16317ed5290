//! Default record models.
//!
//! Ready-made implementations of [`TokenRecord`] and [`ClientRecord`] for
//! callers that do not bring their own record types. The stores accept any
//! type satisfying the traits; these are merely the batteries included.

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::record::{ClientRecord, TokenRecord};

// =============================================================================
// Token
// =============================================================================

/// Default issued-token record.
///
/// Carries the grant context (client, user, redirect, scope) plus the three
/// credential triples. Empty strings mean the credential is absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub client_id: String,
    pub user_id: String,
    pub redirect_uri: String,
    pub scope: String,

    pub code: String,
    pub code_created_at: OffsetDateTime,
    pub code_lifetime: Duration,

    pub access: String,
    pub access_created_at: OffsetDateTime,
    pub access_lifetime: Duration,

    pub refresh: String,
    pub refresh_created_at: OffsetDateTime,
    pub refresh_lifetime: Duration,
}

impl Token {
    /// Create an empty token record with epoch timestamps and zero
    /// lifetimes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client_id: String::new(),
            user_id: String::new(),
            redirect_uri: String::new(),
            scope: String::new(),
            code: String::new(),
            code_created_at: OffsetDateTime::UNIX_EPOCH,
            code_lifetime: Duration::ZERO,
            access: String::new(),
            access_created_at: OffsetDateTime::UNIX_EPOCH,
            access_lifetime: Duration::ZERO,
            refresh: String::new(),
            refresh_created_at: OffsetDateTime::UNIX_EPOCH,
            refresh_lifetime: Duration::ZERO,
        }
    }
}

impl Default for Token {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenRecord for Token {
    fn code(&self) -> &str {
        &self.code
    }

    fn code_created_at(&self) -> OffsetDateTime {
        self.code_created_at
    }

    fn code_lifetime(&self) -> Duration {
        self.code_lifetime
    }

    fn access(&self) -> &str {
        &self.access
    }

    fn access_created_at(&self) -> OffsetDateTime {
        self.access_created_at
    }

    fn access_lifetime(&self) -> Duration {
        self.access_lifetime
    }

    fn refresh(&self) -> &str {
        &self.refresh
    }

    fn refresh_created_at(&self) -> OffsetDateTime {
        self.refresh_created_at
    }

    fn refresh_lifetime(&self) -> Duration {
        self.refresh_lifetime
    }
}

// =============================================================================
// Client
// =============================================================================

/// Default client registration record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub secret: String,
    pub domain: String,
    /// Public clients authenticate without a secret (RFC 6749 §2.1).
    pub public: bool,
    pub user_id: String,
}

impl ClientRecord for Client {
    fn id(&self) -> &str {
        &self.id
    }

    fn secret(&self) -> &str {
        &self.secret
    }

    fn domain(&self) -> &str {
        &self.domain
    }
}

// =============================================================================
// Tests
// =============================================================================
