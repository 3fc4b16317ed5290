//! Record capability traits.
//!
//! The stores never depend on a concrete token or client type. They only
//! require the getter set below, so any caller-owned type can be persisted
//! as long as it exposes its keys and timing metadata (and is serde-capable
//! at the store seam).

use time::{Duration, OffsetDateTime};

/// Capability set for an issued-token record.
///
/// A record represents either an authorization code or an access-token
/// grant (optionally paired with its refresh token). Absent credentials
/// are represented by empty strings, mirroring their wire form.
pub trait TokenRecord {
    /// Authorization code value, empty if this is not a code grant.
    fn code(&self) -> &str;
    /// When the authorization code was issued.
    fn code_created_at(&self) -> OffsetDateTime;
    /// How long the authorization code stays valid.
    fn code_lifetime(&self) -> Duration;

    /// Access token value, empty if absent.
    fn access(&self) -> &str;
    /// When the access token was issued.
    fn access_created_at(&self) -> OffsetDateTime;
    /// How long the access token stays valid.
    fn access_lifetime(&self) -> Duration;

    /// Refresh token value, empty if absent.
    fn refresh(&self) -> &str;
    /// When the refresh token was issued.
    fn refresh_created_at(&self) -> OffsetDateTime;
    /// How long the refresh token stays valid.
    fn refresh_lifetime(&self) -> Duration;
}

/// Capability set for a registered OAuth2 client.
pub trait ClientRecord {
    /// Client identifier (primary key).
    fn id(&self) -> &str;
    /// Client secret.
    fn secret(&self) -> &str;
    /// Registered redirect domain.
    fn domain(&self) -> &str;
}
