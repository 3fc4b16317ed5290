//! Record codec and expiry derivation.
//!
//! Records cross the store boundary as opaque JSON payloads: the stores
//! persist whatever `encode` produces and hand it back through `decode`
//! without ever looking inside. The only record fields the stores read are
//! the lookup keys and the timing metadata, via the [`TokenRecord`] trait.

use serde::Serialize;
use serde::de::DeserializeOwned;
use time::OffsetDateTime;

use crate::error::{StoreError, StoreResult};
use crate::record::TokenRecord;

/// Serialize a record into its stored payload.
///
/// # Errors
///
/// Returns [`StoreError::Encoding`] if the record cannot be serialized.
pub fn encode<T: Serialize>(record: &T) -> StoreResult<serde_json::Value> {
    serde_json::to_value(record).map_err(StoreError::Encoding)
}

/// Deserialize a stored payload back into a record.
///
/// # Errors
///
/// Returns [`StoreError::Decoding`] on a malformed payload. Stored rows are
/// written by `encode`, so this indicates corruption or a record-type
/// mismatch.
pub fn decode<T: DeserializeOwned>(payload: serde_json::Value) -> StoreResult<T> {
    serde_json::from_value(payload).map_err(StoreError::Decoding)
}

/// Derive the row expiry for a token record.
///
/// A code grant expires when the code does. An access-token grant expires
/// when the access token does, unless a refresh token is present: the row
/// stays relevant until refresh expiry even after the access token lapses,
/// so refresh governs the overall lifetime.
pub fn expires_at<T: TokenRecord + ?Sized>(record: &T) -> OffsetDateTime {
    if !record.code().is_empty() {
        return record.code_created_at() + record.code_lifetime();
    }

    let mut expiry = record.access_created_at() + record.access_lifetime();
    if !record.refresh().is_empty() {
        expiry = record.refresh_created_at() + record.refresh_lifetime();
    }
    expiry
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use time::Duration;
    use time::macros::datetime;

    use super::*;
    use crate::models::Token;

    fn base_token() -> Token {
        let mut token = Token::new();
        token.client_id = "client-1".into();
        token.user_id = "user-1".into();
        token.scope = "read write".into();
        token
    }

    #[test]
    fn test_round_trip_preserves_keys_and_timing() {
        let mut token = base_token();
        token.access = "acc-1".into();
        token.access_created_at = datetime!(2024-05-01 12:00 UTC);
        token.access_lifetime = Duration::hours(2);
        token.refresh = "ref-1".into();
        token.refresh_created_at = datetime!(2024-05-01 12:00 UTC);
        token.refresh_lifetime = Duration::days(30);

        let decoded: Token = decode(encode(&token).unwrap()).unwrap();
        assert_eq!(decoded, token);
    }

    #[test]
    fn test_code_governs_expiry_even_with_access_fields() {
        let mut token = base_token();
        token.code = "authz-code".into();
        token.code_created_at = datetime!(2024-05-01 10:00 UTC);
        token.code_lifetime = Duration::minutes(5);
        // Access fields present but irrelevant while a code exists.
        token.access = "acc-1".into();
        token.access_created_at = datetime!(2024-05-01 10:00 UTC);
        token.access_lifetime = Duration::hours(1);

        assert_eq!(expires_at(&token), datetime!(2024-05-01 10:05 UTC));
    }

    #[test]
    fn test_access_governs_expiry_without_refresh() {
        let mut token = base_token();
        token.access = "acc-1".into();
        token.access_created_at = datetime!(2024-05-01 10:00 UTC);
        token.access_lifetime = Duration::hours(1);

        assert_eq!(expires_at(&token), datetime!(2024-05-01 11:00 UTC));
    }

    #[test]
    fn test_refresh_overrides_access_expiry() {
        let mut token = base_token();
        token.access = "acc-1".into();
        token.access_created_at = datetime!(2024-05-01 10:00 UTC);
        token.access_lifetime = Duration::hours(1);
        token.refresh = "ref-1".into();
        token.refresh_created_at = datetime!(2024-05-01 10:00 UTC);
        token.refresh_lifetime = Duration::days(14);

        assert_eq!(expires_at(&token), datetime!(2024-05-15 10:00 UTC));
    }

    #[test]
    fn test_decode_rejects_foreign_payload() {
        let err = decode::<Token>(serde_json::json!({"garbage": true})).unwrap_err();
        assert!(err.is_codec_error());
    }
}
