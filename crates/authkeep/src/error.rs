//! Error types shared by all store backends.

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during token or client store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A record could not be serialized for storage.
    #[error("failed to encode record: {0}")]
    Encoding(#[source] serde_json::Error),

    /// A stored payload could not be deserialized.
    ///
    /// This should not happen for data the store wrote itself; seeing it
    /// means the row was corrupted or written by an incompatible record
    /// type. It is surfaced rather than swallowed.
    #[error("failed to decode stored payload: {0}")]
    Decoding(#[source] serde_json::Error),

    /// The backing store failed to execute an operation.
    #[error("storage backend error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Table or index creation failed.
    #[error("schema setup failed: {0}")]
    Schema(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The operation was aborted by the caller's cancellation token.
    #[error("operation canceled")]
    Canceled,

    /// Invalid construction-time input (e.g. a malformed table name).
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl StoreError {
    // -------------------------------------------------------------------------
    // Constructor Methods
    // -------------------------------------------------------------------------

    /// Wrap a backend failure in a `Storage` error.
    pub fn storage(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Storage(Box::new(source))
    }

    /// Wrap a table/index creation failure in a `Schema` error.
    pub fn schema(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Schema(Box::new(source))
    }

    /// Create an `InvalidInput` error.
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    // -------------------------------------------------------------------------
    // Predicate Methods
    // -------------------------------------------------------------------------

    /// Returns `true` if this is an encoding or decoding error.
    #[must_use]
    pub fn is_codec_error(&self) -> bool {
        matches!(self, Self::Encoding(_) | Self::Decoding(_))
    }

    /// Returns `true` if this is a backend failure.
    #[must_use]
    pub fn is_storage_error(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Returns `true` if this is a schema setup failure.
    #[must_use]
    pub fn is_schema_error(&self) -> bool {
        matches!(self, Self::Schema(_))
    }

    /// Returns `true` if the operation was canceled by the caller.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canceled_predicate() {
        let err = StoreError::Canceled;
        assert!(err.is_canceled());
        assert!(!err.is_storage_error());
        assert_eq!(err.to_string(), "operation canceled");
    }

    #[test]
    fn test_storage_wraps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err = StoreError::storage(io);
        assert!(err.is_storage_error());
        assert!(err.to_string().starts_with("storage backend error"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_decoding_is_codec_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err = StoreError::Decoding(json_err);
        assert!(err.is_codec_error());
        assert!(!err.is_canceled());
    }

    #[test]
    fn test_invalid_input_message() {
        let err = StoreError::invalid_input("bad table name");
        assert_eq!(err.to_string(), "invalid input: bad table name");
    }
}
