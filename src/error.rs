//! Error types for the key layer and the in-memory client.

use std::fmt;

/// Result type for key-layer and client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for query-key-kit.
///
/// Building groups, resolving keys and injecting fields never fail. Errors come
/// from normalizing malformed mutation results, from looking up operations that do
/// not exist, and from the query client itself.
#[derive(Debug, Clone)]
pub enum Error {
    /// Serialization failed when converting a value to JSON.
    SerializationError(String),

    /// Deserialization failed when decoding JSON into a typed value.
    DeserializationError(String),

    /// A mutation result could not be normalized into the cache.
    ///
    /// Raised when:
    /// - the result carries no `id` field
    /// - the `id` cannot be decoded into the group's identifier type
    ///
    /// Nothing is written to the cache when this is returned.
    ValidationError(String),

    /// The named operation is not part of the group.
    UnknownOperation(String),

    /// An in-flight fetch was aborted by `cancel` or by an invalidation.
    ///
    /// Carries the rendered key of the aborted slot.
    Cancelled(String),

    /// The fetcher passed to the client reported a failure.
    FetchError(String),

    /// A query client implementation failed.
    ///
    /// The key layer never produces this itself; custom clients use it to
    /// surface their own failures through `invalidate`/`cancel`/`set_entry`.
    BackendError(String),

    /// Generic error with custom message.
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            Error::DeserializationError(msg) => write!(f, "Deserialization error: {}", msg),
            Error::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            Error::UnknownOperation(name) => write!(f, "Unknown operation: {}", name),
            Error::Cancelled(key) => write!(f, "Fetch cancelled for {}", key),
            Error::FetchError(msg) => write!(f, "Fetch error: {}", msg),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ============================================================================
// Conversions from other error types
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        if e.is_syntax() || e.is_data() || e.is_eof() {
            Error::DeserializationError(e.to_string())
        } else {
            Error::SerializationError(e.to_string())
        }
    }
}

impl From<String> for Error {
    fn from(e: String) -> Self {
        Error::Other(e)
    }
}

impl From<&str> for Error {
    fn from(e: &str) -> Self {
        Error::Other(e.to_string())
    }
}
