/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A data-plane call was made before `connect()` or after `close()`.
    #[error("store {name} is not connected")]
    NotConnected { name: String },

    /// A backend option is missing, mistyped, or otherwise unusable.
    #[error("invalid option `{option}` for store {name}: {reason}")]
    InvalidOption {
        name: String,
        option: String,
        reason: String,
    },

    /// A key too long for the backend to store.
    #[error("key of {len} bytes is too long for store {name} (max {max})")]
    KeyTooLong { name: String, len: usize, max: usize },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure reported by an externally registered backend.
    #[error("backend error: {0}")]
    Backend(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
