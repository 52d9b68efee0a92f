use cfgvault_types::TypeError;

/// Errors from blob store operations.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    /// The key does not follow the dot-separated segment layout.
    #[error("invalid key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    /// Nothing is stored under the key.
    #[error("blob not found: {0}")]
    NotFound(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error during {op} of {key}: {source}")]
    Io {
        op: &'static str,
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Stored metadata exists but cannot be decoded.
    #[error("corrupt metadata for {key}: {reason}")]
    CorruptMetadata { key: String, reason: String },

    /// Serialization failure while encoding metadata.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl BlobError {
    /// Returns `true` for [`BlobError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub(crate) fn io(op: &'static str, key: &str, source: std::io::Error) -> Self {
        Self::Io {
            op,
            key: key.to_string(),
            source,
        }
    }
}

impl From<TypeError> for BlobError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidKey { key, reason } => Self::InvalidKey { key, reason },
            other => Self::InvalidKey {
                key: String::new(),
                reason: other.to_string(),
            },
        }
    }
}

/// Result alias for blob store operations.
pub type BlobResult<T> = Result<T, BlobError>;
