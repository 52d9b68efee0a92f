use thiserror::Error;

/// Errors produced while validating or converting foundation types.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TypeError {
    /// A storage key does not follow the dot-separated segment layout.
    #[error("invalid key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    /// A timestamp string does not match its declared pattern.
    #[error("cannot parse timestamp {value:?} with pattern {pattern:?}: {reason}")]
    InvalidTimestamp {
        value: String,
        pattern: String,
        reason: String,
    },

    /// A timestamp pattern uses letters this crate cannot translate.
    #[error("unsupported timestamp pattern {pattern:?}: {reason}")]
    InvalidFormat { pattern: String, reason: String },

    /// A field required by the record layout is absent or not a string.
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

/// Convenience alias for foundation type operations.
pub type Result<T> = std::result::Result<T, TypeError>;
