use cfgvault_blob::BlobError;
use cfgvault_history::HistoryError;
use cfgvault_types::TypeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("version not found: {0}")]
    VersionNotFound(String),

    #[error("content of version {id} not found at {key}")]
    ContentNotFound { id: String, key: String },

    #[error("storage error during {op} of {key}: {source}")]
    Storage {
        op: &'static str,
        key: String,
        #[source]
        source: BlobError,
    },

    #[error("version {id} was recorded but the history log could not be persisted: {source}")]
    HistoryPersist {
        id: String,
        #[source]
        source: BlobError,
    },

    #[error("history error: {0}")]
    History(#[from] HistoryError),

    #[error("manager state lock poisoned")]
    LockPoisoned,
}

impl ManagerError {
    pub(crate) fn storage<'a>(
        op: &'static str,
        key: &'a str,
    ) -> impl FnOnce(BlobError) -> Self + 'a {
        move |source| Self::Storage {
            op,
            key: key.to_string(),
            source,
        }
    }
}

impl From<TypeError> for ManagerError {
    fn from(err: TypeError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

pub type ManagerResult<T> = Result<T, ManagerError>;
