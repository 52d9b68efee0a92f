use cfgvault_types::Metadata;

use crate::error::{BlobError, BlobResult};

/// A blob as returned by [`BlobStore::load`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredBlob {
    /// Raw content.
    pub data: Vec<u8>,
    /// Metadata as written by the last `save`, including `size` and `fileUrl`.
    pub meta: Metadata,
}

impl StoredBlob {
    pub fn new(data: Vec<u8>, meta: Metadata) -> Self {
        Self { data, meta }
    }

    /// Content length in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Durable key -> (bytes, metadata) storage.
///
/// All implementations must satisfy these invariants:
/// - Keys are validated with [`cfgvault_types::validate_key`]; malformed keys
///   fail with [`BlobError::InvalidKey`] before anything is written.
/// - `save` records `size` (content length) and `fileUrl` (a locator the
///   backend understands) in the metadata it stores and returns.
/// - Unknown metadata fields round-trip unchanged.
/// - Every call is a single synchronous unit; retries are the caller's
///   business.
pub trait BlobStore: Send + Sync {
    /// Store `value` under `key`, replacing any previous blob.
    ///
    /// Returns the metadata as stored.
    fn save(&self, key: &str, value: &[u8], meta: Metadata) -> BlobResult<Metadata>;

    /// Load the blob stored under `key`.
    ///
    /// Returns [`BlobError::NotFound`] if nothing is stored there.
    fn load(&self, key: &str) -> BlobResult<StoredBlob>;

    /// Check whether a blob is stored under `key`.
    ///
    /// Default implementation loads the blob. Backends may override with a
    /// cheaper lookup.
    fn exists(&self, key: &str) -> BlobResult<bool> {
        match self.load(key) {
            Ok(_) => Ok(true),
            Err(BlobError::NotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }
}
