use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use cfgvault_types::{fields, validate_key, Metadata};
use tracing::trace;

use crate::error::{BlobError, BlobResult};
use crate::traits::{BlobStore, StoredBlob};

/// Scheme of the locators handed out by [`InMemoryBlobStore`].
pub const MEMORY_URL_SCHEME: &str = "mem://";

/// In-memory, HashMap-based blob store.
///
/// Intended for tests and embedding. All blobs are held in memory behind a
/// `RwLock` for safe concurrent access. Blobs are cloned on read/write.
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<String, StoredBlob>>,
}

impl InMemoryBlobStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
        }
    }

    /// Number of blobs currently stored.
    pub fn len(&self) -> usize {
        self.blobs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total content bytes across all stored blobs.
    pub fn total_bytes(&self) -> u64 {
        self.blobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(StoredBlob::size)
            .sum()
    }

    /// Remove a blob. Returns `true` if it existed.
    pub fn remove(&self, key: &str) -> bool {
        self.blobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .is_some()
    }

    /// Return a sorted list of all keys in the store.
    pub fn keys(&self) -> Vec<String> {
        let map = self.blobs.read().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<String> = map.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobStore for InMemoryBlobStore {
    fn save(&self, key: &str, value: &[u8], mut meta: Metadata) -> BlobResult<Metadata> {
        validate_key(key)?;
        let extension = meta.get_str(fields::FILE_EXTENSION).unwrap_or_default();
        let url = format!("{MEMORY_URL_SCHEME}{key}{extension}");
        meta.insert(fields::FILE_URL, url);
        meta.insert(fields::SIZE, value.len() as u64);

        let mut map = self.blobs.write().unwrap_or_else(PoisonError::into_inner);
        map.insert(key.to_string(), StoredBlob::new(value.to_vec(), meta.clone()));
        trace!(key, size = value.len(), "memory blob saved");
        Ok(meta)
    }

    fn load(&self, key: &str) -> BlobResult<StoredBlob> {
        validate_key(key)?;
        let map = self.blobs.read().unwrap_or_else(PoisonError::into_inner);
        map.get(key)
            .cloned()
            .ok_or_else(|| BlobError::NotFound(key.to_string()))
    }

    fn exists(&self, key: &str) -> BlobResult<bool> {
        validate_key(key)?;
        let map = self.blobs.read().unwrap_or_else(PoisonError::into_inner);
        Ok(map.contains_key(key))
    }
}

impl std::fmt::Debug for InMemoryBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBlobStore")
            .field("blob_count", &self.len())
            .finish()
    }
}
