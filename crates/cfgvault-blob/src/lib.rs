//! Blob storage for cfgvault.
//!
//! A blob is an opaque byte sequence plus a [`Metadata`] field bag, addressed
//! by a dot-separated key such as `network.current` or
//! `network.backups.20170501010000000`. The store never interprets blob
//! contents; the history log and store manager sit on top of it.
//!
//! # Storage Backends
//!
//! All backends implement the [`BlobStore`] trait:
//!
//! - [`InMemoryBlobStore`] -- `HashMap`-based store for tests and embedding
//! - [`FileBlobStore`] -- one directory per key prefix, content next to a
//!   `.meta.json` sidecar
//!
//! # Design Rules
//!
//! 1. `save` overwrites; the caller decides which keys are immutable.
//! 2. `save` fills in `size` and `fileUrl` and returns the stored metadata.
//! 3. Metadata fields the store does not know are preserved.
//! 4. A missing key is [`BlobError::NotFound`], never an empty blob.
//! 5. All I/O errors are propagated with the key and operation attached.

pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

pub use cfgvault_types::Metadata;
pub use error::{BlobError, BlobResult};
pub use file::FileBlobStore;
pub use memory::InMemoryBlobStore;
pub use traits::{BlobStore, StoredBlob};
