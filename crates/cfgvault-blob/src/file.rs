//! Filesystem blob store.
//!
//! Layout under the root directory, for key `network.backups.42` and
//! `fileExtension` `.json`:
//!
//! ```text
//! <root>/network/backups/42.json        content
//! <root>/network/backups/42.meta.json   metadata (JSON object)
//! ```
//!
//! `fileUrl` is recorded relative to the root (`network/backups/42.json`) so
//! a store directory can be moved as a whole. Both files are written through
//! a temporary file in the same directory and renamed into place.

use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use cfgvault_types::{fields, validate_key, Metadata};
use tracing::debug;

use crate::error::{BlobError, BlobResult};
use crate::traits::{BlobStore, StoredBlob};

const META_SUFFIX: &str = ".meta.json";

/// Blob store backed by a directory tree.
#[derive(Clone, Debug)]
pub struct FileBlobStore {
    root: PathBuf,
}

impl FileBlobStore {
    /// Open (or create) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> BlobResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|e| BlobError::io("open", &root.display().to_string(), e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of `key` relative to the root, without any extension.
    fn relative_path(key: &str) -> BlobResult<PathBuf> {
        validate_key(key)?;
        Ok(key.split('.').collect())
    }

    fn meta_path(&self, relative: &Path) -> PathBuf {
        let mut name = self.root.join(relative).into_os_string();
        name.push(META_SUFFIX);
        PathBuf::from(name)
    }

    /// Resolve a stored `fileUrl` against the root, refusing anything that
    /// would escape it.
    fn resolve_url(&self, key: &str, url: &str) -> BlobResult<PathBuf> {
        let relative = Path::new(url);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if url.is_empty() || escapes {
            return Err(BlobError::CorruptMetadata {
                key: key.to_string(),
                reason: format!("fileUrl {url:?} is not a path inside the store"),
            });
        }
        Ok(self.root.join(relative))
    }
}

impl BlobStore for FileBlobStore {
    fn save(&self, key: &str, value: &[u8], mut meta: Metadata) -> BlobResult<Metadata> {
        let relative = Self::relative_path(key)?;
        let extension = meta
            .get_str(fields::FILE_EXTENSION)
            .unwrap_or_default()
            .to_string();
        validate_extension(key, &extension)?;

        let mut url = relative.to_string_lossy().replace('\\', "/");
        url.push_str(&extension);
        let content_path = self.root.join(&url);

        if let Some(parent) = content_path.parent() {
            fs::create_dir_all(parent).map_err(|e| BlobError::io("save", key, e))?;
        }
        write_atomic(&content_path, value).map_err(|e| BlobError::io("save", key, e))?;

        meta.insert(fields::FILE_URL, url);
        meta.insert(fields::SIZE, value.len() as u64);

        let encoded = meta
            .to_json_vec()
            .map_err(|e| BlobError::Serialization(e.to_string()))?;
        write_atomic(&self.meta_path(&relative), &encoded)
            .map_err(|e| BlobError::io("save", key, e))?;

        debug!(key, size = value.len(), path = %content_path.display(), "blob saved");
        Ok(meta)
    }

    fn load(&self, key: &str) -> BlobResult<StoredBlob> {
        let relative = Self::relative_path(key)?;
        let raw = read_existing(&self.meta_path(&relative), key)?;
        let meta = Metadata::from_json_slice(&raw).map_err(|e| BlobError::CorruptMetadata {
            key: key.to_string(),
            reason: e.to_string(),
        })?;

        let url = meta
            .get_str(fields::FILE_URL)
            .ok_or_else(|| BlobError::CorruptMetadata {
                key: key.to_string(),
                reason: "missing fileUrl".into(),
            })?;
        let data = read_existing(&self.resolve_url(key, url)?, key)?;

        Ok(StoredBlob::new(data, meta))
    }

    fn exists(&self, key: &str) -> BlobResult<bool> {
        let relative = Self::relative_path(key)?;
        Ok(self.meta_path(&relative).is_file())
    }
}

fn validate_extension(key: &str, extension: &str) -> BlobResult<()> {
    if extension.is_empty() {
        return Ok(());
    }
    let valid = extension
        .strip_prefix('.')
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric()));
    if valid {
        Ok(())
    } else {
        Err(BlobError::InvalidKey {
            key: key.to_string(),
            reason: format!("invalid fileExtension {extension:?}"),
        })
    }
}

fn read_existing(path: &Path, key: &str) -> BlobResult<Vec<u8>> {
    fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => BlobError::NotFound(key.to_string()),
        _ => BlobError::io("load", key, e),
    })
}

fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
