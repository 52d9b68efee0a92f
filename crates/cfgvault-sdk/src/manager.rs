use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use cfgvault_blob::{BlobError, BlobStore, StoredBlob};
use cfgvault_history::{Consolidator, HistoryLog};
use cfgvault_types::{
    backup_key, current_key, fields, history_key, key::validate_segment, latest_version_id,
    validate_key, Metadata, TimestampFormat, VersionIdAllocator, VersionRecord,
};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::StoreConfig;
use crate::error::{ManagerError, ManagerResult};

/// Lifecycle of a [`StoreManager`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ManagerState {
    /// Persisted state has not been loaded yet.
    #[default]
    Uninitialized,
    /// History and current pointer reflect the blob store.
    Ready,
}

#[derive(Debug, Default)]
struct Inner {
    state: ManagerState,
    history: HistoryLog,
    current: Option<VersionRecord>,
    ids: VersionIdAllocator,
}

/// Versioned storage of one package's document.
///
/// Layout in the blob store, for package `network`:
///
/// ```text
/// network.current                  live document
/// network.backups.<id>             immutable copy of every save
/// network.versionHistory           history log (JSON array, newest first)
/// ```
///
/// Mutating operations hold the state write lock for their whole duration,
/// so saves and restores through one manager are serialized. Reads take the
/// read lock and never touch the blob store except to fetch content.
pub struct StoreManager {
    package: String,
    current_key: String,
    history_key: String,
    blobs: Arc<dyn BlobStore>,
    clock: Arc<dyn Clock>,
    config: StoreConfig,
    format: TimestampFormat,
    consolidator: Consolidator,
    inner: RwLock<Inner>,
}

impl StoreManager {
    /// Create a manager for `package`. Nothing is read until [`init`] or
    /// the first save.
    ///
    /// [`init`]: StoreManager::init
    pub fn new(
        package: impl Into<String>,
        blobs: Arc<dyn BlobStore>,
        clock: Arc<dyn Clock>,
        config: StoreConfig,
    ) -> ManagerResult<Self> {
        let package = package.into();
        validate_segment(&package, &package)?;
        let current_key = current_key(&package);
        let history_key = history_key(&package);
        validate_key(&current_key)?;

        let extension = config.file_extension.as_str();
        let extension_ok = extension.is_empty()
            || extension
                .strip_prefix('.')
                .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric()));
        if !extension_ok {
            return Err(ManagerError::InvalidArgument(format!(
                "invalid file extension {extension:?}"
            )));
        }

        let format = config.timestamp_format()?;
        let consolidator = Consolidator::new(config.retention_policy());

        Ok(Self {
            package,
            current_key,
            history_key,
            blobs,
            clock,
            config,
            format,
            consolidator,
            inner: RwLock::new(Inner::default()),
        })
    }

    /// Create a manager for the package named in `config`.
    pub fn from_config(
        blobs: Arc<dyn BlobStore>,
        clock: Arc<dyn Clock>,
        config: StoreConfig,
    ) -> ManagerResult<Self> {
        let package = config.package.clone();
        Self::new(package, blobs, clock, config)
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn current_key(&self) -> &str {
        &self.current_key
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn state(&self) -> ManagerResult<ManagerState> {
        Ok(self.read()?.state)
    }

    // ---- Lifecycle ----

    /// Load the current pointer and history log from the blob store.
    ///
    /// Either may be absent; a fresh package starts with no current version
    /// and an empty log. Calling `init` again reloads from the store.
    pub fn init(&self) -> ManagerResult<()> {
        let mut inner = self.write()?;
        self.load_into(&mut inner)
    }

    fn load_into(&self, inner: &mut Inner) -> ManagerResult<()> {
        let current = match self.blobs.load(&self.current_key) {
            Ok(blob) => Some(VersionRecord::from_metadata(blob.meta).map_err(|e| {
                ManagerError::Storage {
                    op: "init",
                    key: self.current_key.clone(),
                    source: BlobError::CorruptMetadata {
                        key: self.current_key.clone(),
                        reason: e.to_string(),
                    },
                }
            })?),
            Err(err) if err.is_not_found() => None,
            Err(err) => return Err(ManagerError::storage("init", &self.current_key)(err)),
        };

        let (history, skipped) = match self.blobs.load(&self.history_key) {
            Ok(blob) => HistoryLog::load_with_report(&blob.data)?,
            Err(err) if err.is_not_found() => (HistoryLog::new(), 0),
            Err(err) => return Err(ManagerError::storage("init", &self.history_key)(err)),
        };

        let ids = latest_version_id(history.iter().map(VersionRecord::id))
            .map(VersionIdAllocator::resume_after)
            .unwrap_or_default();

        info!(
            package = %self.package,
            versions = history.len(),
            skipped,
            current = current.as_ref().map(VersionRecord::id).unwrap_or("-"),
            "store manager initialized"
        );

        inner.current = current;
        inner.history = history;
        inner.ids = ids;
        inner.state = ManagerState::Ready;
        Ok(())
    }

    fn ensure_ready(&self, inner: &mut Inner) -> ManagerResult<()> {
        if inner.state == ManagerState::Uninitialized {
            self.load_into(inner)?;
        }
        Ok(())
    }

    // ---- Save / restore ----

    /// Save `content` as the current document and record a new version.
    pub fn save(&self, content: &[u8], description: Option<&str>) -> ManagerResult<VersionRecord> {
        self.save_with_meta(content, description, Metadata::new())
    }

    /// Like [`save`](StoreManager::save), with caller-defined fields stored
    /// alongside the record. Fields the manager sets itself take precedence
    /// over same-named entries in `extra`.
    ///
    /// If the content is stored but the history log cannot be written, the
    /// version is kept in memory and [`ManagerError::HistoryPersist`] is
    /// returned; the next successful save rewrites the whole log.
    pub fn save_with_meta(
        &self,
        content: &[u8],
        description: Option<&str>,
        extra: Metadata,
    ) -> ManagerResult<VersionRecord> {
        let mut inner = self.write()?;
        self.ensure_ready(&mut inner)?;

        let now = self.clock.now();
        let mut id = inner.ids.next_id(&now);
        // Logged ids own their backups; never write under one again.
        while inner.history.find(&id).is_some() {
            warn!(id = %id, "version id already logged, allocating another");
            id = inner.ids.next_id(&now);
        }
        let backup = backup_key(&self.current_key, &id)?;

        let mut meta = extra;
        meta.remove(fields::DESCRIPTIONS);
        meta.remove(fields::DESCRIPTION);
        let reserved = VersionRecord::new(id.as_str(), self.current_key.as_str(), &now, &self.format)?;
        meta.extend(reserved.into_metadata());
        meta.insert(fields::FILE_EXTENSION, self.config.file_extension.as_str());
        if let Some(description) = description.filter(|d| !d.is_empty()) {
            meta.insert(fields::DESCRIPTION, description);
        }

        let stored = self
            .blobs
            .save(&self.current_key, content, meta.clone())
            .map_err(ManagerError::storage("save", &self.current_key))?;
        inner.current = Some(VersionRecord::from_metadata(stored)?);
        inner.state = ManagerState::Ready;
        debug!(id = %id, key = %self.current_key, size = content.len(), "current document written");

        let backed_up = self
            .blobs
            .save(&backup, content, meta)
            .map_err(ManagerError::storage("backup", &backup))?;
        let record = VersionRecord::from_metadata(backed_up)?;
        debug!(id = %id, key = %backup, "backup written");

        inner.history.append(record.clone())?;
        self.persist_history(&inner.history, &id)?;
        Ok(record)
    }

    fn persist_history(&self, history: &HistoryLog, id: &str) -> ManagerResult<()> {
        let encoded = history.serialize()?;
        let meta = Metadata::new().with(fields::FILE_EXTENSION, ".json");
        self.blobs
            .save(&self.history_key, &encoded, meta)
            .map_err(|source| {
                warn!(id, key = %self.history_key, error = %source, "history log not persisted");
                ManagerError::HistoryPersist {
                    id: id.to_string(),
                    source,
                }
            })?;
        debug!(key = %self.history_key, versions = history.len(), "history log persisted");
        Ok(())
    }

    /// Make version `id` the current document again and return its content.
    ///
    /// Restoring does not add a history entry. On failure the current
    /// document is unchanged.
    pub fn restore(&self, id: &str) -> ManagerResult<Vec<u8>> {
        let mut inner = self.write()?;
        self.ensure_ready(&mut inner)?;

        let record = inner
            .history
            .find(id)
            .cloned()
            .ok_or_else(|| ManagerError::VersionNotFound(id.to_string()))?;
        let blob = self.load_backup(&record)?;

        let target = record.key();
        let stored = self
            .blobs
            .save(target, &blob.data, blob.meta)
            .map_err(ManagerError::storage("restore", target))?;
        if target == self.current_key {
            inner.current = Some(VersionRecord::from_metadata(stored)?);
        }

        debug!(id, key = %target, size = blob.data.len(), "version restored");
        Ok(blob.data)
    }

    /// Content of version `id`, without touching the current document.
    pub fn version_content(&self, id: &str) -> ManagerResult<Vec<u8>> {
        let inner = self.read()?;
        let record = inner
            .history
            .find(id)
            .ok_or_else(|| ManagerError::VersionNotFound(id.to_string()))?;
        Ok(self.load_backup(record)?.data)
    }

    fn load_backup(&self, record: &VersionRecord) -> ManagerResult<StoredBlob> {
        let key = backup_key(record.key(), record.id())?;
        match self.blobs.load(&key) {
            Ok(blob) => Ok(blob),
            Err(err) if err.is_not_found() => Err(ManagerError::ContentNotFound {
                id: record.id().to_string(),
                key,
            }),
            Err(err) => Err(ManagerError::storage("load", &key)(err)),
        }
    }

    // ---- Queries ----

    /// Consolidated versions of every key in the log.
    pub fn all_versions(&self) -> ManagerResult<BTreeMap<String, Vec<VersionRecord>>> {
        Ok(self.consolidator.all_versions(&self.read()?.history))
    }

    /// Distinct document keys with at least one logged save, sorted.
    pub fn keys(&self) -> ManagerResult<Vec<String>> {
        Ok(self.read()?.history.keys().into_iter().map(str::to_string).collect())
    }

    /// Consolidated versions of `key`, newest first.
    pub fn versions(&self, key: &str) -> ManagerResult<Vec<VersionRecord>> {
        Ok(self.consolidator.versions_for(&self.read()?.history, key))
    }

    /// Consolidated versions of this package's document.
    pub fn current_versions(&self) -> ManagerResult<Vec<VersionRecord>> {
        self.versions(&self.current_key)
    }

    pub fn current_version(&self) -> ManagerResult<Option<VersionRecord>> {
        Ok(self.read()?.current.clone())
    }

    pub fn current_version_id(&self) -> ManagerResult<Option<String>> {
        Ok(self.read()?.current.as_ref().map(|r| r.id().to_string()))
    }

    /// Content of the current document, `None` if nothing was saved yet.
    pub fn current_version_content(&self) -> ManagerResult<Option<Vec<u8>>> {
        let inner = self.read()?;
        let Some(current) = inner.current.as_ref() else {
            return Ok(None);
        };
        match self.blobs.load(&self.current_key) {
            Ok(blob) => Ok(Some(blob.data)),
            Err(err) if err.is_not_found() => Err(ManagerError::ContentNotFound {
                id: current.id().to_string(),
                key: self.current_key.clone(),
            }),
            Err(err) => Err(ManagerError::storage("load", &self.current_key)(err)),
        }
    }

    /// Every recorded save, newest first, without consolidation.
    pub fn history(&self) -> ManagerResult<Vec<VersionRecord>> {
        Ok(self.read()?.history.iter().cloned().collect())
    }

    // ---- Locking ----

    fn read(&self) -> ManagerResult<RwLockReadGuard<'_, Inner>> {
        self.inner.read().map_err(|_| ManagerError::LockPoisoned)
    }

    fn write(&self) -> ManagerResult<RwLockWriteGuard<'_, Inner>> {
        self.inner.write().map_err(|_| ManagerError::LockPoisoned)
    }
}

impl std::fmt::Debug for StoreManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreManager")
            .field("package", &self.package)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
