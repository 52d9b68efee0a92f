//! High-level SDK for cfgvault.
//!
//! [`StoreManager`] is the main entry point for applications embedding
//! cfgvault. It keeps one live document per package, copies every save to an
//! immutable backup, records it in the history log and serves consolidated
//! version lists on demand.
//!
//! ```
//! use std::sync::Arc;
//! use cfgvault_sdk::{InMemoryBlobStore, ManualClock, StoreConfig, StoreManager};
//!
//! let clock = Arc::new(ManualClock::at_str("2017-05-01 01:00:00.000").unwrap());
//! let manager = StoreManager::new(
//!     "network",
//!     Arc::new(InMemoryBlobStore::new()),
//!     clock.clone(),
//!     StoreConfig::default(),
//! )
//! .unwrap();
//! manager.init().unwrap();
//!
//! let first = manager.save(b"{\"mtu\":1500}", Some("initial")).unwrap();
//! clock.advance(std::time::Duration::from_secs(15 * 60));
//! manager.save(b"{\"mtu\":9000}", Some("jumbo frames")).unwrap();
//!
//! assert_eq!(manager.current_versions().unwrap().len(), 2);
//! assert_eq!(manager.restore(first.id()).unwrap(), b"{\"mtu\":1500}");
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod manager;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::StoreConfig;
pub use error::{ManagerError, ManagerResult};
pub use manager::{ManagerState, StoreManager};

// Re-export key types
pub use cfgvault_blob::{BlobError, BlobStore, FileBlobStore, InMemoryBlobStore, StoredBlob};
pub use cfgvault_history::{
    ConsolidationReport, Consolidator, DebounceAnchor, HistoryLog, RetentionPolicy,
};
pub use cfgvault_types::{fields, Metadata, TimestampFormat, VersionRecord};
