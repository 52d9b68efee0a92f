//! Foundation types for cfgvault.
//!
//! Every other cfgvault crate depends on `cfgvault-types`. Nothing in here
//! performs I/O; these are the value types that flow between the blob store,
//! the history log and the store manager.
//!
//! # Key Types
//!
//! - [`Metadata`] -- Ordered, open-ended field bag attached to every blob
//! - [`VersionRecord`] -- Typed view over the metadata of one saved snapshot
//! - [`TimestampFormat`] -- Self-describing `modified` timestamp pattern
//! - [`VersionIdAllocator`] -- Monotonic, sortable version id generation
//!
//! Key helpers ([`validate_key`], [`current_key`], [`backup_key`],
//! [`history_key`]) live in [`key`].

pub mod error;
pub mod key;
pub mod metadata;
pub mod record;
pub mod timefmt;
pub mod version;

pub use error::{Result, TypeError};
pub use key::{backup_key, current_key, history_key, validate_key};
pub use metadata::{fields, Metadata};
pub use record::VersionRecord;
pub use timefmt::{TimestampFormat, DEFAULT_MODIFIED_FORMAT, VERSION_ID_FORMAT};
pub use version::{compare_version_ids, latest_version_id, split_version_id, VersionIdAllocator};
