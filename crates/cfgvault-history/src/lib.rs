//! Version history for cfgvault.
//!
//! Every save appends one [`VersionRecord`] to the [`HistoryLog`], a single
//! newest-first list shared by all keys of a package. The log is never
//! pruned. What callers see as "versions" is computed from it on demand by
//! the [`Consolidator`]: bursts of saves closer together than the auto-save
//! interval collapse into one retained version, while every description
//! written during the burst is kept on the survivor.
//!
//! # Modules
//!
//! - [`log`] -- The append-only [`HistoryLog`] and its JSON form
//! - [`retention`] -- [`RetentionPolicy`] and the [`Consolidator`]
//! - [`error`] -- Error types for history operations

pub mod error;
pub mod log;
pub mod retention;

pub use cfgvault_types::VersionRecord;
pub use error::{HistoryError, Result};
pub use log::HistoryLog;
pub use retention::{
    Consolidation, ConsolidationReport, Consolidator, DebounceAnchor, RetentionPolicy,
    DEFAULT_AUTO_SAVE_INTERVAL,
};
