use std::time::Duration;

use cfgvault_history::{DebounceAnchor, RetentionPolicy};
use cfgvault_types::{TimestampFormat, DEFAULT_MODIFIED_FORMAT};
use serde::{Deserialize, Serialize};

/// Configuration of a [`StoreManager`](crate::StoreManager).
///
/// Every field has a default, so a config file only needs the settings it
/// changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Package whose document is managed, the first key segment.
    pub package: String,
    /// Saves closer together than this collapse into one version.
    pub auto_save_interval_ms: u64,
    /// Where the debounce window of a version is measured from.
    pub debounce_anchor: DebounceAnchor,
    /// Extension recorded with each save, e.g. `.json`. May be empty.
    pub file_extension: String,
    /// Pattern used for the `modified` field of new saves.
    pub modified_format: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            package: "cfgvault".into(),
            auto_save_interval_ms: 10 * 60 * 1000,
            debounce_anchor: DebounceAnchor::SlotStart,
            file_extension: ".json".into(),
            modified_format: DEFAULT_MODIFIED_FORMAT.into(),
        }
    }
}

impl StoreConfig {
    /// The consolidation policy these settings describe.
    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy::new(Duration::from_millis(self.auto_save_interval_ms))
            .with_anchor(self.debounce_anchor)
    }

    pub fn timestamp_format(&self) -> cfgvault_types::Result<TimestampFormat> {
        TimestampFormat::parse(&self.modified_format)
    }
}
