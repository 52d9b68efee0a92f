//! Retention consolidation.
//!
//! The [`Consolidator`] turns the raw [`HistoryLog`] into the versions a
//! user is offered. It walks each key's records oldest first and groups them
//! into slots: a record opens a new slot when it lands at least
//! `auto_save_interval` after the slot anchor, otherwise it replaces the
//! newest slot's survivor. Descriptions of replaced records are carried onto
//! the survivor as `descriptions`, newest first.
//!
//! Consolidation is a pure projection over the log. Nothing is deleted, so
//! running it twice, or with a different policy, is always safe.

use std::collections::BTreeMap;
use std::time::Duration;

use cfgvault_types::VersionRecord;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::log::HistoryLog;

/// Ten minutes.
pub const DEFAULT_AUTO_SAVE_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Which timestamp a slot's debounce window is measured from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DebounceAnchor {
    /// The first save of the slot. A steady stream of saves is cut into
    /// interval-sized slots.
    #[default]
    SlotStart,
    /// The latest save merged into the slot. A steady stream of saves
    /// collapses into one slot until it pauses for a full interval.
    LatestSave,
}

/// How history is consolidated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub auto_save_interval: Duration,
    pub anchor: DebounceAnchor,
}

impl RetentionPolicy {
    pub fn new(auto_save_interval: Duration) -> Self {
        Self {
            auto_save_interval,
            anchor: DebounceAnchor::default(),
        }
    }

    pub fn with_anchor(mut self, anchor: DebounceAnchor) -> Self {
        self.anchor = anchor;
        self
    }

    fn interval_millis(&self) -> i64 {
        i64::try_from(self.auto_save_interval.as_millis()).unwrap_or(i64::MAX)
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_AUTO_SAVE_INTERVAL)
    }
}

/// Counters describing one consolidation pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConsolidationReport {
    /// Records considered.
    pub visited: usize,
    /// Slots produced, i.e. versions returned.
    pub retained: usize,
    /// Records that replaced an earlier survivor.
    pub merged: usize,
    /// Records skipped because their timestamp could not be interpreted.
    pub malformed: usize,
}

/// Result of consolidating a whole log.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Consolidation {
    /// Retained versions per key, newest first. Keys without any retained
    /// version are absent.
    pub versions: BTreeMap<String, Vec<VersionRecord>>,
    pub report: ConsolidationReport,
}

/// Projects a [`HistoryLog`] into retained versions under a
/// [`RetentionPolicy`].
#[derive(Clone, Debug, Default)]
pub struct Consolidator {
    policy: RetentionPolicy,
}

impl Consolidator {
    pub fn new(policy: RetentionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    /// Retained versions of every key.
    pub fn all_versions(&self, log: &HistoryLog) -> BTreeMap<String, Vec<VersionRecord>> {
        self.consolidate(log).versions
    }

    /// Retained versions of one key, newest first. Unknown keys yield an
    /// empty list.
    pub fn versions_for(&self, log: &HistoryLog, key: &str) -> Vec<VersionRecord> {
        self.consolidate_key(log, key).0
    }

    /// Consolidate every key in a single pass over the log.
    pub fn consolidate(&self, log: &HistoryLog) -> Consolidation {
        self.run(log.iter_chronological())
    }

    /// Consolidate one key, also returning the pass counters.
    pub fn consolidate_key(
        &self,
        log: &HistoryLog,
        key: &str,
    ) -> (Vec<VersionRecord>, ConsolidationReport) {
        let Consolidation {
            mut versions,
            report,
        } = self.run(log.iter_chronological().filter(|r| r.key() == key));
        (versions.remove(key).unwrap_or_default(), report)
    }

    fn run<'a>(&self, records: impl Iterator<Item = &'a VersionRecord>) -> Consolidation {
        let mut windows: BTreeMap<&'a str, KeyWindow> = BTreeMap::new();
        let mut report = ConsolidationReport::default();

        for record in records {
            report.visited += 1;
            let at = match record.modified_at() {
                Ok(at) => at,
                Err(err) => {
                    warn!(
                        id = record.id(),
                        key = record.key(),
                        error = %err,
                        "skipping history record with unreadable timestamp"
                    );
                    report.malformed += 1;
                    continue;
                }
            };
            let window = windows.entry(record.key()).or_default();
            if window.observe(record, at, &self.policy) == Slotting::Merged {
                report.merged += 1;
            }
        }

        let versions: BTreeMap<String, Vec<VersionRecord>> = windows
            .into_iter()
            .map(|(key, window)| (key.to_string(), window.into_versions()))
            .filter(|(_, versions)| !versions.is_empty())
            .collect();
        report.retained = versions.values().map(Vec::len).sum();

        debug!(
            visited = report.visited,
            retained = report.retained,
            merged = report.merged,
            malformed = report.malformed,
            "history consolidated"
        );
        Consolidation { versions, report }
    }
}

// ---------------------------------------------------------------------------
// Per-key state
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq)]
enum Slotting {
    Opened,
    Merged,
}

/// Survivor of one slot plus the descriptions it has absorbed.
#[derive(Debug)]
struct Slot<'a> {
    survivor: &'a VersionRecord,
    descriptions: Vec<String>,
}

#[derive(Debug, Default)]
struct KeyWindow<'a> {
    anchor: Option<NaiveDateTime>,
    /// Oldest first.
    slots: Vec<Slot<'a>>,
}

impl<'a> KeyWindow<'a> {
    fn observe(
        &mut self,
        record: &'a VersionRecord,
        at: NaiveDateTime,
        policy: &RetentionPolicy,
    ) -> Slotting {
        let opens_slot = match self.anchor {
            Some(anchor) if !self.slots.is_empty() => {
                at.signed_duration_since(anchor).num_milliseconds() >= policy.interval_millis()
            }
            _ => true,
        };

        if opens_slot {
            self.anchor = Some(at);
            self.slots.push(Slot {
                survivor: record,
                descriptions: record.description().map(str::to_string).into_iter().collect(),
            });
            return Slotting::Opened;
        }

        if policy.anchor == DebounceAnchor::LatestSave {
            self.anchor = Some(at);
        }
        if let Some(slot) = self.slots.last_mut() {
            slot.survivor = record;
            if let Some(description) = record.description() {
                slot.descriptions.insert(0, description.to_string());
            }
        }
        Slotting::Merged
    }

    /// Survivors newest first, each carrying its accumulated descriptions.
    fn into_versions(self) -> Vec<VersionRecord> {
        self.slots
            .into_iter()
            .rev()
            .map(|slot| {
                let mut version = slot.survivor.clone();
                version.set_descriptions(slot.descriptions);
                version
            })
            .collect()
    }
}
