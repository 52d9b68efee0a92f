//! The append-only history log.
//!
//! [`HistoryLog`] holds one [`VersionRecord`] per save, all keys interleaved,
//! newest first. Its persisted form is a JSON array of record objects in the
//! same order. Loading is forgiving: entries that are not objects, lack an
//! `id` or `key`, or repeat an id already seen are skipped with a warning.

use std::collections::{BTreeSet, HashSet, VecDeque};

use cfgvault_types::{Metadata, VersionRecord};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{HistoryError, Result};

/// Newest-first record of every save ever made.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HistoryLog {
    records: VecDeque<VersionRecord>,
    ids: HashSet<String>,
}

impl HistoryLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record at the head of the log.
    ///
    /// Fails if a record with the same id is already present; the log is
    /// left unchanged in that case.
    pub fn append(&mut self, record: VersionRecord) -> Result<()> {
        if !self.ids.insert(record.id().to_string()) {
            return Err(HistoryError::InvalidRecord {
                id: record.id().to_string(),
                reason: "id already present in the log".into(),
            });
        }
        self.records.push_front(record);
        Ok(())
    }

    /// Find a record by id.
    pub fn find(&self, id: &str) -> Option<&VersionRecord> {
        if !self.ids.contains(id) {
            return None;
        }
        self.records.iter().find(|r| r.id() == id)
    }

    /// The most recently appended record.
    pub fn latest(&self) -> Option<&VersionRecord> {
        self.records.front()
    }

    /// Records newest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &VersionRecord> + '_ {
        self.records.iter()
    }

    /// Records oldest first.
    pub fn iter_chronological(&self) -> impl Iterator<Item = &VersionRecord> + '_ {
        self.records.iter().rev()
    }

    /// Distinct keys present in the log.
    pub fn keys(&self) -> BTreeSet<&str> {
        self.records.iter().map(VersionRecord::key).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rebuild a log from its persisted JSON form.
    ///
    /// Individual malformed entries are skipped; only a payload that is not
    /// a JSON array is an error.
    pub fn load(bytes: &[u8]) -> Result<Self> {
        Self::load_with_report(bytes).map(|(log, _)| log)
    }

    /// Like [`HistoryLog::load`], also returning how many entries were
    /// skipped.
    pub fn load_with_report(bytes: &[u8]) -> Result<(Self, usize)> {
        let entries: Vec<Value> =
            serde_json::from_slice(bytes).map_err(|e| HistoryError::Serialization(e.to_string()))?;

        let mut log = Self::new();
        let mut skipped = 0usize;

        // Persisted newest first; append oldest first to restore that order.
        for (index, entry) in entries.into_iter().enumerate().rev() {
            let record = match entry {
                Value::Object(map) => VersionRecord::from_metadata(Metadata::from_iter(map)),
                _ => {
                    warn!(index, "skipping history entry that is not an object");
                    skipped += 1;
                    continue;
                }
            };
            match record {
                Ok(record) => {
                    if let Err(err) = log.append(record) {
                        warn!(index, error = %err, "skipping history entry");
                        skipped += 1;
                    }
                }
                Err(err) => {
                    warn!(index, error = %err, "skipping malformed history entry");
                    skipped += 1;
                }
            }
        }

        debug!(records = log.len(), skipped, "history log loaded");
        Ok((log, skipped))
    }

    /// Encode the log as a JSON array, newest first.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let records: Vec<&VersionRecord> = self.records.iter().collect();
        serde_json::to_vec_pretty(&records).map_err(|e| HistoryError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfgvault_types::{fields, TimestampFormat};

    fn record(id: &str, key: &str, modified: &str) -> VersionRecord {
        let fmt = TimestampFormat::default();
        VersionRecord::new(id, key, &fmt.parse_timestamp(modified).unwrap(), &fmt).unwrap()
    }

    fn ids(log: &HistoryLog) -> Vec<&str> {
        log.iter().map(VersionRecord::id).collect()
    }

    // ---- append / find ----

    #[test]
    fn append_inserts_at_head() {
        let mut log = HistoryLog::new();
        log.append(record("1", "a.current", "2017-05-01 01:00:00.000")).unwrap();
        log.append(record("2", "a.current", "2017-05-01 01:10:00.000")).unwrap();
        log.append(record("3", "b.current", "2017-05-01 01:20:00.000")).unwrap();

        assert_eq!(ids(&log), vec!["3", "2", "1"]);
        assert_eq!(log.latest().map(VersionRecord::id), Some("3"));
        let chrono: Vec<&str> = log.iter_chronological().map(VersionRecord::id).collect();
        assert_eq!(chrono, vec!["1", "2", "3"]);
    }

    #[test]
    fn append_rejects_duplicate_ids() {
        let mut log = HistoryLog::new();
        log.append(record("1", "a.current", "2017-05-01 01:00:00.000")).unwrap();
        let err = log
            .append(record("1", "a.current", "2017-05-01 01:10:00.000"))
            .unwrap_err();
        assert!(matches!(err, HistoryError::InvalidRecord { id, .. } if id == "1"));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn find_by_id() {
        let mut log = HistoryLog::new();
        log.append(record("1", "a.current", "2017-05-01 01:00:00.000")).unwrap();
        log.append(record("2", "b.current", "2017-05-01 01:00:00.000")).unwrap();

        assert_eq!(log.find("2").map(VersionRecord::key), Some("b.current"));
        assert!(log.find("missing").is_none());
    }

    #[test]
    fn empty_log() {
        let log = HistoryLog::new();
        assert!(log.is_empty());
        assert!(log.latest().is_none());
        assert!(log.keys().is_empty());
    }

    #[test]
    fn keys_are_distinct_and_sorted() {
        let mut log = HistoryLog::new();
        log.append(record("1", "b.current", "2017-05-01 01:00:00.000")).unwrap();
        log.append(record("2", "a.current", "2017-05-01 01:00:00.000")).unwrap();
        log.append(record("3", "b.current", "2017-05-01 01:00:00.000")).unwrap();
        assert_eq!(log.keys().into_iter().collect::<Vec<_>>(), vec!["a.current", "b.current"]);
    }

    // ---- persistence ----

    #[test]
    fn serialize_then_load_preserves_order_and_fields() {
        let mut log = HistoryLog::new();
        log.append(record("1", "a.current", "2017-05-01 01:00:00.000")).unwrap();
        let mut meta = record("2", "a.current", "2017-05-01 01:10:00.000").into_metadata();
        meta.insert(fields::DESCRIPTION, "tuned mtu");
        meta.insert("ticket", "NET-42");
        log.append(VersionRecord::from_metadata(meta).unwrap()).unwrap();

        let bytes = log.serialize().unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.trim_start().starts_with('['));

        let loaded = HistoryLog::load(&bytes).unwrap();
        assert_eq!(loaded, log);
        assert_eq!(ids(&loaded), vec!["2", "1"]);
        let newest = loaded.latest().unwrap();
        assert_eq!(newest.description(), Some("tuned mtu"));
        assert_eq!(newest.get("ticket").and_then(Value::as_str), Some("NET-42"));
    }

    #[test]
    fn load_skips_malformed_entries() {
        let payload = br#"[
            {"id": "3", "key": "a.current", "modified": "2017-05-01 01:20:00.000", "modifiedFormat": "yyyy-MM-dd HH:mm:ss.SSS"},
            "not an object",
            {"key": "a.current"},
            {"id": "", "key": "a.current"},
            {"id": "1", "key": "a.current", "modified": "2017-05-01 01:00:00.000", "modifiedFormat": "yyyy-MM-dd HH:mm:ss.SSS"},
            {"id": "1", "key": "a.current", "modified": "2017-05-01 00:00:00.000", "modifiedFormat": "yyyy-MM-dd HH:mm:ss.SSS"}
        ]"#;

        let (log, skipped) = HistoryLog::load_with_report(payload).unwrap();
        assert_eq!(skipped, 4);
        assert_eq!(ids(&log), vec!["3", "1"]);
        // The older duplicate (last in the array) wins because it is seen first.
        assert_eq!(log.find("1").and_then(VersionRecord::modified), Some("2017-05-01 00:00:00.000"));
    }

    #[test]
    fn load_rejects_non_array_payloads() {
        assert!(matches!(
            HistoryLog::load(b"{\"id\": \"1\"}").unwrap_err(),
            HistoryError::Serialization(_)
        ));
        assert!(HistoryLog::load(b"garbage").is_err());
        assert!(HistoryLog::load(b"[]").unwrap().is_empty());
    }
}
