use std::cmp::Ordering;

use chrono::NaiveDateTime;

/// Allocates version ids from save timestamps.
///
/// The base of an id is the save time at millisecond resolution
/// (`yyyyMMddHHmmssSSS`). Two saves in the same millisecond would collide,
/// so later ones get a zero-padded counter suffix: `20170501010000000`,
/// `20170501010000000-001`, `20170501010000000-002`. If the clock steps
/// backwards the last base is reused with the next suffix, keeping ids
/// unique and sortable in creation order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VersionIdAllocator {
    last_base: Option<String>,
    seq: u32,
}

impl VersionIdAllocator {
    /// Create an allocator with no history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume after the most recently issued id, e.g. the newest entry of a
    /// loaded history log.
    pub fn resume_after(last_id: &str) -> Self {
        let (base, seq) = split_version_id(last_id);
        Self {
            last_base: Some(base.to_string()),
            seq,
        }
    }

    /// Issue the id for a save at `at`.
    pub fn next_id(&mut self, at: &NaiveDateTime) -> String {
        let base = id_base(at);
        match &self.last_base {
            Some(last) if base.as_str() <= last.as_str() => {
                self.seq += 1;
                format!("{last}-{:03}", self.seq)
            }
            _ => {
                self.last_base = Some(base.clone());
                self.seq = 0;
                base
            }
        }
    }
}

/// Split an id into its timestamp base and collision counter.
///
/// Ids without a numeric `-NNN` suffix have counter 0.
pub fn split_version_id(id: &str) -> (&str, u32) {
    match id.rsplit_once('-') {
        Some((base, suffix)) if !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()) => {
            (base, suffix.parse().unwrap_or(0))
        }
        _ => (id, 0),
    }
}

/// Order ids by creation: base first, then the collision counter as a
/// number, so `X-1000` sorts after `X-999`.
pub fn compare_version_ids(a: &str, b: &str) -> Ordering {
    let (a_base, a_seq) = split_version_id(a);
    let (b_base, b_seq) = split_version_id(b);
    a_base.cmp(b_base).then(a_seq.cmp(&b_seq))
}

/// The latest id in creation order, see [`compare_version_ids`].
pub fn latest_version_id<'a>(ids: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    ids.into_iter().max_by(|a, b| compare_version_ids(a, b))
}

/// `yyyyMMddHHmmssSSS`, see [`crate::VERSION_ID_FORMAT`].
fn id_base(at: &NaiveDateTime) -> String {
    at.format("%Y%m%d%H%M%S%3f").to_string()
}
