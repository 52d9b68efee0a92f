//! Storage key layout.
//!
//! Keys are dot-separated segments, e.g. `network.current` or
//! `network.backups.20170501010000000`. The segment before the document id
//! names the collection (`current`, `backups`, `versionHistory`); backends map
//! the segments onto their own addressing scheme.
//!
//! Valid keys:
//! - Must have at least two segments
//! - Segments must be non-empty
//! - Segments may only contain ASCII letters, digits, `-` and `_`

use crate::error::{Result, TypeError};

/// Collection segment of the live document.
pub const CURRENT_SEGMENT: &str = "current";

/// Collection segment under which every saved version is copied.
pub const BACKUPS_SEGMENT: &str = "backups";

/// Document segment of the persisted history log.
pub const HISTORY_SEGMENT: &str = "versionHistory";

/// Validate a storage key, returning `Ok(())` if it is well formed.
///
/// # Examples
///
/// ```
/// use cfgvault_types::key::validate_key;
///
/// assert!(validate_key("network.current").is_ok());
/// assert!(validate_key("network").is_err());
/// assert!(validate_key("network..current").is_err());
/// ```
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(invalid(key, "key must not be empty"));
    }

    let mut segments = 0usize;
    for segment in key.split('.') {
        validate_segment(key, segment)?;
        segments += 1;
    }

    if segments < 2 {
        return Err(invalid(key, "key must have at least two segments"));
    }

    Ok(())
}

/// Validate a single key segment such as a package name or version id.
pub fn validate_segment(key: &str, segment: &str) -> Result<()> {
    if segment.is_empty() {
        return Err(invalid(key, "segments must not be empty"));
    }
    if let Some(ch) = segment
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(invalid(key, &format!("forbidden character {ch:?}")));
    }
    Ok(())
}

/// Key of the live document for `package`.
pub fn current_key(package: &str) -> String {
    format!("{package}.{CURRENT_SEGMENT}")
}

/// Key of the persisted history log for `package`.
pub fn history_key(package: &str) -> String {
    format!("{package}.{HISTORY_SEGMENT}")
}

/// Derive the backup key of `version_id` for a document key.
///
/// The final segment of `key` is replaced by the backups collection and the
/// version id is appended: `pkg.current` + `42` becomes `pkg.backups.42`.
pub fn backup_key(key: &str, version_id: &str) -> Result<String> {
    validate_key(key)?;
    let (prefix, _) = key
        .rsplit_once('.')
        .ok_or_else(|| invalid(key, "key must have at least two segments"))?;
    let derived = format!("{prefix}.{BACKUPS_SEGMENT}.{version_id}");
    validate_segment(&derived, version_id)?;
    Ok(derived)
}

fn invalid(key: &str, reason: &str) -> TypeError {
    TypeError::InvalidKey {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
