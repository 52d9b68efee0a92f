use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, TypeError};
use crate::metadata::{fields, Metadata};
use crate::timefmt::TimestampFormat;

/// Metadata of one saved snapshot.
///
/// A `VersionRecord` is a typed view over a [`Metadata`] bag rather than a
/// closed struct: callers may attach arbitrary fields and they are carried
/// through the history log untouched. The only structural requirement is a
/// non-empty string `id` and `key`, checked on construction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Metadata", into = "Metadata")]
pub struct VersionRecord {
    meta: Metadata,
}

impl VersionRecord {
    /// Build a record for a save at `modified_at`, rendering the timestamp
    /// with `format` and recording the pattern alongside it.
    pub fn new(
        id: impl Into<String>,
        key: impl Into<String>,
        modified_at: &NaiveDateTime,
        format: &TimestampFormat,
    ) -> Result<Self> {
        let id: String = id.into();
        let key: String = key.into();
        let meta = Metadata::new()
            .with(fields::ID, id)
            .with(fields::KEY, key)
            .with(fields::MODIFIED, format.format(modified_at))
            .with(fields::MODIFIED_FORMAT, format.pattern());
        Self::from_metadata(meta)
    }

    /// Wrap an existing field bag, validating `id` and `key`.
    pub fn from_metadata(meta: Metadata) -> Result<Self> {
        match meta.get_str(fields::ID) {
            Some(id) if !id.is_empty() => {}
            _ => return Err(TypeError::MissingField(fields::ID)),
        }
        match meta.get_str(fields::KEY) {
            Some(key) if !key.is_empty() => {}
            _ => return Err(TypeError::MissingField(fields::KEY)),
        }
        Ok(Self { meta })
    }

    pub fn id(&self) -> &str {
        self.meta.get_str(fields::ID).unwrap_or_default()
    }

    pub fn key(&self) -> &str {
        self.meta.get_str(fields::KEY).unwrap_or_default()
    }

    pub fn modified(&self) -> Option<&str> {
        self.meta.get_str(fields::MODIFIED)
    }

    pub fn modified_format(&self) -> Option<&str> {
        self.meta.get_str(fields::MODIFIED_FORMAT)
    }

    pub fn modified_by(&self) -> Option<&str> {
        self.meta.get_str(fields::MODIFIED_BY)
    }

    pub fn size(&self) -> Option<u64> {
        self.meta.get_u64(fields::SIZE)
    }

    pub fn file_url(&self) -> Option<&str> {
        self.meta.get_str(fields::FILE_URL)
    }

    pub fn description(&self) -> Option<&str> {
        self.meta.get_str(fields::DESCRIPTION)
    }

    /// Accumulated descriptions of a consolidated burst, newest first.
    ///
    /// Only present on records produced by consolidation.
    pub fn descriptions(&self) -> Vec<String> {
        self.meta.get_str_list(fields::DESCRIPTIONS)
    }

    /// Replace the accumulated descriptions. An empty list removes the field.
    pub fn set_descriptions(&mut self, descriptions: Vec<String>) {
        if descriptions.is_empty() {
            self.meta.remove(fields::DESCRIPTIONS);
        } else {
            let values = descriptions.into_iter().map(Value::String).collect::<Vec<_>>();
            self.meta.insert(fields::DESCRIPTIONS, Value::Array(values));
        }
    }

    /// Parse `modified` with the pattern recorded in `modifiedFormat`.
    ///
    /// Records without `modifiedFormat` fail; there is no fallback pattern.
    pub fn modified_at(&self) -> Result<NaiveDateTime> {
        let pattern = self
            .modified_format()
            .ok_or(TypeError::MissingField(fields::MODIFIED_FORMAT))?;
        let value = self
            .modified()
            .ok_or(TypeError::MissingField(fields::MODIFIED))?;
        TimestampFormat::parse(pattern)?.parse_timestamp(value)
    }

    /// Read any field, including caller-defined ones.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.meta.get(name)
    }

    pub fn metadata(&self) -> &Metadata {
        &self.meta
    }

    pub fn into_metadata(self) -> Metadata {
        self.meta
    }
}

impl TryFrom<Metadata> for VersionRecord {
    type Error = TypeError;

    fn try_from(meta: Metadata) -> Result<Self> {
        Self::from_metadata(meta)
    }
}

impl From<VersionRecord> for Metadata {
    fn from(record: VersionRecord) -> Self {
        record.meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ts(s: &str) -> NaiveDateTime {
        TimestampFormat::default().parse_timestamp(s).unwrap()
    }

    fn sample() -> VersionRecord {
        VersionRecord::new(
            "20170501010000000",
            "network.current",
            &ts("2017-05-01 01:00:00.000"),
            &TimestampFormat::default(),
        )
        .unwrap()
    }

    #[test]
    fn new_records_are_self_describing() {
        let record = sample();
        assert_eq!(record.id(), "20170501010000000");
        assert_eq!(record.key(), "network.current");
        assert_eq!(record.modified(), Some("2017-05-01 01:00:00.000"));
        assert_eq!(record.modified_format(), Some("yyyy-MM-dd HH:mm:ss.SSS"));
        assert_eq!(record.modified_at().unwrap(), ts("2017-05-01 01:00:00.000"));
        assert!(record.description().is_none());
        assert!(record.size().is_none());
    }

    #[test]
    fn requires_id_and_key() {
        let no_id = Metadata::new().with(fields::KEY, "a.current");
        assert_eq!(
            VersionRecord::from_metadata(no_id).unwrap_err(),
            TypeError::MissingField(fields::ID)
        );

        let empty_key = Metadata::new().with(fields::ID, "1").with(fields::KEY, "");
        assert_eq!(
            VersionRecord::from_metadata(empty_key).unwrap_err(),
            TypeError::MissingField(fields::KEY)
        );

        let numeric_id = Metadata::new().with(fields::ID, 1).with(fields::KEY, "a.current");
        assert!(VersionRecord::from_metadata(numeric_id).is_err());
    }

    #[test]
    fn uses_the_records_own_pattern() {
        let meta = Metadata::new()
            .with(fields::ID, "1")
            .with(fields::KEY, "a.current")
            .with(fields::MODIFIED, "01/05/2017 01:10")
            .with(fields::MODIFIED_FORMAT, "dd/MM/yyyy HH:mm");
        let record = VersionRecord::from_metadata(meta).unwrap();
        assert_eq!(record.modified_at().unwrap(), ts("2017-05-01 01:10:00.000"));
    }

    #[test]
    fn missing_pattern_is_an_error() {
        let meta = Metadata::new()
            .with(fields::ID, "1")
            .with(fields::KEY, "a.current")
            .with(fields::MODIFIED, "2017-05-01 01:00:00.000");
        let record = VersionRecord::from_metadata(meta).unwrap();
        assert_eq!(
            record.modified_at().unwrap_err(),
            TypeError::MissingField(fields::MODIFIED_FORMAT)
        );
    }

    #[test]
    fn descriptions_set_and_clear() {
        let mut record = sample();
        record.set_descriptions(vec!["c".into(), "b".into()]);
        assert_eq!(record.descriptions(), vec!["c", "b"]);
        assert_eq!(record.get(fields::DESCRIPTIONS), Some(&json!(["c", "b"])));

        record.set_descriptions(Vec::new());
        assert!(record.get(fields::DESCRIPTIONS).is_none());
    }

    #[test]
    fn serde_goes_through_the_field_bag() {
        let mut meta = sample().into_metadata();
        meta.insert("modifiedBy", "admin");
        meta.insert(fields::SIZE, 9);
        let record = VersionRecord::from_metadata(meta).unwrap();

        let text = serde_json::to_string(&record).unwrap();
        let back: VersionRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(back, record);
        assert_eq!(back.modified_by(), Some("admin"));
        assert_eq!(back.size(), Some(9));

        let invalid = serde_json::from_str::<VersionRecord>(r#"{"key": "a.current"}"#);
        assert!(invalid.is_err());
    }
}
