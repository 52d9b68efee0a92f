use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Names of the metadata fields cfgvault reads or writes itself.
///
/// Any other field is caller data and is carried through untouched.
pub mod fields {
    pub const ID: &str = "id";
    pub const KEY: &str = "key";
    pub const MODIFIED: &str = "modified";
    pub const MODIFIED_FORMAT: &str = "modifiedFormat";
    pub const MODIFIED_BY: &str = "modifiedBy";
    pub const SIZE: &str = "size";
    pub const FILE_URL: &str = "fileUrl";
    pub const FILE_EXTENSION: &str = "fileExtension";
    pub const DESCRIPTION: &str = "description";
    pub const DESCRIPTIONS: &str = "descriptions";
}

/// Open-ended, ordered field bag attached to every stored blob.
///
/// Keys are kept in a `BTreeMap` so serialized metadata is deterministic.
/// Values are arbitrary JSON; unknown fields survive a save/load round trip.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, Value>);

impl Metadata {
    /// Create an empty field bag.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace a field, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(name.into(), value.into())
    }

    /// Remove a field, returning its value if it was present.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name)
    }

    /// Raw access to a field.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// String value of a field. Non-string values yield `None`.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    /// Unsigned integer value of a field.
    ///
    /// Accepts JSON numbers as well as numeric strings, since older stores
    /// wrote every metadata value as text.
    pub fn get_u64(&self, name: &str) -> Option<u64> {
        match self.0.get(name)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// String elements of an array field. Non-string elements are ignored.
    pub fn get_str_list(&self, name: &str) -> Vec<String> {
        match self.0.get(name) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Copy every field of `other` into `self`, overwriting duplicates.
    pub fn extend(&mut self, other: Metadata) {
        self.0.extend(other.0);
    }

    /// Field names in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Serialize as a JSON object.
    pub fn to_json_vec(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(&self.0)
    }

    /// Parse from a JSON object. Anything other than an object is rejected.
    pub fn from_json_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

impl From<BTreeMap<String, Value>> for Metadata {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Metadata> for BTreeMap<String, Value> {
    fn from(meta: Metadata) -> Self {
        meta.0
    }
}

impl FromIterator<(String, Value)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn insert_and_typed_reads() {
        let meta = Metadata::new()
            .with(fields::ID, "20170501010000000")
            .with(fields::SIZE, 42u64)
            .with("flag", true);

        assert_eq!(meta.get_str(fields::ID), Some("20170501010000000"));
        assert_eq!(meta.get_u64(fields::SIZE), Some(42));
        assert_eq!(meta.get("flag"), Some(&Value::Bool(true)));
        assert_eq!(meta.get_str(fields::SIZE), None);
        assert_eq!(meta.len(), 3);
    }

    #[test]
    fn numeric_strings_read_as_numbers() {
        let meta = Metadata::new().with(fields::SIZE, "17");
        assert_eq!(meta.get_u64(fields::SIZE), Some(17));
        assert_eq!(Metadata::new().with(fields::SIZE, "x").get_u64(fields::SIZE), None);
    }

    #[test]
    fn string_lists_skip_foreign_elements() {
        let meta = Metadata::new().with(fields::DESCRIPTIONS, json!(["b", 3, "a"]));
        assert_eq!(meta.get_str_list(fields::DESCRIPTIONS), vec!["b", "a"]);
        assert!(meta.get_str_list("absent").is_empty());
    }

    #[test]
    fn unknown_fields_survive_json_round_trip() {
        let meta = Metadata::new()
            .with(fields::KEY, "network.current")
            .with("owner", json!({"team": "infra", "oncall": ["a", "b"]}));

        let bytes = meta.to_json_vec().unwrap();
        let back = Metadata::from_json_slice(&bytes).unwrap();
        assert_eq!(back, meta);
        assert_eq!(back.get("owner").unwrap()["team"], "infra");
    }

    #[test]
    fn non_object_json_is_rejected() {
        assert!(Metadata::from_json_slice(b"[1, 2]").is_err());
        assert!(Metadata::from_json_slice(b"not json").is_err());
    }

    #[test]
    fn extend_overwrites_duplicates() {
        let mut base = Metadata::new().with("a", 1).with("b", 2);
        base.extend(Metadata::new().with("b", 3).with("c", 4));
        assert_eq!(base.get_u64("b"), Some(3));
        assert_eq!(base.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }
}
