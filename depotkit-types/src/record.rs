//! Flattened, schema-governed spec records.

use crate::TagMap;
use serde::{Deserialize, Serialize};

/// A structured form flattened against its schema: canonical fields plus
/// any server-reported fields that fall outside the schema.
///
/// Repeated fields are indexed positionally (`View0`, `View1`, …) and an
/// entry's trailing comment, if any, appears under `ViewComment0` etc.
/// Extra fields are kept apart from schema fields so they can round-trip
/// without being mistaken for canonical ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SpecRecord {
    fields: TagMap,
    extras: TagMap,
}

impl SpecRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a record from already-flattened fields, with no extras.
    pub fn from_fields(fields: TagMap) -> Self {
        Self {
            fields,
            extras: TagMap::new(),
        }
    }

    /// Looks a key up in the schema fields first, then in the extras.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .or_else(|| self.extras.get(key))
            .map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn insert_extra(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.extras.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.fields.shift_remove(key)
    }

    pub fn fields(&self) -> &TagMap {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut TagMap {
        &mut self.fields
    }

    pub fn extras(&self) -> &TagMap {
        &self.extras
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key) || self.extras.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len() + self.extras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.extras.is_empty()
    }

    /// Iterates schema fields, then extras, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .chain(self.extras.iter())
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for SpecRecord {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self::from_fields(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_prefers_fields_over_extras() {
        let mut r = SpecRecord::new();
        r.insert("Client", "ws");
        r.insert_extra("Client", "shadowed");
        r.insert_extra("firmerThanParent", "false");

        assert_eq!(r.get("Client"), Some("ws"));
        assert_eq!(r.get("firmerThanParent"), Some("false"));
        assert_eq!(r.get("missing"), None);
        assert_eq!(r.len(), 3);
    }
}
