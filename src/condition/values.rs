// SPDX-License-Identifier: MIT

//! Progression values supplied to each evaluation

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Snapshot of the progression fields a condition may reference
///
/// The set of keys is the set of fields a condition is allowed to name.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Values {
    fields: BTreeMap<String, Value>,
}

impl Values {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    /// Set a field value
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Get a field value
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Whether `field` is part of this record
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// All field names
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Build a record from a JSON object; other JSON shapes yield `None`
    pub fn from_json(value: &Value) -> Option<Self> {
        value.as_object().map(|obj| {
            obj.iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        })
    }
}

impl FromIterator<(String, Value)> for Values {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_and_lookup() {
        let values = Values::new().with("gameMode", 2).with("region", "eidos");
        assert_eq!(values.get("gameMode"), Some(&json!(2)));
        assert_eq!(values.get("region"), Some(&json!("eidos")));
        assert!(values.contains("region"));
        assert!(!values.contains("unknown"));
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_null_is_still_a_field() {
        let values = Values::new().with("region", Value::Null);
        assert!(values.contains("region"));
    }

    #[test]
    fn test_from_json() {
        let values = Values::from_json(&json!({"a": 1, "b": "x"})).unwrap();
        assert_eq!(values.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(Values::from_json(&json!([1, 2])).is_none());
    }

    #[test]
    fn test_deserialize_transparent() {
        let values: Values = serde_json::from_value(json!({"gameMode": 1})).unwrap();
        assert_eq!(values, Values::new().with("gameMode", 1));
        assert_eq!(serde_json::to_value(&values).unwrap(), json!({"gameMode": 1}));
    }
}
