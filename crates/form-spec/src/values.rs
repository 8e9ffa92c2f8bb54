use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Current value of every field, keyed by field name.
///
/// Values are text: scalar types as typed, `repeatable-group` as a JSON array
/// of objects, `checkbox-group` as comma-joined option values. Entries are
/// never removed, so a field that disappears and reappears keeps its value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueStore(BTreeMap<String, String>);

impl ValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored value, or the empty string when the field was never set.
    pub fn get(&self, name: &str) -> &str {
        self.0.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn get_opt(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Builds a store from an arbitrary JSON object. Non-string entries are
    /// kept as their JSON text (arrays become repeatable-group values) and
    /// nulls are skipped. Anything other than an object yields an empty store.
    pub fn from_json(value: &Value) -> Self {
        let mut store = Self::new();
        if let Some(map) = value.as_object() {
            for (name, entry) in map {
                match entry {
                    Value::Null => {}
                    Value::String(text) => store.set(name.clone(), text.clone()),
                    other => store.set(name.clone(), other.to_string()),
                }
            }
        }
        store
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect::<Map<String, Value>>(),
        )
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ValueStore {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        ValueStore(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Splits a comma-joined `checkbox-group` value into its selected options.
pub fn split_multi(value: &str) -> Vec<&str> {
    value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect()
}

/// Adds `option` to a comma-joined value, or removes it when already present.
pub fn toggle_multi(value: &str, option: &str) -> String {
    let mut selected = split_multi(value);
    if let Some(pos) = selected.iter().position(|item| *item == option) {
        selected.remove(pos);
    } else {
        selected.push(option);
    }
    selected.join(",")
}

pub const CHECKED: &str = "true";

/// Flips a single checkbox between `"true"` and unchecked (empty).
pub fn toggle_checkbox(value: &str) -> String {
    if value == CHECKED {
        String::new()
    } else {
        CHECKED.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_values_read_as_empty() {
        let store = ValueStore::new();
        assert_eq!(store.get("anything"), "");
        assert!(store.get_opt("anything").is_none());
    }

    #[test]
    fn from_json_keeps_arrays_as_text() {
        let store = ValueStore::from_json(&json!({
            "name": "Ada",
            "travellers": [{"dob": "1990-01-01"}],
            "count": 3,
            "skip": null
        }));
        assert_eq!(store.get("name"), "Ada");
        assert_eq!(store.get("travellers"), r#"[{"dob":"1990-01-01"}]"#);
        assert_eq!(store.get("count"), "3");
        assert!(!store.contains("skip"));
    }

    #[test]
    fn toggling_multi_values() {
        assert_eq!(toggle_multi("", "fire"), "fire");
        assert_eq!(toggle_multi("fire", "theft"), "fire,theft");
        assert_eq!(toggle_multi("fire,theft", "fire"), "theft");
        assert_eq!(split_multi(" a, ,b "), vec!["a", "b"]);
    }

    #[test]
    fn toggling_checkbox() {
        assert_eq!(toggle_checkbox(""), "true");
        assert_eq!(toggle_checkbox("true"), "");
    }
}
