// Concurrent variable store and extraction normalisation

use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Variables visible to checks as inputs.
///
/// Values are JSON strings (single extraction) or arrays of strings
/// (multi-value extraction). Writers on different tasks never observe a
/// torn entry; there is no ordering between concurrent writers.
#[derive(Debug, Clone, Default)]
pub struct VariableStore {
    entries: Arc<DashMap<String, Value>>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Owned point-in-time copy of every entry.
    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// A new, unshared store holding the same entries.
    pub fn deep_clone(&self) -> Self {
        let entries = DashMap::with_capacity(self.entries.len());
        for entry in self.entries.iter() {
            entries.insert(entry.key().clone(), entry.value().clone());
        }
        Self {
            entries: Arc::new(entries),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for VariableStore {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let store = Self::new();
        for (key, value) in iter {
            store.set(key, value);
        }
        store
    }
}

/// Write a check's extractions into `store`.
///
/// `ip: ["a"]` becomes `ip -> "a"`. `ip: ["a", "b"]` becomes
/// `ip -> ["a", "b"]`, `ip0 -> "a"` and `ip1 -> "b"`. An extractor that
/// produced nothing stores an empty string.
///
/// Indexed keys live in the same namespace as plain ones, so `ip1: [a, b]`
/// writes `ip10`, the same key a later `ip10: [c]` writes.
pub fn normalize_extracts(store: &VariableStore, extracts: &HashMap<String, Vec<String>>) {
    for (key, values) in extracts {
        match values.as_slice() {
            [] => store.set(key.clone(), ""),
            [single] => store.set(key.clone(), single.clone()),
            many => {
                for (index, value) in many.iter().enumerate() {
                    store.set(format!("{key}{index}"), value.clone());
                }
                store.set(key.clone(), Value::from(many.to_vec()));
            }
        }
    }
}
