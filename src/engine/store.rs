// ABOUTME: Named value store threaded through the steps of one run
// ABOUTME: Seeded with initial parameters and grown by each step's outputs

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::task::Values;

/// Values keyed by name, in the order they were written.
///
/// A store belongs to exactly one run; concurrent runs each get their own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Store {
    values: IndexMap<String, Value>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(name.into(), value)
    }

    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.insert(name, value);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Collect the named values, or report the first name that is missing.
    pub fn select(&self, names: &[String]) -> std::result::Result<Values, String> {
        let mut selected = Values::with_capacity(names.len());
        for name in names {
            match self.values.get(name) {
                Some(value) => {
                    selected.insert(name.clone(), value.clone());
                }
                None => return Err(name.clone()),
            }
        }
        Ok(selected)
    }

    /// Overlay another set of parameters; later values win.
    pub fn merge(&mut self, other: Store) {
        self.values.extend(other.values);
    }
}

impl From<Values> for Store {
    fn from(values: Values) -> Self {
        Self { values }
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Store {
    fn from_iter<T: IntoIterator<Item = (K, Value)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
