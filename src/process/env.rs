//! Environment variables handed to a spawned process

use crate::error::{Error, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Ordered `NAME -> value` map
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentVariables(BTreeMap<String, String>);

impl EnvironmentVariables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive variables from the fields of a serializable record.
    ///
    /// Each field becomes one variable: the name is upper-cased, strings are
    /// taken verbatim, other values use their JSON text and `null` becomes
    /// an empty string.
    pub fn from_fields<T: Serialize>(record: &T) -> Result<Self> {
        let Value::Object(fields) = serde_json::to_value(record)? else {
            return Err(Error::Config(
                "environment source must serialize to a map of fields".into(),
            ));
        };
        Ok(fields
            .into_iter()
            .map(|(name, value)| {
                let value = match value {
                    Value::String(s) => s,
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                (name.to_uppercase(), value)
            })
            .collect())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn extend(&mut self, other: &EnvironmentVariables) {
        self.0
            .extend(other.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
}

impl FromIterator<(String, String)> for EnvironmentVariables {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a EnvironmentVariables {
    type Item = (&'a String, &'a String);
    type IntoIter = std::collections::btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
