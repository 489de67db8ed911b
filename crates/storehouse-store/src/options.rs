use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{StoreError, StoreResult};

/// Key under which the logical store name is injected into the options.
pub const NAME_OPTION: &str = "name";

/// Backend options handed to a store factory.
///
/// Holds the resolved configuration options with the store's full logical
/// name injected under [`NAME_OPTION`]. The injected name always wins over a
/// `name` key present in the configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreOptions {
    values: Map<String, Value>,
}

impl StoreOptions {
    /// Merge `options` with the logical `name`.
    pub fn new(name: impl Into<String>, options: Map<String, Value>) -> Self {
        let mut values = options;
        values.insert(NAME_OPTION.to_string(), Value::String(name.into()));
        Self { values }
    }

    /// Options carrying only a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, Map::new())
    }

    /// Add or replace an option.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if key != NAME_OPTION {
            self.values.insert(key, value.into());
        }
        self
    }

    /// The injected logical name.
    pub fn name(&self) -> &str {
        self.values
            .get(NAME_OPTION)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Raw access to an option.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Read a string option.
    ///
    /// Returns `Ok(None)` when absent and `InvalidOption` when present with
    /// any other JSON type.
    pub fn get_str(&self, key: &str) -> StoreResult<Option<&str>> {
        match self.values.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(self.invalid(key, format!("expected a string, got {other}"))),
        }
    }

    /// Read a boolean option.
    pub fn get_bool(&self, key: &str) -> StoreResult<Option<bool>> {
        match self.values.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(self.invalid(key, format!("expected a boolean, got {other}"))),
        }
    }

    /// All options, including the injected name.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Build an [`StoreError::InvalidOption`] for this store.
    pub fn invalid(&self, option: &str, reason: impl Into<String>) -> StoreError {
        StoreError::InvalidOption {
            name: self.name().to_string(),
            option: option.to_string(),
            reason: reason.into(),
        }
    }
}
