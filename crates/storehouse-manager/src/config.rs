use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use storehouse_store::MemoryStore;

use crate::error::{ManagerError, ManagerResult};

/// Configuration key that matches every store name.
pub const WILDCARD: &str = "*";

/// Backend selection for one configuration key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Registered backend type tag, e.g. `"memory"` or `"files"`.
    #[serde(rename = "type")]
    pub store_type: String,
    /// Backend-specific options. The store's logical name is injected under
    /// `name` at construction time.
    #[serde(default)]
    pub options: Map<String, Value>,
}

impl StoreConfig {
    /// Select `store_type` with no options.
    pub fn new(store_type: impl Into<String>) -> Self {
        Self {
            store_type: store_type.into(),
            options: Map::new(),
        }
    }

    /// The fallback used when no configuration key matches.
    pub fn memory() -> Self {
        Self::new(MemoryStore::TYPE)
    }

    /// Add or replace a backend option.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::memory()
    }
}

/// Which configuration level produced a resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigMatch {
    /// The full logical name was configured.
    Exact,
    /// The main segment (text before the first `.`) was configured.
    Namespace,
    /// The wildcard key `"*"` was configured.
    Wildcard,
    /// Nothing matched; the memory default applies.
    Default,
}

impl std::fmt::Display for ConfigMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Exact => "exact",
            Self::Namespace => "namespace",
            Self::Wildcard => "wildcard",
            Self::Default => "default",
        };
        f.write_str(s)
    }
}

/// The configuration chosen for a logical store name.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedStore {
    /// The full logical name that was resolved.
    pub name: String,
    /// The configuration key that matched, if any.
    pub key: Option<String>,
    /// Which precedence level matched.
    pub matched: ConfigMatch,
    /// The selected backend configuration.
    pub config: StoreConfig,
}

/// Name-to-backend configuration table.
///
/// Keys are exact logical names, namespace prefixes (the main segment of a
/// dotted name), or [`WILDCARD`]. Loaded from TOML:
///
/// ```toml
/// [stores."*"]
/// type = "memory"
///
/// [stores.jobs]
/// type = "files"
/// options = { path = "/var/lib/app" }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ManagerConfig {
    #[serde(default)]
    pub stores: BTreeMap<String, StoreConfig>,
}

impl ManagerConfig {
    /// An empty table: every name resolves to the memory default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the configuration for `key`.
    pub fn with_store(mut self, key: impl Into<String>, config: StoreConfig) -> Self {
        self.stores.insert(key.into(), config);
        self
    }

    /// Parse a TOML document.
    pub fn from_toml_str(s: &str) -> ManagerResult<Self> {
        toml::from_str(s).map_err(|e| ManagerError::Config(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn load(path: &Path) -> ManagerResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Configuration for an exact key, without fallback.
    pub fn get(&self, key: &str) -> Option<&StoreConfig> {
        self.stores.get(key)
    }

    /// Number of configured keys.
    pub fn len(&self) -> usize {
        self.stores.len()
    }

    /// Returns `true` if no keys are configured.
    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    /// Pick the configuration for a logical store name.
    ///
    /// Lookup order is exact name, main segment, wildcard, then the memory
    /// default. The first hit wins; levels are never merged.
    pub fn resolve(&self, name: &str) -> ResolvedStore {
        let main = main_segment(name);
        let candidates = [
            (name, ConfigMatch::Exact),
            (main, ConfigMatch::Namespace),
            (WILDCARD, ConfigMatch::Wildcard),
        ];

        for (key, matched) in candidates {
            if let Some(config) = self.stores.get(key) {
                return ResolvedStore {
                    name: name.to_string(),
                    key: Some(key.to_string()),
                    matched,
                    config: config.clone(),
                };
            }
        }

        ResolvedStore {
            name: name.to_string(),
            key: None,
            matched: ConfigMatch::Default,
            config: StoreConfig::memory(),
        }
    }
}

/// The text before the first `.`, or the whole name when there is no dot.
pub fn main_segment(name: &str) -> &str {
    name.split_once('.').map(|(main, _)| main).unwrap_or(name)
}
