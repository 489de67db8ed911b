use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use serde_json::Value;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::options::StoreOptions;
use crate::traits::Store;

/// In-memory, HashMap-based key/value store.
///
/// The default backend. Entries live behind a `RwLock` and are dropped on
/// `close()`; nothing is persisted.
pub struct MemoryStore {
    name: String,
    entries: RwLock<HashMap<String, Value>>,
    connected: AtomicBool,
}

impl MemoryStore {
    /// Type tag under which this backend is registered.
    pub const TYPE: &'static str = "memory";

    /// Create a new empty, unconnected store.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: RwLock::new(HashMap::new()),
            connected: AtomicBool::new(false),
        }
    }

    /// Factory entry point used by the backend registry.
    pub fn from_options(options: StoreOptions) -> StoreResult<Arc<dyn Store>> {
        Ok(Arc::new(Self::new(options.name())))
    }

    fn ensure_connected(&self) -> StoreResult<()> {
        if self.connected.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(StoreError::NotConnected {
                name: self.name.clone(),
            })
        }
    }
}

impl Store for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn connect(&self) -> StoreResult<()> {
        self.connected.store(true, Ordering::Release);
        debug!(store = %self.name, "memory store connected");
        Ok(())
    }

    fn close(&self) -> StoreResult<()> {
        if self.connected.swap(false, Ordering::AcqRel) {
            self.entries.write().expect("lock poisoned").clear();
            debug!(store = %self.name, "memory store closed");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        self.ensure_connected()?;
        let map = self.entries.read().expect("lock poisoned");
        Ok(map.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> StoreResult<()> {
        self.ensure_connected()?;
        let mut map = self.entries.write().expect("lock poisoned");
        map.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        self.ensure_connected()?;
        let mut map = self.entries.write().expect("lock poisoned");
        Ok(map.remove(key).is_some())
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        self.ensure_connected()?;
        let map = self.entries.read().expect("lock poisoned");
        let mut keys: Vec<String> = map.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    fn clear(&self) -> StoreResult<()> {
        self.ensure_connected()?;
        self.entries.write().expect("lock poisoned").clear();
        Ok(())
    }

    fn contains(&self, key: &str) -> StoreResult<bool> {
        self.ensure_connected()?;
        Ok(self.entries.read().expect("lock poisoned").contains_key(key))
    }

    fn len(&self) -> StoreResult<usize> {
        self.ensure_connected()?;
        Ok(self.entries.read().expect("lock poisoned").len())
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.entries.read().map(|m| m.len()).unwrap_or_default();
        f.debug_struct("MemoryStore")
            .field("name", &self.name)
            .field("connected", &self.is_connected())
            .field("entry_count", &count)
            .finish()
    }
}
