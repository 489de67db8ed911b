use serde_json::Value;

use crate::error::StoreResult;

/// A named key/value store with an explicit connect/close lifecycle.
///
/// All implementations must satisfy these invariants:
/// - The name is fixed at construction and never changes.
/// - `connect()` must complete before the store serves data-plane calls.
/// - Data-plane calls take `&self`; implementations use interior mutability
///   and must be safe to share across threads.
/// - All I/O errors are propagated, never silently ignored.
///
/// Whether `close()` may be called twice is up to each backend. The built-in
/// backends treat a second `close()` as a no-op.
pub trait Store: Send + Sync {
    /// The logical name this store was constructed for.
    fn name(&self) -> &str;

    /// Establish readiness. May perform blocking I/O.
    fn connect(&self) -> StoreResult<()>;

    /// Release resources. May perform blocking I/O.
    fn close(&self) -> StoreResult<()>;

    /// Returns `true` between a successful `connect()` and `close()`.
    fn is_connected(&self) -> bool;

    /// Read the value stored under `key`.
    ///
    /// Returns `Ok(None)` if the key does not exist.
    fn get(&self, key: &str) -> StoreResult<Option<Value>>;

    /// Write `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: Value) -> StoreResult<()>;

    /// Delete a key. Returns `true` if the key existed.
    fn delete(&self, key: &str) -> StoreResult<bool>;

    /// All keys currently stored, sorted.
    fn keys(&self) -> StoreResult<Vec<String>>;

    /// Remove every key.
    fn clear(&self) -> StoreResult<()>;

    /// Check whether a key exists.
    fn contains(&self, key: &str) -> StoreResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Number of keys currently stored.
    fn len(&self) -> StoreResult<usize> {
        Ok(self.keys()?.len())
    }

    /// Returns `true` if the store holds no keys.
    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Read multiple keys in a batch.
    ///
    /// Default implementation calls `get()` for each key. Backends may
    /// override for fewer I/O round-trips.
    fn get_many(&self, keys: &[&str]) -> StoreResult<Vec<Option<Value>>> {
        keys.iter().map(|key| self.get(key)).collect()
    }

    /// Write multiple entries in a batch.
    ///
    /// Default implementation calls `set()` for each entry and stops at the
    /// first failure.
    fn set_many(&self, entries: Vec<(String, Value)>) -> StoreResult<()> {
        for (key, value) in entries {
            self.set(&key, value)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for dyn Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.name())
            .field("connected", &self.is_connected())
            .finish()
    }
}
