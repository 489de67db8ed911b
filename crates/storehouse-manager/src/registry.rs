//! The [`BackendRegistry`]: type tag to store factory.
//!
//! The registry decouples which backend types exist from which backend a
//! given store name uses. Entries are keyed purely by tag, so registering an
//! existing tag replaces it. That is how hosts install test doubles or
//! override the built-in backends.

use std::collections::HashMap;
use std::sync::Arc;

use storehouse_store::{FileStore, MemoryStore, Store, StoreOptions, StoreResult};

/// Builds store instances for one backend type.
///
/// The factory only constructs; the manager calls `connect()` afterwards.
/// Any `Fn(StoreOptions) -> StoreResult<Arc<dyn Store>>` closure is a
/// factory.
pub trait StoreFactory: Send + Sync {
    /// Build an unconnected store from options carrying the logical name.
    fn create(&self, options: StoreOptions) -> StoreResult<Arc<dyn Store>>;
}

impl<F> StoreFactory for F
where
    F: Fn(StoreOptions) -> StoreResult<Arc<dyn Store>> + Send + Sync,
{
    fn create(&self, options: StoreOptions) -> StoreResult<Arc<dyn Store>> {
        self(options)
    }
}

/// Overwrite-map from backend type tag to factory.
#[derive(Clone)]
pub struct BackendRegistry {
    factories: HashMap<String, Arc<dyn StoreFactory>>,
}

impl BackendRegistry {
    /// A registry holding the built-in `memory` and `files` backends.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(MemoryStore::TYPE, MemoryStore::from_options);
        registry.register(FileStore::TYPE, FileStore::from_options);
        registry
    }

    /// A registry with no backends at all.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register `factory` under `type_tag`, replacing any previous entry.
    pub fn register(&mut self, type_tag: impl Into<String>, factory: impl StoreFactory + 'static) {
        self.register_arc(type_tag, Arc::new(factory));
    }

    /// Register an already shared factory.
    pub fn register_arc(&mut self, type_tag: impl Into<String>, factory: Arc<dyn StoreFactory>) {
        let type_tag = type_tag.into();
        if self.factories.insert(type_tag.clone(), factory).is_some() {
            tracing::debug!(store_type = %type_tag, "replaced registered backend");
        } else {
            tracing::debug!(store_type = %type_tag, "registered backend");
        }
    }

    /// Returns `true` if a factory exists for `type_tag`.
    pub fn is_registered(&self, type_tag: &str) -> bool {
        self.factories.contains_key(type_tag)
    }

    /// The factory registered for `type_tag`, if any.
    pub fn lookup(&self, type_tag: &str) -> Option<Arc<dyn StoreFactory>> {
        self.factories.get(type_tag).cloned()
    }

    /// All registered type tags, sorted.
    pub fn types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.factories.keys().cloned().collect();
        types.sort();
        types
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("types", &self.types())
            .finish()
    }
}
