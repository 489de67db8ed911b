use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use storehouse_store::{Store, StoreOptions};
use tracing::{debug, info, warn};

use crate::config::{ManagerConfig, ResolvedStore};
use crate::error::{CloseFailure, ManagerError, ManagerResult};
use crate::registry::{BackendRegistry, StoreFactory};

/// A write-once cell for one logical name.
///
/// The slot mutex is held for the whole check-construct-connect-cache
/// sequence, so concurrent callers for the same name see exactly one
/// construction. `None` means nothing has been successfully connected yet.
/// A slot only ever moves from `None` to `Some`, so a slot poisoned by a
/// panicking factory or `connect()` still holds a consistent value.
type Slot = Arc<Mutex<Option<Arc<dyn Store>>>>;

fn lock_slot(slot: &Slot) -> MutexGuard<'_, Option<Arc<dyn Store>>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Owns every live store and decides which backend serves each name.
///
/// The manager is an explicit object: build one per process, configure it
/// with [`initialize`](Self::initialize), share it by reference (or `Arc`),
/// and call [`close`](Self::close) at shutdown.
///
/// Each logical name gets at most one instance for the manager's lifetime.
/// Instances are built lazily on first [`get_store`](Self::get_store),
/// connected before being handed out, and never evicted.
pub struct StoreManager {
    registry: RwLock<BackendRegistry>,
    config: RwLock<ManagerConfig>,
    slots: Mutex<HashMap<String, Slot>>,
}

impl StoreManager {
    /// A manager with the built-in backends and an empty configuration.
    pub fn new() -> Self {
        Self::with_registry(BackendRegistry::new())
    }

    /// A manager starting from a custom registry.
    pub fn with_registry(registry: BackendRegistry) -> Self {
        Self {
            registry: RwLock::new(registry),
            config: RwLock::new(ManagerConfig::default()),
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the configuration table wholesale.
    ///
    /// Configuration is read only when a store is constructed. Stores that
    /// already exist keep the backend they were built with.
    pub fn initialize(&self, config: ManagerConfig) {
        info!(keys = config.len(), "store manager configured");
        *self.config.write().expect("config lock poisoned") = config;
    }

    /// Snapshot of the active configuration.
    pub fn config(&self) -> ManagerConfig {
        self.config.read().expect("config lock poisoned").clone()
    }

    /// Register (or replace) the factory for a backend type tag.
    pub fn register_store(&self, type_tag: impl Into<String>, factory: impl StoreFactory + 'static) {
        self.registry
            .write()
            .expect("registry lock poisoned")
            .register(type_tag, factory);
    }

    /// Returns `true` if a backend is registered under `type_tag`.
    pub fn is_registered(&self, type_tag: &str) -> bool {
        self.registry
            .read()
            .expect("registry lock poisoned")
            .is_registered(type_tag)
    }

    /// The factory registered under `type_tag`, if any.
    pub fn registered_store(&self, type_tag: &str) -> Option<Arc<dyn StoreFactory>> {
        self.registry
            .read()
            .expect("registry lock poisoned")
            .lookup(type_tag)
    }

    /// All registered backend type tags, sorted.
    pub fn registered_types(&self) -> Vec<String> {
        self.registry.read().expect("registry lock poisoned").types()
    }

    /// Which configuration would serve `name`. Never constructs anything.
    pub fn resolve(&self, name: &str) -> ResolvedStore {
        self.config.read().expect("config lock poisoned").resolve(name)
    }

    /// The connected store for `name`, building it on first use.
    ///
    /// On a cache miss the configuration is resolved (exact name, main
    /// segment, wildcard, memory default), the backend factory is looked up
    /// and invoked with the options plus the full logical name, and the new
    /// store is connected. Only a successfully connected store is cached; a
    /// failed construction or connect returns the error and leaves nothing
    /// behind, so the next call tries again.
    pub fn get_store(&self, name: &str) -> ManagerResult<Arc<dyn Store>> {
        loop {
            let slot = self.slot(name);
            let mut cell = lock_slot(&slot);

            if let Some(store) = cell.as_ref() {
                debug!(store = name, "store cache hit");
                return Ok(Arc::clone(store));
            }

            // A failed attempt may have dropped this slot while we waited.
            if !self.is_current_slot(name, &slot) {
                continue;
            }

            return match self.construct(name) {
                Ok(store) => {
                    *cell = Some(Arc::clone(&store));
                    Ok(store)
                }
                Err(e) => {
                    self.forget_slot(name, &slot);
                    Err(e)
                }
            };
        }
    }

    /// Make sure a connected store exists for `name` without returning it.
    pub fn create(&self, name: &str) -> ManagerResult<()> {
        self.get_store(name).map(|_| ())
    }

    /// Returns `true` if a store has been built for exactly `name`.
    ///
    /// Never triggers construction. Stores stay present after
    /// [`close`](Self::close).
    pub fn has(&self, name: &str) -> bool {
        let slot = match self.slots.lock().expect("slot map poisoned").get(name) {
            Some(slot) => Arc::clone(slot),
            None => return false,
        };
        let present = lock_slot(&slot).is_some();
        present
    }

    /// Names of every store built so far, sorted.
    pub fn store_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .live_stores()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        names.sort();
        names
    }

    /// Close every cached store.
    ///
    /// Every store is attempted even when some fail; failures are collected
    /// into a single [`ManagerError::Close`]. The cache is left intact:
    /// [`has`](Self::has) keeps reporting the closed stores and
    /// [`get_store`](Self::get_store) keeps returning their (now closed)
    /// handles.
    pub fn close(&self) -> ManagerResult<()> {
        let stores = self.live_stores();
        info!(count = stores.len(), "closing stores");

        let mut failures = Vec::new();
        for (name, store) in stores {
            match store.close() {
                Ok(()) => debug!(store = %name, "store closed"),
                Err(error) => {
                    warn!(store = %name, %error, "store failed to close");
                    failures.push(CloseFailure { name, error });
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ManagerError::Close { failures })
        }
    }

    /// Fetch or insert the slot for `name`. The map lock is released on return.
    fn slot(&self, name: &str) -> Slot {
        let mut slots = self.slots.lock().expect("slot map poisoned");
        Arc::clone(slots.entry(name.to_string()).or_default())
    }

    fn is_current_slot(&self, name: &str, slot: &Slot) -> bool {
        self.slots
            .lock()
            .expect("slot map poisoned")
            .get(name)
            .map(|current| Arc::ptr_eq(current, slot))
            .unwrap_or(false)
    }

    /// Drop an empty slot after a failed attempt. Caller holds the slot lock,
    /// so the slot is still empty; slot-then-map is the only nested order.
    fn forget_slot(&self, name: &str, slot: &Slot) {
        let mut slots = self.slots.lock().expect("slot map poisoned");
        if slots.get(name).is_some_and(|current| Arc::ptr_eq(current, slot)) {
            slots.remove(name);
        }
    }

    /// Snapshot of every populated slot.
    fn live_stores(&self) -> Vec<(String, Arc<dyn Store>)> {
        let slots: Vec<(String, Slot)> = self
            .slots
            .lock()
            .expect("slot map poisoned")
            .iter()
            .map(|(name, slot)| (name.clone(), Arc::clone(slot)))
            .collect();

        slots
            .into_iter()
            .filter_map(|(name, slot)| {
                let cell = lock_slot(&slot);
                cell.as_ref().map(|store| (name, Arc::clone(store)))
            })
            .collect()
    }

    /// Resolve, build, and connect a store. Caller holds the name's slot.
    fn construct(&self, name: &str) -> ManagerResult<Arc<dyn Store>> {
        let resolved = self.resolve(name);
        let store_type = resolved.config.store_type;
        debug!(
            store = name,
            store_type = %store_type,
            matched = %resolved.matched,
            key = ?resolved.key,
            "resolved store configuration"
        );

        let factory = self.registered_store(&store_type).ok_or_else(|| {
            ManagerError::UnregisteredBackend {
                name: name.to_string(),
                store_type: store_type.clone(),
            }
        })?;

        let options = StoreOptions::new(name, resolved.config.options);
        let store = factory
            .create(options)
            .map_err(|source| ManagerError::Construct {
                name: name.to_string(),
                store_type: store_type.clone(),
                source,
            })?;

        if let Err(source) = store.connect() {
            warn!(store = name, store_type = %store_type, error = %source, "store failed to connect");
            return Err(ManagerError::Connect {
                name: name.to_string(),
                store_type,
                source,
            });
        }

        info!(store = name, store_type = %store_type, "store connected");
        Ok(store)
    }
}

impl Default for StoreManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StoreManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreManager")
            .field("types", &self.registered_types())
            .field("stores", &self.store_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigMatch, StoreConfig, WILDCARD};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::{mpsc, Barrier};
    use std::thread;
    use std::time::Duration;
    use storehouse_store::{MemoryStore, StoreError, StoreResult};

    /// Counters shared between a test and every store its factory builds.
    #[derive(Default)]
    struct Tracker {
        built: AtomicUsize,
        connects: AtomicUsize,
        closes: AtomicUsize,
        fail_connect: AtomicBool,
        names: Mutex<Vec<String>>,
    }

    /// A memory store that reports lifecycle calls to a [`Tracker`].
    struct TrackedStore {
        inner: MemoryStore,
        tracker: Arc<Tracker>,
        fail_close: bool,
        options: StoreOptions,
    }

    impl Store for TrackedStore {
        fn name(&self) -> &str {
            self.inner.name()
        }
        fn connect(&self) -> StoreResult<()> {
            self.tracker.connects.fetch_add(1, Ordering::SeqCst);
            if self.tracker.fail_connect.load(Ordering::SeqCst) {
                return Err(StoreError::Backend("connection refused".into()));
            }
            self.inner.connect()
        }
        fn close(&self) -> StoreResult<()> {
            self.tracker.closes.fetch_add(1, Ordering::SeqCst);
            self.inner.close()?;
            if self.fail_close {
                return Err(StoreError::Backend("close failed".into()));
            }
            Ok(())
        }
        fn is_connected(&self) -> bool {
            self.inner.is_connected()
        }
        fn get(&self, key: &str) -> StoreResult<Option<Value>> {
            if key == "__options" {
                return Ok(Some(serde_json::to_value(&self.options)?));
            }
            self.inner.get(key)
        }
        fn set(&self, key: &str, value: Value) -> StoreResult<()> {
            self.inner.set(key, value)
        }
        fn delete(&self, key: &str) -> StoreResult<bool> {
            self.inner.delete(key)
        }
        fn keys(&self) -> StoreResult<Vec<String>> {
            self.inner.keys()
        }
        fn clear(&self) -> StoreResult<()> {
            self.inner.clear()
        }
    }

    fn tracked_factory(tracker: &Arc<Tracker>) -> impl StoreFactory + 'static {
        let tracker = Arc::clone(tracker);
        move |options: StoreOptions| -> StoreResult<Arc<dyn Store>> {
            tracker.built.fetch_add(1, Ordering::SeqCst);
            tracker.names.lock().unwrap().push(options.name().to_string());
            let fail_close = options.get_bool("fail_close")?.unwrap_or(false);
            Ok(Arc::new(TrackedStore {
                inner: MemoryStore::new(options.name()),
                tracker: Arc::clone(&tracker),
                fail_close,
                options,
            }))
        }
    }

    fn manager_with_tracker(tag: &str) -> (StoreManager, Arc<Tracker>) {
        let manager = StoreManager::new();
        let tracker = Arc::new(Tracker::default());
        manager.register_store(tag, tracked_factory(&tracker));
        (manager, tracker)
    }

    // -----------------------------------------------------------------------
    // Idempotent construction
    // -----------------------------------------------------------------------

    #[test]
    fn get_store_is_memoized() {
        let (manager, tracker) = manager_with_tracker("memory");
        let a = manager.get_store("users").unwrap();
        let b = manager.get_store("users").unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(tracker.built.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.connects.load(Ordering::SeqCst), 1);
        assert!(a.is_connected());
    }

    #[test]
    fn returned_store_is_usable() {
        let manager = StoreManager::new();
        let store = manager.get_store("cache").unwrap();
        store.set("k", json!("v")).unwrap();
        let again = manager.get_store("cache").unwrap();
        assert_eq!(again.get("k").unwrap(), Some(json!("v")));
    }

    #[test]
    fn has_does_not_construct() {
        let (manager, tracker) = manager_with_tracker("memory");
        assert!(!manager.has("users"));
        assert_eq!(tracker.built.load(Ordering::SeqCst), 0);

        manager.create("users").unwrap();
        assert!(manager.has("users"));
        assert!(!manager.has("users.archive"));
        assert_eq!(manager.store_names(), vec!["users"]);
    }

    #[test]
    fn concurrent_callers_share_one_instance() {
        let (manager, tracker) = manager_with_tracker("memory");
        let manager = Arc::new(manager);
        let barrier = Arc::new(Barrier::new(16));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let manager = Arc::clone(&manager);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    manager.get_store("hot").unwrap()
                })
            })
            .collect();

        let stores: Vec<Arc<dyn Store>> = handles
            .into_iter()
            .map(|h| h.join().expect("thread should not panic"))
            .collect();

        for store in &stores[1..] {
            assert!(Arc::ptr_eq(&stores[0], store));
        }
        assert_eq!(tracker.built.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.connects.load(Ordering::SeqCst), 1);
    }

    /// Holds every `connect()` until the test releases it.
    struct Gate {
        entered: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    struct GatedStore {
        inner: MemoryStore,
        gate: Arc<Gate>,
    }

    impl Store for GatedStore {
        fn name(&self) -> &str {
            self.inner.name()
        }
        fn connect(&self) -> StoreResult<()> {
            self.gate.entered.lock().unwrap().send(()).unwrap();
            self.gate
                .release
                .lock()
                .unwrap()
                .recv_timeout(Duration::from_secs(10))
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            self.inner.connect()
        }
        fn close(&self) -> StoreResult<()> {
            self.inner.close()
        }
        fn is_connected(&self) -> bool {
            self.inner.is_connected()
        }
        fn get(&self, key: &str) -> StoreResult<Option<Value>> {
            self.inner.get(key)
        }
        fn set(&self, key: &str, value: Value) -> StoreResult<()> {
            self.inner.set(key, value)
        }
        fn delete(&self, key: &str) -> StoreResult<bool> {
            self.inner.delete(key)
        }
        fn keys(&self) -> StoreResult<Vec<String>> {
            self.inner.keys()
        }
        fn clear(&self) -> StoreResult<()> {
            self.inner.clear()
        }
    }

    #[test]
    fn slow_connect_does_not_block_other_names() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let gate = Arc::new(Gate {
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        });

        let manager = Arc::new(StoreManager::new());
        let factory_gate = Arc::clone(&gate);
        manager.register_store("gated", move |options: StoreOptions| -> StoreResult<Arc<dyn Store>> {
            Ok(Arc::new(GatedStore {
                inner: MemoryStore::new(options.name()),
                gate: Arc::clone(&factory_gate),
            }))
        });
        manager.initialize(ManagerConfig::new().with_store("slow", StoreConfig::new("gated")));

        let slow = {
            let manager = Arc::clone(&manager);
            thread::spawn(move || manager.get_store("slow"))
        };
        entered_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("slow store should start connecting");

        // "slow" is now parked inside connect() holding its own slot.
        let (done_tx, done_rx) = mpsc::channel();
        let fast = {
            let manager = Arc::clone(&manager);
            thread::spawn(move || {
                let store = manager.get_store("fast").unwrap();
                done_tx.send(store.is_connected()).unwrap();
            })
        };
        let connected = done_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("fast store should not wait for slow one");
        assert!(connected);

        release_tx.send(()).unwrap();
        fast.join().unwrap();
        let slow = slow.join().unwrap().unwrap();
        assert!(slow.is_connected());
        assert_eq!(manager.store_names(), vec!["fast", "slow"]);
    }

    // -----------------------------------------------------------------------
    // Configuration precedence
    // -----------------------------------------------------------------------

    #[test]
    fn resolution_follows_precedence() {
        let manager = StoreManager::new();
        let trackers: Vec<(&str, Arc<Tracker>)> = ["x", "y", "z"]
            .into_iter()
            .map(|tag| {
                let tracker = Arc::new(Tracker::default());
                manager.register_store(tag, tracked_factory(&tracker));
                (tag, tracker)
            })
            .collect();
        manager.initialize(
            ManagerConfig::new()
                .with_store("a.b", StoreConfig::new("x"))
                .with_store("a", StoreConfig::new("y"))
                .with_store(WILDCARD, StoreConfig::new("z")),
        );

        manager.get_store("a.b").unwrap();
        manager.get_store("a.c").unwrap();
        manager.get_store("other").unwrap();

        let names = |i: usize| trackers[i].1.names.lock().unwrap().clone();
        assert_eq!(names(0), vec!["a.b"]);
        assert_eq!(names(1), vec!["a.c"]);
        assert_eq!(names(2), vec!["other"]);
    }

    #[test]
    fn empty_config_uses_memory_default() {
        let (manager, tracker) = manager_with_tracker("memory");
        assert_eq!(manager.resolve("q").matched, ConfigMatch::Default);
        manager.get_store("q").unwrap();
        assert_eq!(tracker.built.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn factory_receives_options_and_full_name() {
        let (manager, _tracker) = manager_with_tracker("tracker");
        manager.initialize(ManagerConfig::new().with_store(
            "jobs",
            StoreConfig::new("tracker")
                .with_option("path", "/srv/jobs")
                .with_option("name", "ignored"),
        ));

        let store = manager.get_store("jobs.emails").unwrap();
        assert_eq!(store.name(), "jobs.emails");
        assert_eq!(
            store.get("__options").unwrap(),
            Some(json!({"name": "jobs.emails", "path": "/srv/jobs"}))
        );
    }

    #[test]
    fn namespace_partitions_into_distinct_file_stores() {
        let dir = tempfile::tempdir().unwrap();
        let manager = StoreManager::new();
        manager.initialize(ManagerConfig::new().with_store(
            "jobs",
            StoreConfig::new("files").with_option("path", dir.path().to_str().unwrap()),
        ));

        let emails = manager.get_store("jobs.emails").unwrap();
        let sms = manager.get_store("jobs.sms").unwrap();
        assert!(!Arc::ptr_eq(&emails, &sms));
        assert_eq!(manager.store_names(), vec!["jobs.emails", "jobs.sms"]);

        emails.set("k", json!(1)).unwrap();
        assert_eq!(sms.get("k").unwrap(), None);
        assert!(dir.path().join("jobs.emails").is_dir());
        assert!(dir.path().join("jobs.sms").is_dir());
    }

    #[test]
    fn initialize_does_not_reconfigure_existing_stores() {
        let (manager, tracker) = manager_with_tracker("tracker");
        let before = manager.get_store("users").unwrap();

        manager.initialize(ManagerConfig::new().with_store(WILDCARD, StoreConfig::new("tracker")));
        let after = manager.get_store("users").unwrap();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(tracker.built.load(Ordering::SeqCst), 0);

        manager.get_store("orders").unwrap();
        assert_eq!(tracker.built.load(Ordering::SeqCst), 1);
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    #[test]
    fn registration_overrides_builtin() {
        let (manager, tracker) = manager_with_tracker("memory");
        assert!(manager.is_registered("memory"));
        manager.get_store("anything").unwrap();
        assert_eq!(tracker.built.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn registered_store_lookup() {
        let manager = StoreManager::new();
        assert!(manager.registered_store("files").is_some());
        assert!(manager.registered_store("bogus").is_none());
        assert_eq!(manager.registered_types(), vec!["files", "memory"]);
    }

    #[test]
    fn custom_registry_without_builtins() {
        let manager = StoreManager::with_registry(BackendRegistry::empty());
        let err = manager.get_store("q").unwrap_err();
        assert!(matches!(
            err,
            ManagerError::UnregisteredBackend { ref store_type, .. } if store_type == "memory"
        ));
    }

    // -----------------------------------------------------------------------
    // Failures
    // -----------------------------------------------------------------------

    #[test]
    fn unregistered_type_fails_and_caches_nothing() {
        let manager = StoreManager::new();
        manager.initialize(ManagerConfig::new().with_store("broken", StoreConfig::new("bogus")));

        let err = manager.get_store("broken").unwrap_err();
        assert!(matches!(
            err,
            ManagerError::UnregisteredBackend { ref name, ref store_type }
                if name == "broken" && store_type == "bogus"
        ));
        assert!(!manager.has("broken"));
        assert!(manager.store_names().is_empty());
    }

    #[test]
    fn construct_failure_is_attributed() {
        let manager = StoreManager::new();
        manager.initialize(ManagerConfig::new().with_store(
            "jobs",
            StoreConfig::new("files").with_option("path", 12),
        ));

        let err = manager.get_store("jobs.sms").unwrap_err();
        assert_eq!(err.store_name(), Some("jobs.sms"));
        assert!(matches!(
            err,
            ManagerError::Construct {
                source: StoreError::InvalidOption { .. },
                ..
            }
        ));
        assert!(!manager.has("jobs.sms"));
    }

    #[test]
    fn connect_failure_is_not_cached_and_retries() {
        let (manager, tracker) = manager_with_tracker("memory");
        tracker.fail_connect.store(true, Ordering::SeqCst);

        let err = manager.get_store("flaky").unwrap_err();
        assert!(matches!(err, ManagerError::Connect { ref name, .. } if name == "flaky"));
        assert!(!manager.has("flaky"));

        tracker.fail_connect.store(false, Ordering::SeqCst);
        let store = manager.get_store("flaky").unwrap();
        assert!(store.is_connected());
        assert_eq!(tracker.built.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.connects.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn failed_names_leave_no_slots_behind() {
        let manager = StoreManager::new();
        manager.initialize(ManagerConfig::new().with_store(WILDCARD, StoreConfig::new("bogus")));

        for i in 0..100 {
            assert!(manager.get_store(&format!("missing.{i}")).is_err());
        }
        assert_eq!(manager.slots.lock().unwrap().len(), 0);
        assert!(manager.store_names().is_empty());
    }

    #[test]
    fn failed_attempt_does_not_strand_concurrent_callers() {
        let (manager, tracker) = manager_with_tracker("memory");
        tracker.fail_connect.store(true, Ordering::SeqCst);
        let manager = Arc::new(manager);
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = Arc::clone(&manager);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    manager.get_store("flaky").is_err()
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert_eq!(tracker.connects.load(Ordering::SeqCst), 8);
        assert!(manager.slots.lock().unwrap().is_empty());

        tracker.fail_connect.store(false, Ordering::SeqCst);
        assert!(manager.get_store("flaky").unwrap().is_connected());
    }

    #[test]
    fn panicking_factory_does_not_break_has_or_close() {
        let manager = StoreManager::new();
        manager.register_store("explosive", |_: StoreOptions| -> StoreResult<Arc<dyn Store>> {
            panic!("factory blew up")
        });
        manager.initialize(ManagerConfig::new().with_store("bad", StoreConfig::new("explosive")));

        let good = manager.get_store("good").unwrap();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| manager.get_store("bad")));
        assert!(outcome.is_err());

        assert!(!manager.has("bad"));
        assert!(manager.has("good"));
        assert_eq!(manager.store_names(), vec!["good"]);
        manager.close().unwrap();
        assert!(!good.is_connected());
    }

    // -----------------------------------------------------------------------
    // Shutdown
    // -----------------------------------------------------------------------

    #[test]
    fn close_attempts_every_store_and_reports_failures() {
        let (manager, tracker) = manager_with_tracker("tracker");
        manager.initialize(
            ManagerConfig::new()
                .with_store(WILDCARD, StoreConfig::new("tracker"))
                .with_store("bad", StoreConfig::new("tracker").with_option("fail_close", true)),
        );
        for name in ["good.one", "bad", "good.two"] {
            manager.get_store(name).unwrap();
        }

        let err = manager.close().unwrap_err();
        assert_eq!(tracker.closes.load(Ordering::SeqCst), 3);
        match err {
            ManagerError::Close { failures } => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].name, "bad");
            }
            other => panic!("expected close error, got {other:?}"),
        }
    }

    #[test]
    fn close_keeps_cache_but_disconnects() {
        let manager = StoreManager::new();
        let store = manager.get_store("users").unwrap();
        manager.close().unwrap();

        assert!(manager.has("users"));
        assert!(!store.is_connected());
        let again = manager.get_store("users").unwrap();
        assert!(Arc::ptr_eq(&store, &again));
        assert!(matches!(
            again.get("k").unwrap_err(),
            StoreError::NotConnected { .. }
        ));
    }

    #[test]
    fn close_with_no_stores_is_ok() {
        StoreManager::new().close().unwrap();
    }

    #[test]
    fn debug_lists_types_and_stores() {
        let manager = StoreManager::new();
        manager.create("a").unwrap();
        let debug = format!("{manager:?}");
        assert!(debug.contains("StoreManager"));
        assert!(debug.contains("\"a\""));
    }
}
