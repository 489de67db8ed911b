//! Backend selection and lifecycle management for named key/value stores.
//!
//! Callers ask the [`StoreManager`] for a store by logical name. The manager
//! resolves the name against its [`ManagerConfig`], looks the backend type up
//! in its [`BackendRegistry`], builds and connects the store, and caches it
//! so every later request for that name gets the same instance.
//!
//! # Resolution
//!
//! Names may be dotted (`jobs.emails`). The text before the first dot is the
//! name's main segment, which lets one configuration entry cover a whole
//! namespace. For a name the first hit wins, in this order:
//!
//! 1. the exact name
//! 2. the main segment
//! 3. the wildcard key `"*"`
//! 4. `{ type = "memory" }`
//!
//! # Modules
//!
//! - [`config`] — [`ManagerConfig`], [`StoreConfig`], and name resolution
//! - [`registry`] — [`BackendRegistry`] and the [`StoreFactory`] trait
//! - [`manager`] — the [`StoreManager`] facade
//! - [`error`] — [`ManagerError`]

pub mod config;
pub mod error;
pub mod manager;
pub mod registry;

pub use config::{main_segment, ConfigMatch, ManagerConfig, ResolvedStore, StoreConfig, WILDCARD};
pub use error::{CloseFailure, ManagerError, ManagerResult};
pub use manager::StoreManager;
pub use registry::{BackendRegistry, StoreFactory};

// Re-export the store contract so hosts need only one dependency.
pub use storehouse_store::{
    FileStore, MemoryStore, Store, StoreError, StoreOptions, StoreResult,
};
