//! Key/value store capability contract and built-in backends.
//!
//! Every store handed out by the store manager implements [`Store`]: a named
//! key/value map with an explicit `connect`/`close` lifecycle. Values are
//! arbitrary JSON documents.
//!
//! # Storage Backends
//!
//! - [`MemoryStore`] -- `HashMap`-based store, registered as `"memory"`
//! - [`FileStore`] -- one JSON file per key under `<path>/<name>`,
//!   registered as `"files"`
//!
//! Backends are built from [`StoreOptions`]: the configured options for the
//! store with its full logical name injected under `name`.
//!
//! # Design Rules
//!
//! 1. A store's name is fixed at construction.
//! 2. Data-plane calls on a built-in backend fail with
//!    [`StoreError::NotConnected`] outside `connect()`..`close()`.
//! 3. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod files;
pub mod memory;
pub mod options;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{StoreError, StoreResult};
pub use files::FileStore;
pub use memory::MemoryStore;
pub use options::{StoreOptions, NAME_OPTION};
pub use traits::Store;
