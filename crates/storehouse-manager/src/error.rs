//! Error types for store resolution and lifecycle management.

use std::fmt;

use storehouse_store::StoreError;
use thiserror::Error;

/// A single store that failed to close during manager shutdown.
#[derive(Debug)]
pub struct CloseFailure {
    /// Logical name of the store.
    pub name: String,
    /// The error returned by the store's `close()`.
    pub error: StoreError,
}

impl fmt::Display for CloseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.error)
    }
}

/// Errors produced by the store manager.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// The resolved configuration names a backend type nobody registered.
    #[error("store {name}: backend type `{store_type}` is not registered")]
    UnregisteredBackend { name: String, store_type: String },

    /// The backend factory failed to build the store.
    #[error("store {name}: failed to construct `{store_type}` backend: {source}")]
    Construct {
        name: String,
        store_type: String,
        #[source]
        source: StoreError,
    },

    /// The store was built but `connect()` failed. Nothing was cached.
    #[error("store {name}: `{store_type}` backend failed to connect: {source}")]
    Connect {
        name: String,
        store_type: String,
        #[source]
        source: StoreError,
    },

    /// One or more stores failed to close. Every store was still attempted.
    #[error("{} store(s) failed to close: {}", failures.len(), join_failures(failures))]
    Close { failures: Vec<CloseFailure> },

    /// The configuration document could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// I/O error while reading configuration.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ManagerError {
    /// Logical store name the error is about, if it concerns a single store.
    pub fn store_name(&self) -> Option<&str> {
        match self {
            Self::UnregisteredBackend { name, .. }
            | Self::Construct { name, .. }
            | Self::Connect { name, .. } => Some(name),
            Self::Close { .. } | Self::Config(_) | Self::Io(_) => None,
        }
    }
}

fn join_failures(failures: &[CloseFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Convenience alias used throughout the manager crate.
pub type ManagerResult<T> = std::result::Result<T, ManagerError>;
