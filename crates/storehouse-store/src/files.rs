//! Filesystem-backed store.
//!
//! Each store owns one directory, `<path>/<name>`, holding one JSON document
//! per key. File names are the hex encoding of the key behind a fixed prefix,
//! so arbitrary keys (slashes, dots, unicode, the empty string) map to safe,
//! reversible file names:
//!
//! ```text
//! <path>/<name>/
//!     k-757365723a31.json    # key "user:1"
//!     k-757365723a32.json    # key "user:2"
//!     k-.json                # key ""
//! ```
//!
//! Writes go to a temporary sibling file which is then renamed over the
//! target, so readers never observe a half-written value.
//!
//! A store name must be a single path component (no separators, no `.` or
//! `..`) so every store stays inside its root. Keys are limited to
//! [`MAX_KEY_LEN`] bytes so the hex file name fits in 255 bytes; `set`
//! rejects longer keys with [`StoreError::KeyTooLong`].

use std::fs::{self, File};
use std::io::{self, BufReader, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::options::StoreOptions;
use crate::traits::Store;

/// Option naming the root directory under which store directories are created.
pub const PATH_OPTION: &str = "path";

/// Root directory used when no `path` option is configured.
pub const DEFAULT_ROOT: &str = "data";

const ENTRY_PREFIX: &str = "k-";
const ENTRY_EXTENSION: &str = "json";
const TEMP_EXTENSION: &str = "tmp";

/// Longest key, in bytes, whose entry file name fits the common 255-byte limit.
pub const MAX_KEY_LEN: usize = (255 - ENTRY_PREFIX.len() - ENTRY_EXTENSION.len() - 1) / 2;

/// Why `name` cannot be used as a store directory, if it cannot.
fn invalid_name_reason(name: &str) -> Option<&'static str> {
    if name.is_empty() {
        return Some("file stores need a non-empty name");
    }
    if name.contains(['/', '\\']) {
        return Some("file store names must not contain path separators");
    }
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => None,
        _ => Some("file store names must be a single plain path component"),
    }
}

/// Filesystem-backed key/value store.
///
/// Data survives `close()` and is visible again to any `FileStore` opened on
/// the same directory.
pub struct FileStore {
    name: String,
    dir: PathBuf,
    connected: AtomicBool,
    /// Serializes writers so temp files never collide.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Type tag under which this backend is registered.
    pub const TYPE: &'static str = "files";

    /// Create an unconnected store rooted at `root/<name>`.
    ///
    /// Fails with [`StoreError::InvalidOption`] if `name` would not resolve
    /// to a directory directly under `root`.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> StoreResult<Self> {
        let name = name.into();
        if let Some(reason) = invalid_name_reason(&name) {
            return Err(StoreError::InvalidOption {
                name,
                option: "name".into(),
                reason: reason.into(),
            });
        }
        let dir = root.as_ref().join(&name);
        Ok(Self {
            name,
            dir,
            connected: AtomicBool::new(false),
            write_lock: Mutex::new(()),
        })
    }

    /// Factory entry point used by the backend registry.
    ///
    /// Reads the optional `path` option (default [`DEFAULT_ROOT`]).
    pub fn from_options(options: StoreOptions) -> StoreResult<Arc<dyn Store>> {
        let root = options.get_str(PATH_OPTION)?.unwrap_or(DEFAULT_ROOT);
        Ok(Arc::new(Self::new(options.name(), root)?))
    }

    /// Directory holding this store's entries.
    pub fn dir(&self) -> &Path {
        &self.dir
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

    /// Take the write lock, then check the store is still open. Checking
    /// under the lock means no write can land after `close()` returns.
    fn lock_writes(&self) -> StoreResult<MutexGuard<'_, ()>> {
        let guard = self.write_lock.lock().expect("write lock poisoned");
        self.ensure_connected()?;
        Ok(guard)
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{ENTRY_PREFIX}{}.{ENTRY_EXTENSION}", hex::encode(key.as_bytes())))
    }

    /// Decode a file name back into its key, skipping anything we did not write.
    fn key_from_path(path: &Path) -> Option<String> {
        if path.extension()? != ENTRY_EXTENSION {
            return None;
        }
        let stem = path.file_stem()?.to_str()?.strip_prefix(ENTRY_PREFIX)?;
        let bytes = hex::decode(stem).ok()?;
        String::from_utf8(bytes).ok()
    }

    fn entry_paths(&self) -> StoreResult<Vec<(String, PathBuf)>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            match Self::key_from_path(&path) {
                Some(key) => entries.push((key, path)),
                None => {
                    if path.extension().map(|e| e != TEMP_EXTENSION).unwrap_or(true) {
                        warn!(store = %self.name, path = ?path, "ignoring foreign file in store directory");
                    }
                }
            }
        }
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));
        Ok(entries)
    }
}

impl Store for FileStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn connect(&self) -> StoreResult<()> {
        fs::create_dir_all(&self.dir)?;
        self.connected.store(true, Ordering::Release);
        debug!(store = %self.name, dir = ?self.dir, "file store connected");
        Ok(())
    }

    fn close(&self) -> StoreResult<()> {
        // Wait for any in-flight write before reporting closed.
        let _guard = self.write_lock.lock().expect("write lock poisoned");
        if self.connected.swap(false, Ordering::AcqRel) {
            debug!(store = %self.name, "file store closed");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        self.ensure_connected()?;
        if key.len() > MAX_KEY_LEN {
            return Ok(None);
        }
        let file = match File::open(self.entry_path(key)) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let value = serde_json::from_reader(BufReader::new(file))?;
        Ok(Some(value))
    }

    fn set(&self, key: &str, value: Value) -> StoreResult<()> {
        self.ensure_connected()?;
        if key.len() > MAX_KEY_LEN {
            return Err(StoreError::KeyTooLong {
                name: self.name.clone(),
                len: key.len(),
                max: MAX_KEY_LEN,
            });
        }
        let payload = serde_json::to_vec(&value)?;
        let target = self.entry_path(key);
        let temp = target.with_extension(TEMP_EXTENSION);

        let _guard = self.lock_writes()?;
        let mut file = File::create(&temp)?;
        file.write_all(&payload)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&temp, &target)?;

        debug!(store = %self.name, key, len = payload.len(), "file store write");
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        let _guard = self.lock_writes()?;
        if key.len() > MAX_KEY_LEN {
            return Ok(false);
        }
        match fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        self.ensure_connected()?;
        Ok(self.entry_paths()?.into_iter().map(|(key, _)| key).collect())
    }

    fn clear(&self) -> StoreResult<()> {
        let _guard = self.lock_writes()?;
        for (_, path) in self.entry_paths()? {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    fn contains(&self, key: &str) -> StoreResult<bool> {
        self.ensure_connected()?;
        Ok(key.len() <= MAX_KEY_LEN && self.entry_path(key).is_file())
    }
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore")
            .field("name", &self.name)
            .field("dir", &self.dir)
            .field("connected", &self.is_connected())
            .finish()
    }
}
