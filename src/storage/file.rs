//! File-backed shared store
//!
//! Each region lives in `<root>/<name>.region` and is replaced atomically by
//! writing a temp file in the same directory and renaming it over the old
//! blob. The exclusive region lock is a `<name>.lock` file created with
//! create-new semantics and stamped with the holder's identity, so separate
//! processes pointing at the same directory exclude each other.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::{LockMode, SharedStore};
use crate::error::StoreError;

/// Delay between attempts when waiting on a held lock.
const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(10);

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(0);

// == File Store ==
/// Directory-backed store shared by every process that opens the same root.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    holder: String,
    held: Mutex<HashSet<String>>,
}

impl FileStore {
    /// Opens (creating if needed) a store rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;

        info!("Opened file store at {:?}", root);
        Ok(Self::attach(root))
    }

    /// Opens another handle onto the same directory with its own lock identity.
    pub fn connect(&self) -> Self {
        Self::attach(self.root.clone())
    }

    fn attach(root: PathBuf) -> Self {
        let handle = NEXT_HANDLE.fetch_add(1, Ordering::Relaxed);
        Self {
            root,
            holder: format!("{}-{}", process::id(), handle),
            held: Mutex::new(HashSet::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn checked_name<'a>(&self, name: &'a str) -> Result<&'a str, StoreError> {
        let valid = !name.is_empty()
            && !name.starts_with('.')
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if valid {
            Ok(name)
        } else {
            Err(StoreError::Backend(format!("Invalid region name: {:?}", name)))
        }
    }

    fn blob_path(&self, name: &str) -> Result<PathBuf, StoreError> {
        Ok(self.root.join(format!("{}.region", self.checked_name(name)?)))
    }

    fn lock_path(&self, name: &str) -> Result<PathBuf, StoreError> {
        Ok(self.root.join(format!("{}.lock", self.checked_name(name)?)))
    }

    fn owns(&self, lock_path: &Path) -> Result<bool, StoreError> {
        match fs::read_to_string(lock_path) {
            Ok(owner) => Ok(owner == self.holder),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn release(&self, name: &str) -> Result<(), StoreError> {
        let path = self.lock_path(name)?;
        if self.owns(&path)? {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
            debug!("Handle {} unlocked region '{}'", self.holder, name);
        }
        Ok(())
    }
}

impl SharedStore for FileStore {
    fn exists(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.blob_path(name)?.try_exists()?)
    }

    fn get(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(self.blob_path(name)?) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, name: &str, blob: &[u8]) -> Result<(), StoreError> {
        let path = self.blob_path(name)?;

        // Temp file in the same directory so the rename stays atomic
        let temp_file = tempfile::NamedTempFile::new_in(&self.root)?;
        {
            let mut file = temp_file.as_file();
            file.write_all(blob)?;
            file.sync_all()?;
        }

        temp_file.persist(&path).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }

    fn lock(&self, name: &str, mode: LockMode, blocking: bool) -> Result<bool, StoreError> {
        if mode == LockMode::Shared {
            return Err(StoreError::Unsupported(
                "file store only grants exclusive locks".to_string(),
            ));
        }

        let path = self.lock_path(name)?;
        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(self.holder.as_bytes())?;
                    self.held.lock().insert(name.to_string());
                    debug!("Handle {} locked region '{}'", self.holder, name);
                    return Ok(true);
                }
                // Held, possibly by this same handle from another thread
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if !blocking {
                        return Ok(false);
                    }
                    thread::sleep(LOCK_POLL_INTERVAL);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn unlock(&self, name: &str) -> Result<(), StoreError> {
        self.release(name)?;
        self.held.lock().remove(name);
        Ok(())
    }
}

impl Drop for FileStore {
    fn drop(&mut self) {
        let held: Vec<String> = self.held.lock().drain().collect();
        for name in held {
            if let Err(e) = self.release(&name) {
                warn!("Failed to release lock on region '{}': {}", name, e);
            }
        }
    }
}
