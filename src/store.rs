//! Flat JSON-array files used by the agents for persistence.
//!
//! Each file holds a single JSON array. Reads are forgiving: a missing or
//! corrupt file reads as an empty list, the same way a fresh install looks.
//! Writes go through one mutex per store so a read-modify-write never
//! interleaves with another writer in this process.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Store lock poisoned")]
    Poisoned,
}

pub struct JsonListStore<T> {
    path: PathBuf,
    lock: Mutex<()>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonListStore<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the file (and its directory) holding `[]` if it does not exist yet
    pub fn ensure_exists(&self) -> Result<(), StoreError> {
        let _guard = self.guard()?;
        if self.path.exists() {
            return Ok(());
        }
        self.write_unlocked(&[])
    }

    /// Every record in file order; empty when the file is missing or unreadable
    pub fn load_all(&self) -> Vec<T> {
        match self.guard() {
            Ok(_guard) => self.read_unlocked(),
            Err(_) => Vec::new(),
        }
    }

    pub fn append(&self, record: T) -> Result<(), StoreError> {
        let _guard = self.guard()?;
        let mut records = self.read_unlocked();
        records.push(record);
        self.write_unlocked(&records)
    }

    /// Apply `f` to the first record matching `predicate` and persist the result.
    ///
    /// Returns `Ok(None)` when nothing matched; the file is left untouched then.
    pub fn update<P, F, R>(&self, predicate: P, f: F) -> Result<Option<R>, StoreError>
    where
        P: Fn(&T) -> bool,
        F: FnOnce(&mut T) -> R,
    {
        let _guard = self.guard()?;
        let mut records = self.read_unlocked();
        let Some(record) = records.iter_mut().find(|r| predicate(r)) else {
            return Ok(None);
        };
        let outcome = f(record);
        self.write_unlocked(&records)?;
        Ok(Some(outcome))
    }

    pub fn replace_all(&self, records: &[T]) -> Result<(), StoreError> {
        let _guard = self.guard()?;
        self.write_unlocked(records)
    }

    fn guard(&self) -> Result<MutexGuard<'_, ()>, StoreError> {
        self.lock.lock().map_err(|_| StoreError::Poisoned)
    }

    fn read_unlocked(&self) -> Vec<T> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => return Vec::new(),
        };
        match serde_json::from_str(&raw) {
            Ok(records) => records,
            Err(e) => {
                log::warn!(
                    "⚠️  Ignoring unreadable store {}: {}",
                    self.path.display(),
                    e
                );
                Vec::new()
            }
        }
    }

    fn write_unlocked(&self, records: &[T]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                    path: parent.display().to_string(),
                    source,
                })?;
            }
        }
        let json = serde_json::to_string_pretty(records)?;
        fs::write(&self.path, json).map_err(|source| StoreError::Io {
            path: self.path.display().to_string(),
            source,
        })
    }
}
