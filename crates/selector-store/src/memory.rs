//! DashMap-backed store with optional JSON file persistence

use async_trait::async_trait;
use dashmap::DashMap;
use fs2::FileExt;
use healwright_core_types::ElementKey;
use parking_lot::Mutex;
use serde_json::Value;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::{
    errors::StoreError,
    model::{Discovery, PersistedElement},
    SelectorStore,
};

/// In-process selector store.
///
/// Without a storage path it lives only as long as the process. With one,
/// every mutation takes an exclusive lock on `<path>.lock`, reloads the file,
/// applies the change to the fresh copy and rewrites the whole file, so
/// several processes can share one file without losing each other's records.
/// Reads are served from the copy refreshed by the last load or mutation.
#[derive(Default)]
pub struct MemorySelectorStore {
    inner: DashMap<String, PersistedElement>,
    storage_path: Option<PathBuf>,
    write_lock: Mutex<()>,
}

/// Advisory lock held for one read-modify-write of the JSON file
struct FileLock {
    file: File,
}

impl FileLock {
    fn acquire(path: &Path) -> Result<Self, StoreError> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(lock_path(path))?;
        file.lock_exclusive()?;
        Ok(Self { file })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".lock");
    PathBuf::from(name)
}

fn read_records(path: &Path) -> Result<Vec<PersistedElement>, StoreError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let bytes = fs::read(path)?;
    if bytes.is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_slice(&bytes)?)
}

impl MemorySelectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load records from `path` if it exists; later mutations are written back to it
    pub fn with_persistence(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let store = Self {
            inner: DashMap::new(),
            storage_path: Some(path.clone()),
            write_lock: Mutex::new(()),
        };

        if path.exists() {
            store.replace_all(read_records(&path)?);
            info!(path = %path.display(), records = store.inner.len(), "Loaded selector store");
        }

        Ok(store)
    }

    pub fn storage_path(&self) -> Option<&Path> {
        self.storage_path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn replace_all(&self, records: Vec<PersistedElement>) {
        self.inner.clear();
        for record in records {
            self.inner.insert(record.id.clone(), record);
        }
    }

    /// Apply `change` to the record stored under `id`.
    ///
    /// `change` sees the current record (`None` when absent) and leaves the
    /// slot holding the new record, or `None` to delete it.
    fn modify<T>(
        &self,
        id: &str,
        change: impl FnOnce(&mut Option<PersistedElement>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let _guard = self.write_lock.lock();
        let file_lock = match self.storage_path.as_deref() {
            Some(path) => {
                let lock = FileLock::acquire(path)?;
                self.replace_all(read_records(path)?);
                Some((path, lock))
            }
            None => None,
        };

        let mut slot = self.inner.get(id).map(|entry| entry.value().clone());
        let output = change(&mut slot)?;
        match slot {
            Some(record) => {
                self.inner.insert(id.to_string(), record);
            }
            None => {
                self.inner.remove(id);
            }
        }

        if let Some((path, _lock)) = file_lock {
            self.write_snapshot(path)?;
        }
        Ok(output)
    }

    fn write_snapshot(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut records: Vec<PersistedElement> =
            self.inner.iter().map(|entry| entry.value().clone()).collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        let json = serde_json::to_vec_pretty(&records)?;

        // write-then-rename so a crash never leaves a truncated file
        let mut tmp = path.as_os_str().to_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        debug!(path = %path.display(), records = records.len(), "Persisted selector store");
        Ok(())
    }
}

#[async_trait]
impl SelectorStore for MemorySelectorStore {
    async fn get(&self, key: &ElementKey) -> Result<Option<PersistedElement>, StoreError> {
        Ok(self.inner.get(&key.id()).map(|entry| entry.value().clone()))
    }

    async fn upsert(
        &self,
        key: &ElementKey,
        working_locator: &str,
        metadata: Option<Value>,
    ) -> Result<PersistedElement, StoreError> {
        self.modify(&key.id(), |slot| {
            let record = match slot.take() {
                Some(mut record) => {
                    record.promote(working_locator, metadata)?;
                    record
                }
                None => PersistedElement::first_proven(key, working_locator, metadata)?,
            };
            *slot = Some(record.clone());
            Ok(record)
        })
    }

    async fn record_discovery(
        &self,
        key: &ElementKey,
        discovery: Discovery,
    ) -> Result<PersistedElement, StoreError> {
        self.modify(&key.id(), |slot| {
            let mut record = slot.take().unwrap_or_else(|| PersistedElement::unproven(key));
            record.apply_discovery(discovery);
            *slot = Some(record.clone());
            Ok(record)
        })
    }

    async fn list(&self, scope: Option<&str>) -> Result<Vec<PersistedElement>, StoreError> {
        let mut records: Vec<PersistedElement> = self
            .inner
            .iter()
            .filter(|entry| scope.map_or(true, |scope| entry.value().scope() == scope))
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }

    async fn remove(&self, key: &ElementKey) -> Result<bool, StoreError> {
        self.modify(&key.id(), |slot| Ok(slot.take().is_some()))
    }
}
