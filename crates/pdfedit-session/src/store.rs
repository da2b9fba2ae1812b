//! Durable key-value storage
//!
//! Records live in one of three partitions. A rejected or failed `put`
//! leaves the previous value for that key readable.

use crate::error::PersistError;
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    Sessions,
    Markers,
    Handoff,
}

impl Partition {
    pub const ALL: [Partition; 3] = [Partition::Sessions, Partition::Markers, Partition::Handoff];

    fn dir_name(self) -> &'static str {
        match self {
            Partition::Sessions => "sessions",
            Partition::Markers => "markers",
            Partition::Handoff => "handoff",
        }
    }
}

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, partition: Partition, key: &str) -> Result<Option<Vec<u8>>, PersistError>;

    /// Write `value`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// `QuotaExceeded` when the write would push the store past its
    /// capacity; the previous value is untouched in that case.
    async fn put(&self, partition: Partition, key: &str, value: Vec<u8>) -> Result<(), PersistError>;

    /// Remove a key; removing a missing key is not an error
    async fn delete(&self, partition: Partition, key: &str) -> Result<(), PersistError>;
}

fn check_capacity(capacity: Option<u64>, used: u64, old: u64, size: u64) -> Result<(), PersistError> {
    let Some(capacity) = capacity else {
        return Ok(());
    };
    let used = used.saturating_sub(old);
    if used.saturating_add(size) > capacity {
        return Err(PersistError::QuotaExceeded {
            size,
            used,
            capacity,
        });
    }
    Ok(())
}

/// In-process store, mostly for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryStore {
    capacity: Option<u64>,
    records: Mutex<HashMap<(Partition, String), Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: u64) -> Self {
        Self {
            capacity: Some(capacity),
            records: Mutex::default(),
        }
    }

    /// Total bytes currently stored
    pub async fn used(&self) -> u64 {
        self.records.lock().await.values().map(|v| v.len() as u64).sum()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, partition: Partition, key: &str) -> Result<Option<Vec<u8>>, PersistError> {
        let records = self.records.lock().await;
        Ok(records.get(&(partition, key.to_string())).cloned())
    }

    async fn put(&self, partition: Partition, key: &str, value: Vec<u8>) -> Result<(), PersistError> {
        let mut records = self.records.lock().await;
        let slot = (partition, key.to_string());
        let used = records.values().map(|v| v.len() as u64).sum();
        let old = records.get(&slot).map_or(0, |v| v.len() as u64);
        check_capacity(self.capacity, used, old, value.len() as u64)?;
        records.insert(slot, value);
        Ok(())
    }

    async fn delete(&self, partition: Partition, key: &str) -> Result<(), PersistError> {
        self.records.lock().await.remove(&(partition, key.to_string()));
        Ok(())
    }
}

/// Directory-backed store: `<root>/<partition>/<encoded key>`.
///
/// Values are written to a temporary file and synced before the rename.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    capacity: Option<u64>,
    // Serializes writers so capacity checks see a stable total
    write_lock: Mutex<()>,
}

impl FileStore {
    pub async fn open(root: impl Into<PathBuf>, capacity: Option<u64>) -> Result<Self, PersistError> {
        let root = root.into();
        for partition in Partition::ALL {
            fs::create_dir_all(root.join(partition.dir_name())).await?;
        }
        debug!(root = %root.display(), ?capacity, "Opened file store");
        Ok(Self {
            root,
            capacity,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, partition: Partition, key: &str) -> PathBuf {
        self.root
            .join(partition.dir_name())
            .join(URL_SAFE_NO_PAD.encode(key.as_bytes()))
    }

    async fn used(&self) -> Result<u64, PersistError> {
        let mut total = 0;
        for partition in Partition::ALL {
            let mut entries = fs::read_dir(self.root.join(partition.dir_name())).await?;
            while let Some(entry) = entries.next_entry().await? {
                if entry.path().extension().is_some_and(|e| e == "tmp") {
                    continue;
                }
                total += entry.metadata().await?.len();
            }
        }
        Ok(total)
    }
}

async fn file_len(path: &Path) -> Result<u64, PersistError> {
    match fs::metadata(path).await {
        Ok(meta) => Ok(meta.len()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e.into()),
    }
}

/// Write `value` and flush it to disk before returning
async fn write_synced(path: &Path, value: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(value).await?;
    file.sync_all().await
}

/// Persist a rename by syncing its directory; best effort, unix only
async fn sync_dir(dir: Option<&Path>) {
    let Some(dir) = dir.filter(|_| cfg!(unix)) else {
        return;
    };
    let synced = match fs::File::open(dir).await {
        Ok(handle) => handle.sync_all().await,
        Err(e) => Err(e),
    };
    if let Err(e) = synced {
        debug!(dir = %dir.display(), error = %e, "Directory sync failed");
    }
}

#[async_trait]
impl KvStore for FileStore {
    async fn get(&self, partition: Partition, key: &str) -> Result<Option<Vec<u8>>, PersistError> {
        match fs::read(self.path(partition, key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, partition: Partition, key: &str, value: Vec<u8>) -> Result<(), PersistError> {
        let _guard = self.write_lock.lock().await;
        let path = self.path(partition, key);
        if self.capacity.is_some() {
            let used = self.used().await?;
            let old = file_len(&path).await?;
            check_capacity(self.capacity, used, old, value.len() as u64)?;
        }

        let temp_path = path.with_extension("tmp");
        if let Err(e) = write_synced(&temp_path, &value).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        fs::rename(&temp_path, &path).await?;
        sync_dir(path.parent()).await;
        Ok(())
    }

    async fn delete(&self, partition: Partition, key: &str) -> Result<(), PersistError> {
        match fs::remove_file(self.path(partition, key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
