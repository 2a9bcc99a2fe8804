//! JSON file store.
//!
//! The whole map lives in memory and is rewritten on every mutation through
//! a temp file in the same directory followed by a rename, so readers never
//! see a partially written file.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use super::{KeyValueStore, StoreError, StoreMap, select};

/// File-backed store holding a single JSON object.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    data: Mutex<StoreMap>,
}

impl JsonFileStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let data = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => StoreMap::new(),
            Ok(bytes) => match serde_json::from_slice::<serde_json::Value>(&bytes) {
                Ok(serde_json::Value::Object(map)) => map,
                Ok(_) => {
                    return Err(StoreError::Corrupt {
                        path: path.display().to_string(),
                        reason: "top-level value is not an object".to_string(),
                    });
                }
                Err(e) => {
                    return Err(StoreError::Corrupt {
                        path: path.display().to_string(),
                        reason: e.to_string(),
                    });
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreMap::new(),
            Err(e) => return Err(e.into()),
        };

        debug!(entries = data.len(), "Opened JSON file store");

        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `data` to disk. Called with the data lock held so writes land
    /// in mutation order.
    async fn persist(&self, data: &StoreMap) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(data)?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || write_atomically(&path, &bytes))
            .await
            .map_err(|e| StoreError::Persist(e.to_string()))?
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .map_err(|e| StoreError::Persist(e.error.to_string()))?;
    Ok(())
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, keys: &[&str]) -> Result<StoreMap, StoreError> {
        Ok(select(&*self.data.lock().await, keys))
    }

    async fn set(&self, items: StoreMap) -> Result<(), StoreError> {
        let mut data = self.data.lock().await;
        let mut next = data.clone();
        next.extend(items);
        self.persist(&next).await?;
        *data = next;
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        let mut data = self.data.lock().await;
        if !keys.iter().any(|k| data.contains_key(*k)) {
            return Ok(());
        }
        let mut next = data.clone();
        for key in keys {
            next.remove(*key);
        }
        self.persist(&next).await?;
        *data = next;
        Ok(())
    }
}
