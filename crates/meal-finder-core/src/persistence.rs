// SPDX-License-Identifier: AGPL-3.0
// Meal Finder Core - Key-value persistence backends
//
// The favorites store only needs string values under string keys.
// Backends make no promises across keys.

use crate::types::AppError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Asynchronous string key-value store
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value under `key`, `None` if it was never written
    async fn get(&self, key: &str) -> Result<Option<String>, AppError>;

    /// Replace the value under `key`
    async fn set(&self, key: &str, value: String) -> Result<(), AppError>;
}

/// Process-local store, used for tests and ephemeral sessions
#[derive(Default)]
pub struct MemoryKeyValueStore {
    values: Mutex<HashMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `get` fail
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `set` fail without storing anything
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Read without going through the async interface
    pub fn peek(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    /// Seed a value without counting it as a write
    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values.lock().unwrap().insert(key.into(), value.into());
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::Persistence(format!("read of {} refused", key)));
        }
        Ok(self.peek(key))
    }

    async fn set(&self, key: &str, value: String) -> Result<(), AppError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Persistence(format!("write of {} refused", key)));
        }
        self.values.lock().unwrap().insert(key.to_string(), value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// One file per key inside a data directory
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    /// Open a store rooted at `dir`, creating it if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, AppError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| AppError::FileIo(format!("Failed to create data dir: {}", e)))?;
        Ok(Self { dir })
    }

    /// Open the store in the platform data directory
    pub fn open_default() -> Result<Self, AppError> {
        let data_dir = directories::ProjectDirs::from("com", "mealfinder", "MealFinder")
            .ok_or_else(|| AppError::FileIo("Could not determine data directory".to_string()))?
            .data_dir()
            .join("store");
        tracing::info!("Data directory: {:?}", data_dir);
        Self::new(data_dir)
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, AppError> {
        let valid = !key.is_empty()
            && key != "."
            && key != ".."
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
        if !valid {
            return Err(AppError::InvalidConfig(format!("Invalid storage key: {:?}", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Persistence(format!(
                "Failed to read {}: {}",
                key, e
            ))),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<(), AppError> {
        let path = self.path_for(key)?;
        let tmp_path = path.with_extension("json.tmp");

        tokio::fs::write(&tmp_path, value)
            .await
            .map_err(|e| AppError::Persistence(format!("Failed to write {}: {}", key, e)))?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| AppError::Persistence(format!("Failed to replace {}: {}", key, e)))?;

        tracing::debug!("Wrote {:?}", path);
        Ok(())
    }
}
