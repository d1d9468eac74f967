//! Pretty-printed JSON document with wholesale read-modify-write
//!
//! Every store in this module is one [`JsonFile`]. The mutex serializes
//! read-modify-write cycles inside the process; other processes writing the
//! same file are last-writer-wins.

use crate::domain::{RecupError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

pub struct JsonFile<T> {
    path: PathBuf,
    fallback_dir: Option<PathBuf>,
    lock: Mutex<()>,
    _document: PhantomData<fn() -> T>,
}

impl<T> JsonFile<T>
where
    T: Serialize + DeserializeOwned + Default + Send + Sync,
{
    /// `fallback_dir` receives a copy under the same file name when writing
    /// the primary path fails
    pub fn new(path: impl Into<PathBuf>, fallback_dir: Option<PathBuf>) -> Self {
        Self {
            path: path.into(),
            fallback_dir,
            lock: Mutex::new(()),
            _document: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the document; a missing file is created with the default value
    pub async fn load(&self) -> Result<T> {
        let _guard = self.lock.lock().await;
        self.read_unlocked().await
    }

    /// Replaces the whole document
    pub async fn save(&self, value: &T) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.write_unlocked(value).await
    }

    /// Reads, applies `f` and writes back under one lock
    ///
    /// Nothing is written when `f` fails.
    pub async fn update<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut T) -> Result<R> + Send,
        R: Send,
    {
        let _guard = self.lock.lock().await;
        let mut value = self.read_unlocked().await?;
        let result = f(&mut value)?;
        self.write_unlocked(&value).await?;
        Ok(result)
    }

    async fn read_unlocked(&self) -> Result<T> {
        if !tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            tracing::info!(path = %self.path.display(), "Creating missing data file");
            let value = T::default();
            self.write_unlocked(&value).await?;
            return Ok(value);
        }

        let text = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            RecupError::Io(format!("Failed to read {}: {e}", self.path.display()))
        })?;
        if text.trim().is_empty() {
            return Ok(T::default());
        }

        serde_json::from_str(&text).map_err(|e| {
            RecupError::Serialization(format!("Invalid JSON in {}: {e}", self.path.display()))
        })
    }

    async fn write_unlocked(&self, value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;

        let primary_error = match write_file(&self.path, &json).await {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        let fallback = self.fallback_path().ok_or_else(|| {
            RecupError::Persistence(format!(
                "Failed to write {}: {primary_error}",
                self.path.display()
            ))
        })?;

        tracing::warn!(
            path = %self.path.display(),
            fallback = %fallback.display(),
            error = %primary_error,
            "Primary write failed, using fallback location"
        );

        write_file(&fallback, &json).await.map_err(|e| {
            RecupError::Persistence(format!(
                "Failed to write {} ({primary_error}) and fallback {} ({e})",
                self.path.display(),
                fallback.display()
            ))
        })
    }

    fn fallback_path(&self) -> Option<PathBuf> {
        let dir = self.fallback_dir.as_ref()?;
        let name = self.path.file_name()?;
        let candidate = dir.join(name);
        (candidate != self.path).then_some(candidate)
    }
}

async fn write_file(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, contents).await
}
