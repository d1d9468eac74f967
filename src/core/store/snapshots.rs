//! Last-seen availability per subscription

use super::json_file::JsonFile;
use crate::domain::{AvailabilitySlot, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// `subscription key → slots` from the previous poll
pub struct SnapshotStore {
    file: JsonFile<BTreeMap<String, Vec<AvailabilitySlot>>>,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>, fallback_dir: Option<PathBuf>) -> Self {
        Self {
            file: JsonFile::new(path, fallback_dir),
        }
    }

    /// Previous slots; empty when the subscription was never polled
    pub async fn get(&self, key: &str) -> Result<Vec<AvailabilitySlot>> {
        Ok(self.file.load().await?.remove(key).unwrap_or_default())
    }

    /// Replaces the slots stored for `key`
    pub async fn put(&self, key: &str, slots: Vec<AvailabilitySlot>) -> Result<()> {
        self.file
            .update(|map| {
                map.insert(key.to_string(), slots);
                Ok(())
            })
            .await
    }

    pub async fn remove(&self, key: &str) -> Result<bool> {
        self.file.update(|map| Ok(map.remove(key).is_some())).await
    }
}
