//! Subscribers allowed to use the monitor
//!
//! The first entry is the administrator.

use super::json_file::JsonFile;
use crate::domain::{Result, SubscriberId};
use std::path::PathBuf;

pub struct UserStore {
    file: JsonFile<Vec<SubscriberId>>,
}

impl UserStore {
    pub fn new(path: impl Into<PathBuf>, fallback_dir: Option<PathBuf>) -> Self {
        Self {
            file: JsonFile::new(path, fallback_dir),
        }
    }

    pub async fn all(&self) -> Result<Vec<SubscriberId>> {
        self.file.load().await
    }

    pub async fn is_authorized(&self, id: &SubscriberId) -> Result<bool> {
        Ok(self.all().await?.contains(id))
    }

    pub async fn is_admin(&self, id: &SubscriberId) -> Result<bool> {
        Ok(self.all().await?.first() == Some(id))
    }

    /// Adds a user; false if already present
    pub async fn add(&self, id: SubscriberId) -> Result<bool> {
        self.file
            .update(|users| {
                if users.contains(&id) {
                    return Ok(false);
                }
                users.push(id);
                Ok(true)
            })
            .await
    }

    /// Removes a user; false if absent
    pub async fn remove(&self, id: &SubscriberId) -> Result<bool> {
        self.file
            .update(|users| {
                let before = users.len();
                users.retain(|u| u != id);
                Ok(users.len() != before)
            })
            .await
    }
}
