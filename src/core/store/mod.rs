//! Local JSON persistence
//!
//! Each store owns one file and performs wholesale read-modify-write under a
//! mutex. Stores are shared between workflows through `Arc` handles.
//!
//! - [`SubscriptionStore`] - watched prescriptions and their bookings
//! - [`SnapshotStore`] - availability seen by the previous poll
//! - [`UserStore`] - authorized subscribers, first one is the administrator
//! - [`TransactionJournal`] - progress of booking attempts past the slot lock

pub mod journal;
pub mod json_file;
pub mod snapshots;
pub mod subscriptions;
pub mod users;

pub use journal::{JournalEntry, TransactionJournal, TransactionStatus};
pub use json_file::JsonFile;
pub use snapshots::SnapshotStore;
pub use subscriptions::SubscriptionStore;
pub use users::UserStore;

use crate::config::StorageConfig;
use std::path::PathBuf;
use std::sync::Arc;

/// All stores, opened from the storage configuration
#[derive(Clone)]
pub struct Stores {
    pub subscriptions: Arc<SubscriptionStore>,
    pub snapshots: Arc<SnapshotStore>,
    pub users: Arc<UserStore>,
    pub journal: Arc<TransactionJournal>,
}

impl Stores {
    pub fn open(config: &StorageConfig) -> Self {
        let fallback = fallback_dir(config);
        Self {
            subscriptions: Arc::new(SubscriptionStore::new(
                &config.subscriptions_file,
                fallback.clone(),
            )),
            snapshots: Arc::new(SnapshotStore::new(&config.snapshots_file, fallback.clone())),
            users: Arc::new(UserStore::new(&config.users_file, fallback.clone())),
            journal: Arc::new(TransactionJournal::new(&config.journal_file, fallback)),
        }
    }
}

/// `storage.fallback_dir`, or the home directory when unset
pub fn fallback_dir(config: &StorageConfig) -> Option<PathBuf> {
    config
        .fallback_dir
        .as_ref()
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
}
