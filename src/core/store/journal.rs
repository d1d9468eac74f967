//! Booking transaction journal
//!
//! One entry per subscription key records how far the last booking attempt
//! got once a slot lock was taken. Entries that never reached `Completed` are
//! surfaced to the operator as possibly locked but unconfirmed; nothing is
//! resumed from them.

use super::json_file::JsonFile;
use crate::domain::{AvailabilitySlot, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use uuid::Uuid;

/// Progress of a journaled booking attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Slot locked, not yet confirmed
    Prebooked,
    /// Booking confirmed, document step pending
    Confirmed,
    /// Sequence finished, with or without the document
    Completed,
    /// A step after the lock failed
    Failed,
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Prebooked => "prebooked",
            Self::Confirmed => "confirmed",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Journal record of one booking attempt
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use recup_monitor::core::store::{JournalEntry, TransactionStatus};
/// use recup_monitor::domain::AvailabilitySlot;
///
/// let slot = AvailabilitySlot {
///     date: Utc::now(),
///     hospital_id: "H1".to_string(),
///     hospital_name: "Hospital".to_string(),
///     site_address: "Via Roma 1".to_string(),
///     price: None,
///     diary_id: "D1".to_string(),
/// };
/// let mut entry = JournalEntry::prebooked("KEY", "LOCK-1", &slot);
/// assert!(entry.is_unresolved());
///
/// entry.mark_confirmed("B-1");
/// entry.mark_completed();
/// assert_eq!(entry.status, TransactionStatus::Completed);
/// assert!(!entry.is_unresolved());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub transaction_id: Uuid,

    /// Format: "{fiscal_code}_{nre}"
    pub subscription_key: String,

    pub lock_id: String,
    pub slot_date: DateTime<Utc>,
    pub diary_id: String,
    pub booking_id: Option<String>,
    pub status: TransactionStatus,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_error: Option<String>,
}

impl JournalEntry {
    /// Entry for a freshly taken lock
    pub fn prebooked(subscription_key: &str, lock_id: &str, slot: &AvailabilitySlot) -> Self {
        let now = Utc::now();
        Self {
            transaction_id: Uuid::new_v4(),
            subscription_key: subscription_key.to_string(),
            lock_id: lock_id.to_string(),
            slot_date: slot.date,
            diary_id: slot.diary_id.clone(),
            booking_id: None,
            status: TransactionStatus::Prebooked,
            started_at: now,
            updated_at: now,
            last_error: None,
        }
    }

    pub fn mark_confirmed(&mut self, booking_id: &str) {
        self.booking_id = Some(booking_id.to_string());
        self.status = TransactionStatus::Confirmed;
        self.updated_at = Utc::now();
    }

    pub fn mark_completed(&mut self) {
        self.status = TransactionStatus::Completed;
        self.updated_at = Utc::now();
    }

    pub fn mark_failed(&mut self, error: &str) {
        self.status = TransactionStatus::Failed;
        self.last_error = Some(error.to_string());
        self.updated_at = Utc::now();
    }

    /// Whether the attempt may have left a lock or booking nobody confirmed
    pub fn is_unresolved(&self) -> bool {
        self.status != TransactionStatus::Completed
    }
}

/// Journal persisted as `subscription key → entry`
pub struct TransactionJournal {
    file: JsonFile<BTreeMap<String, JournalEntry>>,
}

impl TransactionJournal {
    pub fn new(path: impl Into<PathBuf>, fallback_dir: Option<PathBuf>) -> Self {
        Self {
            file: JsonFile::new(path, fallback_dir),
        }
    }

    /// Starts a new entry for `key`, replacing any previous attempt
    pub async fn record_prebooked(
        &self,
        key: &str,
        lock_id: &str,
        slot: &AvailabilitySlot,
    ) -> Result<JournalEntry> {
        let entry = JournalEntry::prebooked(key, lock_id, slot);
        let stored = entry.clone();
        self.file
            .update(move |journal| {
                journal.insert(stored.subscription_key.clone(), stored);
                Ok(())
            })
            .await?;

        tracing::debug!(
            subscription = key,
            transaction_id = %entry.transaction_id,
            lock_id,
            "Journaled prebooking"
        );
        Ok(entry)
    }

    pub async fn mark_confirmed(&self, key: &str, booking_id: &str) -> Result<bool> {
        self.modify(key, |e| e.mark_confirmed(booking_id)).await
    }

    pub async fn mark_completed(&self, key: &str) -> Result<bool> {
        self.modify(key, JournalEntry::mark_completed).await
    }

    pub async fn mark_failed(&self, key: &str, error: &str) -> Result<bool> {
        self.modify(key, |e| e.mark_failed(error)).await
    }

    pub async fn get(&self, key: &str) -> Result<Option<JournalEntry>> {
        Ok(self.file.load().await?.remove(key))
    }

    /// Entries that never completed, oldest first
    pub async fn unresolved(&self) -> Result<Vec<JournalEntry>> {
        let mut entries: Vec<JournalEntry> = self
            .file
            .load()
            .await?
            .into_values()
            .filter(JournalEntry::is_unresolved)
            .collect();
        entries.sort_by_key(|e| e.started_at);
        Ok(entries)
    }

    /// Drops the entry for `key`
    pub async fn clear(&self, key: &str) -> Result<bool> {
        self.file.update(|journal| Ok(journal.remove(key).is_some())).await
    }

    async fn modify<F>(&self, key: &str, f: F) -> Result<bool>
    where
        F: FnOnce(&mut JournalEntry) + Send,
    {
        self.file
            .update(|journal| match journal.get_mut(key) {
                Some(entry) => {
                    f(entry);
                    Ok(true)
                }
                None => Ok(false),
            })
            .await
    }
}
