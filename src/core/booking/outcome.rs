//! Inputs and results of the booking workflow

use super::state::BookingState;
use crate::domain::{AvailabilitySlot, BookingRecord, ContactInfo, RecupError};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Which slot to book
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotChoice {
    /// Only list the sorted slots, reserve nothing
    ListOnly,
    /// Book the slot at this index of the sorted list
    Index(i64),
}

impl From<i64> for SlotChoice {
    fn from(value: i64) -> Self {
        if value == -1 {
            SlotChoice::ListOnly
        } else {
            SlotChoice::Index(value)
        }
    }
}

impl FromStr for SlotChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "list" => Ok(SlotChoice::ListOnly),
            other => other
                .parse::<i64>()
                .map(SlotChoice::from)
                .map_err(|_| format!("Invalid slot choice '{other}': expected an index, -1 or 'list'")),
        }
    }
}

impl fmt::Display for SlotChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotChoice::ListOnly => write!(f, "list"),
            SlotChoice::Index(i) => write!(f, "{i}"),
        }
    }
}

/// Parameters of one booking attempt
#[derive(Debug, Clone)]
pub struct BookingRequest {
    /// Required to confirm a slot, unused for listing
    pub contact: Option<ContactInfo>,
    /// Skips the patient lookup when already known
    pub patient_id: Option<String>,
    /// Skips the doctor lookup when already known
    pub process_id: Option<String>,
    pub choice: SlotChoice,
}

impl BookingRequest {
    pub fn new(contact: ContactInfo, choice: SlotChoice) -> Self {
        Self {
            contact: Some(contact),
            patient_id: None,
            process_id: None,
            choice,
        }
    }

    /// Request that only lists the sorted slots
    pub fn list_only() -> Self {
        Self {
            contact: None,
            patient_id: None,
            process_id: None,
            choice: SlotChoice::ListOnly,
        }
    }

    /// Reuses the ids resolved by a previous list-only call
    pub fn resuming(contact: ContactInfo, list: &SlotList, choice: SlotChoice) -> Self {
        Self {
            contact: Some(contact),
            patient_id: Some(list.patient_id.clone()),
            process_id: Some(list.process_id.clone()),
            choice,
        }
    }
}

/// Sorted slots offered for interactive selection
#[derive(Debug, Clone, PartialEq)]
pub struct SlotList {
    pub slots: Vec<AvailabilitySlot>,
    pub patient_id: String,
    pub process_id: String,
    pub service_name: Option<String>,
}

/// Confirmation document, or why it is missing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentStatus {
    Retrieved { content: Vec<u8>, sha256: String },
    /// The booking stands; only the document could not be fetched
    Unavailable { reason: String },
}

impl DocumentStatus {
    pub fn retrieved(content: Vec<u8>) -> Self {
        let sha256 = format!("{:x}", Sha256::digest(&content));
        DocumentStatus::Retrieved { content, sha256 }
    }
}

/// A confirmed booking
#[derive(Debug, Clone, PartialEq)]
pub struct BookingConfirmation {
    pub booking_id: String,
    pub lock_id: String,
    pub slot: AvailabilitySlot,
    pub service_name: Option<String>,
    pub document: DocumentStatus,
    /// `Confirmed`, or `DocumentRetrieved` when the document came back
    pub state: BookingState,
}

impl BookingConfirmation {
    /// Record stored with the subscription
    pub fn record(&self) -> BookingRecord {
        BookingRecord {
            booking_id: self.booking_id.clone(),
            date: self.slot.date,
            hospital_name: self.slot.hospital_name.clone(),
            address: self.slot.site_address.clone(),
            service_name: self
                .service_name
                .clone()
                .unwrap_or_else(|| "Unknown service".to_string()),
        }
    }

    pub fn document(&self) -> Option<&[u8]> {
        match &self.document {
            DocumentStatus::Retrieved { content, .. } => Some(content),
            DocumentStatus::Unavailable { .. } => None,
        }
    }

    /// Attachment name used when sending the document to the subscriber
    pub fn document_filename(&self) -> String {
        format!("prenotazione_{}.pdf", self.booking_id)
    }

    /// Writes the document as `booking_{id}_{timestamp}.pdf` under `dir`
    ///
    /// Returns `None` when there is no document.
    pub async fn save_document(&self, dir: &Path) -> Result<Option<PathBuf>, RecupError> {
        let Some(content) = self.document() else {
            return Ok(None);
        };
        tokio::fs::create_dir_all(dir).await?;
        let name = format!(
            "booking_{}_{}.pdf",
            self.booking_id,
            Utc::now().format("%Y%m%d_%H%M%S")
        );
        let path = dir.join(name);
        tokio::fs::write(&path, content).await?;
        Ok(Some(path))
    }
}

/// Why a booking attempt stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingFailure {
    /// Last state reached before the failing step
    pub state: BookingState,

    /// Displayable explanation, with the remote text when there is one
    pub message: String,

    /// Lock that may still be held on the remote side
    pub lock_id: Option<String>,

    /// The failure was a network error, timeout or 5xx answer
    pub transient: bool,
}

impl BookingFailure {
    pub fn new(state: BookingState, message: impl Into<String>) -> Self {
        let lock_id = state.lock_id().map(str::to_string);
        Self {
            state,
            message: message.into(),
            lock_id,
            transient: false,
        }
    }

    /// Failure of a step, keeping the remote error text verbatim
    pub fn from_error(state: BookingState, step: &str, error: &RecupError) -> Self {
        let detail = match error.as_api() {
            Some(api) if !api.remote_message().is_empty() => api.remote_message().to_string(),
            _ => error.to_string(),
        };
        Self {
            transient: error.is_transient(),
            ..Self::new(state, format!("{step}: {detail}"))
        }
    }
}

impl fmt::Display for BookingFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(lock_id) = &self.lock_id {
            write!(f, " (slot lock {lock_id} may still be held)")?;
        }
        Ok(())
    }
}

/// Result of [`BookingDriver::book`](super::BookingDriver::book)
#[derive(Debug, Clone, PartialEq)]
pub enum BookingOutcome {
    SlotList(SlotList),
    Booked(BookingConfirmation),
    Failed(BookingFailure),
}

impl BookingOutcome {
    pub fn is_booked(&self) -> bool {
        matches!(self, BookingOutcome::Booked(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ApiError;
    use chrono::TimeZone;
    use tempfile::TempDir;
    use test_case::test_case;

    #[test_case("-1", SlotChoice::ListOnly ; "minus one lists")]
    #[test_case("list", SlotChoice::ListOnly ; "keyword lists")]
    #[test_case("3", SlotChoice::Index(3) ; "index")]
    #[test_case("-5", SlotChoice::Index(-5) ; "other negatives kept for clamping")]
    fn test_slot_choice_parse(input: &str, expected: SlotChoice) {
        assert_eq!(input.parse::<SlotChoice>().unwrap(), expected);
    }

    #[test]
    fn test_slot_choice_rejects_garbage() {
        assert!("first".parse::<SlotChoice>().is_err());
    }

    fn confirmation(document: DocumentStatus) -> BookingConfirmation {
        BookingConfirmation {
            booking_id: "B1".to_string(),
            lock_id: "L1".to_string(),
            slot: AvailabilitySlot {
                date: Utc.with_ymd_and_hms(2025, 6, 2, 10, 0, 0).unwrap(),
                hospital_id: "H1".to_string(),
                hospital_name: "Hospital".to_string(),
                site_address: "Via Roma 1".to_string(),
                price: Some(36.15),
                diary_id: "D1".to_string(),
            },
            service_name: None,
            document,
            state: BookingState::Confirmed {
                lock_id: "L1".to_string(),
                booking_id: "B1".to_string(),
            },
        }
    }

    #[test]
    fn test_document_digest() {
        let status = DocumentStatus::retrieved(b"abc".to_vec());
        match status {
            DocumentStatus::Retrieved { sha256, .. } => assert_eq!(
                sha256,
                "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
            ),
            DocumentStatus::Unavailable { .. } => panic!("expected document"),
        }
    }

    #[test]
    fn test_record_from_confirmation() {
        let record = confirmation(DocumentStatus::retrieved(vec![1])).record();
        assert_eq!(record.booking_id, "B1");
        assert_eq!(record.address, "Via Roma 1");
        assert_eq!(record.service_name, "Unknown service");
    }

    #[tokio::test]
    async fn test_save_document() {
        let dir = TempDir::new().unwrap();
        let saved = confirmation(DocumentStatus::retrieved(b"%PDF".to_vec()))
            .save_document(dir.path())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(std::fs::read(&saved).unwrap(), b"%PDF");

        let missing = confirmation(DocumentStatus::Unavailable {
            reason: "404".to_string(),
        });
        assert_eq!(missing.save_document(dir.path()).await.unwrap(), None);
        assert_eq!(missing.document_filename(), "prenotazione_B1.pdf");
    }

    #[test]
    fn test_failure_keeps_remote_text() {
        let err = RecupError::from(ApiError::StateConflict {
            operation: "prebooking".to_string(),
            status: 409,
            message: "Slot non più disponibile".to_string(),
        });
        let failure = BookingFailure::from_error(
            BookingState::SlotSelected,
            "Prebooking failed",
            &err,
        );
        assert_eq!(failure.message, "Prebooking failed: Slot non più disponibile");
        assert_eq!(failure.lock_id, None);
        assert!(!failure.transient);
    }
}
