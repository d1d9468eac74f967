//! Progress markers of one booking attempt

use std::fmt;

/// How far a booking attempt got
///
/// Ephemeral: only the [`TransactionJournal`](crate::core::store::TransactionJournal)
/// outlives the process, and only from `Prebooked` on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingState {
    Init,
    PatientResolved,
    DoctorResolved,
    PrescriptionValidated,
    AvailabilitiesFetched,
    SlotSelected,
    Prebooked { lock_id: String },
    Confirmed { lock_id: String, booking_id: String },
    DocumentRetrieved { booking_id: String },
}

impl BookingState {
    /// Lock taken on the remote side, if the attempt got that far
    pub fn lock_id(&self) -> Option<&str> {
        match self {
            BookingState::Prebooked { lock_id } | BookingState::Confirmed { lock_id, .. } => {
                Some(lock_id)
            }
            _ => None,
        }
    }
}

impl fmt::Display for BookingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingState::Init => write!(f, "init"),
            BookingState::PatientResolved => write!(f, "patient resolved"),
            BookingState::DoctorResolved => write!(f, "doctor resolved"),
            BookingState::PrescriptionValidated => write!(f, "prescription validated"),
            BookingState::AvailabilitiesFetched => write!(f, "availabilities fetched"),
            BookingState::SlotSelected => write!(f, "slot selected"),
            BookingState::Prebooked { lock_id } => write!(f, "prebooked (lock {lock_id})"),
            BookingState::Confirmed { booking_id, .. } => {
                write!(f, "confirmed (booking {booking_id})")
            }
            BookingState::DocumentRetrieved { booking_id } => {
                write!(f, "document retrieved (booking {booking_id})")
            }
        }
    }
}
