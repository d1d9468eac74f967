//! Booking workflow
//!
//! [`BookingDriver::book`] returns a tagged [`BookingOutcome`] instead of an
//! error so callers always have a message to show. Locks left behind by a
//! failed confirmation are reported through [`BookingFailure::lock_id`] and
//! the transaction journal.

pub mod driver;
pub mod outcome;
pub mod state;

pub use driver::{clamp_choice, BookingDriver};
pub use outcome::{
    BookingConfirmation, BookingFailure, BookingOutcome, BookingRequest, DocumentStatus,
    SlotChoice, SlotList,
};
pub use state::BookingState;
