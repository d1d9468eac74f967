//! Booking transaction driver
//!
//! Runs the ordered sequence patient → doctor → prescription check → service
//! details → availability → prebooking → confirmation → document. Every step
//! short-circuits to a [`BookingFailure`]; nothing is retried inside one call
//! and no compensating cancel is sent for a lock left behind.

use super::outcome::{
    BookingConfirmation, BookingFailure, BookingOutcome, BookingRequest, DocumentStatus,
    SlotChoice, SlotList,
};
use super::state::BookingState;
use crate::adapters::recup::models::{
    AvailabilityQuery, CompleteBookingRequest, PrebookingRequest,
};
use crate::adapters::recup::RecupApi;
use crate::core::store::TransactionJournal;
use crate::domain::slot::sort_by_date;
use crate::domain::{AvailabilitySlot, Subscription};
use std::sync::Arc;

pub struct BookingDriver {
    api: Arc<dyn RecupApi>,
    journal: Option<Arc<TransactionJournal>>,
}

impl BookingDriver {
    pub fn new(api: Arc<dyn RecupApi>) -> Self {
        Self { api, journal: None }
    }

    /// Records prebooked, confirmed and failed attempts in `journal`
    pub fn with_journal(mut self, journal: Arc<TransactionJournal>) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Lists or books a slot for the subscription
    ///
    /// Never returns an error: every failure becomes
    /// [`BookingOutcome::Failed`] with a displayable message.
    pub async fn book(
        &self,
        subscription: &Subscription,
        request: &BookingRequest,
    ) -> BookingOutcome {
        let key = subscription.key();
        tracing::info!(subscription = %key, choice = %request.choice, "Starting booking");

        match self.run(subscription, request).await {
            Ok(outcome) => outcome,
            Err(failure) => {
                tracing::error!(
                    subscription = %key,
                    state = %failure.state,
                    lock_id = failure.lock_id.as_deref().unwrap_or(""),
                    error = %failure.message,
                    "Booking failed"
                );
                BookingOutcome::Failed(failure)
            }
        }
    }

    async fn run(
        &self,
        subscription: &Subscription,
        request: &BookingRequest,
    ) -> Result<BookingOutcome, BookingFailure> {
        let fiscal_code = &subscription.fiscal_code;
        let nre = &subscription.prescription_code;
        let key = subscription.key();

        let patient_id = match &request.patient_id {
            Some(id) => id.clone(),
            None => self.api.patient(fiscal_code).await.map(|p| p.id).map_err(|e| {
                BookingFailure::from_error(BookingState::Init, "Patient lookup failed", &e)
            })?,
        };

        let process_id = match &request.process_id {
            Some(id) => id.clone(),
            None => self.api.process_id(fiscal_code).await.map_err(|e| {
                BookingFailure::from_error(BookingState::PatientResolved, "Doctor lookup failed", &e)
            })?,
        };

        self.api
            .check_prescription(&patient_id, nre)
            .await
            .map_err(|e| {
                BookingFailure::from_error(
                    BookingState::DoctorResolved,
                    "Prescription check failed",
                    &e,
                )
            })?;

        let service = self
            .api
            .prescription_details(&patient_id, nre)
            .await
            .map_err(|e| {
                BookingFailure::from_error(
                    BookingState::PrescriptionValidated,
                    "Prescription details unavailable",
                    &e,
                )
            })?;

        let query = AvailabilityQuery {
            patient_id: patient_id.clone(),
            process_id: process_id.clone(),
            nre: nre.clone(),
            order_id: service.order_id.clone(),
        };
        let mut slots = self.api.availabilities(&query).await.map_err(|e| {
            BookingFailure::from_error(
                BookingState::PrescriptionValidated,
                "Availability search failed",
                &e,
            )
        })?;
        sort_by_date(&mut slots);

        if slots.is_empty() {
            return Err(BookingFailure::new(
                BookingState::AvailabilitiesFetched,
                format!("No availability for prescription {nre}"),
            ));
        }

        let index = match request.choice {
            SlotChoice::ListOnly => {
                tracing::info!(subscription = %key, slots = slots.len(), "Returning slot list");
                return Ok(BookingOutcome::SlotList(SlotList {
                    slots,
                    patient_id,
                    process_id,
                    service_name: service.service_name,
                }));
            }
            SlotChoice::Index(i) => clamp_choice(i, slots.len()),
        };
        let Some(contact) = request.contact.as_ref() else {
            return Err(BookingFailure::new(
                BookingState::AvailabilitiesFetched,
                "Phone and email are required to book a slot",
            ));
        };
        let slot = slots.swap_remove(index);
        tracing::info!(
            subscription = %key,
            index,
            date = %slot.wire_date(),
            hospital = %slot.hospital_name,
            "Slot selected"
        );

        let prebooking =
            PrebookingRequest::new(&slot, &service.service_code, nre, &process_id, fiscal_code);
        let lock_id = self.api.prebook(&prebooking).await.map_err(|e| {
            BookingFailure::from_error(BookingState::SlotSelected, "Prebooking failed", &e)
        })?;
        tracing::info!(subscription = %key, lock_id = %lock_id, "Slot locked");
        self.journal_prebooked(&key, &lock_id, &slot).await;

        let confirmation = CompleteBookingRequest::new(
            &slot,
            &lock_id,
            &service.order_id,
            nre,
            &process_id,
            fiscal_code,
            contact,
        );
        let booking_id = match self.api.complete_booking(&confirmation).await {
            Ok(id) => id,
            Err(e) => {
                let failure = BookingFailure::from_error(
                    BookingState::Prebooked {
                        lock_id: lock_id.clone(),
                    },
                    "Booking confirmation failed",
                    &e,
                );
                self.journal_failed(&key, &failure.message).await;
                return Err(failure);
            }
        };
        tracing::info!(subscription = %key, booking_id = %booking_id, "Booking confirmed");
        self.journal_confirmed(&key, &booking_id).await;
        let mut state = BookingState::Confirmed {
            lock_id: lock_id.clone(),
            booking_id: booking_id.clone(),
        };

        let document = match self.api.booking_document(&booking_id).await {
            Ok(content) => {
                state = BookingState::DocumentRetrieved {
                    booking_id: booking_id.clone(),
                };
                DocumentStatus::retrieved(content)
            }
            Err(e) => {
                tracing::warn!(
                    subscription = %key,
                    booking_id = %booking_id,
                    error = %e,
                    "Booking confirmed but document unavailable"
                );
                DocumentStatus::Unavailable {
                    reason: e.to_string(),
                }
            }
        };
        self.journal_completed(&key).await;
        tracing::info!(subscription = %key, state = %state, "Booking completed");

        Ok(BookingOutcome::Booked(BookingConfirmation {
            booking_id,
            lock_id,
            slot,
            service_name: service.service_name,
            document,
            state,
        }))
    }

    async fn journal_prebooked(&self, key: &str, lock_id: &str, slot: &AvailabilitySlot) {
        if let Some(journal) = &self.journal {
            if let Err(e) = journal.record_prebooked(key, lock_id, slot).await {
                crate::log_error_with_context!(e, "Failed to journal prebooking");
            }
        }
    }

    async fn journal_confirmed(&self, key: &str, booking_id: &str) {
        if let Some(journal) = &self.journal {
            if let Err(e) = journal.mark_confirmed(key, booking_id).await {
                crate::log_error_with_context!(e, "Failed to journal confirmation");
            }
        }
    }

    async fn journal_completed(&self, key: &str) {
        if let Some(journal) = &self.journal {
            if let Err(e) = journal.mark_completed(key).await {
                crate::log_error_with_context!(e, "Failed to journal completion");
            }
        }
    }

    async fn journal_failed(&self, key: &str, error: &str) {
        if let Some(journal) = &self.journal {
            if let Err(e) = journal.mark_failed(key, error).await {
                crate::log_error_with_context!(e, "Failed to journal failure");
            }
        }
    }
}

/// Out-of-range choices, negative ones included, fall back to the first slot
pub fn clamp_choice(choice: i64, len: usize) -> usize {
    match usize::try_from(choice) {
        Ok(i) if i < len => i,
        _ => {
            tracing::warn!(
                choice,
                available = len,
                "Slot choice out of range, using the first slot"
            );
            0
        }
    }
}
