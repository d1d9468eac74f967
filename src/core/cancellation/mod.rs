//! Booking cancellation
//!
//! [`CancellationDriver::cancel`] issues the single remote cancel call. The
//! caller removes the local [`BookingRecord`] afterwards.

use crate::adapters::recup::RecupApi;
use crate::domain::{BookingRecord, FiscalCode, Result, Subscription};
use std::sync::Arc;

/// Result of an accepted cancellation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancellationOutcome {
    /// Accepted with no messages
    Clean,
    /// Accepted, but the service attached messages worth showing
    WithWarnings(Vec<String>),
}

impl CancellationOutcome {
    pub fn is_clean(&self) -> bool {
        matches!(self, CancellationOutcome::Clean)
    }
}

/// An active booking together with the subscription it belongs to, if known
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveBooking {
    pub record: BookingRecord,
    pub fiscal_code: FiscalCode,
    /// Key of the subscription holding the record; `None` for remote results
    pub subscription_key: Option<String>,
}

pub struct CancellationDriver {
    api: Arc<dyn RecupApi>,
}

impl CancellationDriver {
    pub fn new(api: Arc<dyn RecupApi>) -> Self {
        Self { api }
    }

    /// Cancels one booking by its remote id
    ///
    /// # Errors
    ///
    /// Returns the booking service error, with the remote text, when the
    /// cancellation is not accepted.
    pub async fn cancel(&self, booking_id: &str) -> Result<CancellationOutcome> {
        tracing::info!(booking_id, "Cancelling booking");

        let messages = self.api.cancel_booking(booking_id).await.map_err(|e| {
            tracing::error!(booking_id, error = %e, "Cancellation rejected");
            e
        })?;

        if messages.is_empty() {
            tracing::info!(booking_id, "Booking cancelled");
            Ok(CancellationOutcome::Clean)
        } else {
            tracing::warn!(
                booking_id,
                messages = ?messages,
                "Booking cancelled with messages"
            );
            Ok(CancellationOutcome::WithWarnings(messages))
        }
    }

    /// Active bookings for the given subscriptions, sorted by date
    ///
    /// Locally recorded bookings win. Only when none are recorded is the
    /// remote booking search queried, once per distinct fiscal code; a failed
    /// search for one code is logged and skipped.
    pub async fn active_bookings(&self, subscriptions: &[Subscription]) -> Vec<ActiveBooking> {
        let mut bookings: Vec<ActiveBooking> = subscriptions
            .iter()
            .flat_map(|sub| {
                sub.bookings.iter().map(move |record| ActiveBooking {
                    record: record.clone(),
                    fiscal_code: sub.fiscal_code.clone(),
                    subscription_key: Some(sub.key()),
                })
            })
            .collect();

        if bookings.is_empty() {
            let mut fiscal_codes: Vec<&FiscalCode> =
                subscriptions.iter().map(|s| &s.fiscal_code).collect();
            fiscal_codes.sort();
            fiscal_codes.dedup();

            for fiscal_code in fiscal_codes {
                match self.api.search_bookings(fiscal_code).await {
                    Ok(records) => {
                        tracing::debug!(
                            fiscal_code = %fiscal_code,
                            found = records.len(),
                            "Remote booking search"
                        );
                        bookings.extend(records.into_iter().map(|record| ActiveBooking {
                            record,
                            fiscal_code: fiscal_code.clone(),
                            subscription_key: None,
                        }));
                    }
                    Err(e) => {
                        tracing::warn!(fiscal_code = %fiscal_code, error = %e, "Booking search failed");
                    }
                }
            }
        }

        bookings.sort_by_key(|b| b.record.date);
        bookings
    }
}
