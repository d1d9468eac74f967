//! Booking service trait definition
//!
//! [`RecupApi`] is the seam between the workflows (polling, booking,
//! cancellation) and the HTTP client. Tests drive the workflows through
//! in-memory implementations.

use super::models::{
    AvailabilityQuery, CompleteBookingRequest, PatientRecord, PrebookingRequest,
    PrescriptionService,
};
use crate::config::SecretString;
use crate::domain::{AvailabilitySlot, BookingRecord, FiscalCode, Nre, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Access token issued by the token endpoint
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub value: SecretString,
    pub acquired_at: DateTime<Utc>,
    pub expires_in: Option<u64>,
}

/// Operations the monitor needs from the booking service
///
/// Read operations may be retried by the implementation when the failure is
/// transient. `prebook`, `complete_booking` and `cancel_booking` change remote
/// state and are attempted exactly once.
///
/// # Example
///
/// ```no_run
/// use recup_monitor::adapters::recup::{RecupApi, RecupHttpClient};
/// use recup_monitor::config::load_config;
/// use recup_monitor::domain::FiscalCode;
///
/// # async fn example() -> recup_monitor::domain::Result<()> {
/// let config = load_config("recup.toml")?;
/// let api = RecupHttpClient::new(config.recup)?;
///
/// api.access_token().await?;
/// let patient = api.patient(&FiscalCode::new("RSSMRA80A01H501U").unwrap()).await?;
/// println!("patient id {}", patient.id);
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait RecupApi: Send + Sync {
    /// Client-credentials token; failure is an authentication error
    async fn access_token(&self) -> Result<AccessToken>;

    /// Resolves the patient from the fiscal code (`content[0]`)
    async fn patient(&self, fiscal_code: &FiscalCode) -> Result<PatientRecord>;

    /// Resolves the attending doctor's process id
    async fn process_id(&self, fiscal_code: &FiscalCode) -> Result<String>;

    /// Checks that the prescription is bookable for the patient
    async fn check_prescription(&self, patient_id: &str, nre: &Nre) -> Result<()>;

    /// Fetches `details[0].service` of the prescription
    async fn prescription_details(&self, patient_id: &str, nre: &Nre)
        -> Result<PrescriptionService>;

    /// Searches availability; order of the returned slots is unspecified
    async fn availabilities(&self, query: &AvailabilityQuery) -> Result<Vec<AvailabilitySlot>>;

    /// Locks a slot; returns the lock id. Succeeds only on HTTP 201.
    async fn prebook(&self, request: &PrebookingRequest) -> Result<String>;

    /// Confirms a locked slot; returns the booking id. Succeeds only on HTTP 200.
    async fn complete_booking(&self, request: &CompleteBookingRequest) -> Result<String>;

    /// Downloads the confirmation document (PDF bytes)
    async fn booking_document(&self, booking_id: &str) -> Result<Vec<u8>>;

    /// Cancels a booking; returns the `_messages` of the response
    async fn cancel_booking(&self, booking_id: &str) -> Result<Vec<String>>;

    /// Active bookings (`PRENOTATA`, `PRESA_IN_CARICO`) of a fiscal code
    async fn search_bookings(&self, fiscal_code: &FiscalCode) -> Result<Vec<BookingRecord>>;
}
