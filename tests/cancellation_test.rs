//! Integration tests for booking cancellation and the active booking lookup

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use recup_monitor::adapters::recup::models::{
    AvailabilityQuery, CompleteBookingRequest, PatientRecord, PrebookingRequest,
    PrescriptionService,
};
use recup_monitor::adapters::recup::{AccessToken, RecupApi};
use recup_monitor::core::cancellation::{CancellationDriver, CancellationOutcome};
use recup_monitor::core::store::SubscriptionStore;
use recup_monitor::domain::{
    ApiError, AvailabilitySlot, BookingRecord, FilterConfig, FiscalCode, Nre, RecupError,
    Result, SubscriberId, Subscription,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Booking service fake that only answers cancellation and search calls
#[derive(Default)]
struct CancellationApi {
    messages: Vec<String>,
    reject_with: Option<u16>,
    remote: HashMap<String, Vec<BookingRecord>>,
    failing_search: Vec<String>,
    cancelled: Mutex<Vec<String>>,
    searched: Mutex<Vec<String>>,
}

fn unexpected<T>(call: &str) -> Result<T> {
    Err(RecupError::Other(format!("unexpected call: {call}")))
}

#[async_trait]
impl RecupApi for CancellationApi {
    async fn access_token(&self) -> Result<AccessToken> {
        unexpected("access_token")
    }

    async fn patient(&self, _fiscal_code: &FiscalCode) -> Result<PatientRecord> {
        unexpected("patient")
    }

    async fn process_id(&self, _fiscal_code: &FiscalCode) -> Result<String> {
        unexpected("process_id")
    }

    async fn check_prescription(&self, _patient_id: &str, _nre: &Nre) -> Result<()> {
        unexpected("check_prescription")
    }

    async fn prescription_details(
        &self,
        _patient_id: &str,
        _nre: &Nre,
    ) -> Result<PrescriptionService> {
        unexpected("prescription_details")
    }

    async fn availabilities(&self, _query: &AvailabilityQuery) -> Result<Vec<AvailabilitySlot>> {
        unexpected("availabilities")
    }

    async fn prebook(&self, _request: &PrebookingRequest) -> Result<String> {
        unexpected("prebook")
    }

    async fn complete_booking(&self, _request: &CompleteBookingRequest) -> Result<String> {
        unexpected("complete_booking")
    }

    async fn booking_document(&self, _booking_id: &str) -> Result<Vec<u8>> {
        unexpected("booking_document")
    }

    async fn cancel_booking(&self, booking_id: &str) -> Result<Vec<String>> {
        self.cancelled.lock().unwrap().push(booking_id.to_string());
        match self.reject_with {
            Some(status) => Err(ApiError::StateConflict {
                operation: "cancellation".to_string(),
                status,
                message: "Prenotazione non annullabile".to_string(),
            }
            .into()),
            None => Ok(self.messages.clone()),
        }
    }

    async fn search_bookings(&self, fiscal_code: &FiscalCode) -> Result<Vec<BookingRecord>> {
        self.searched
            .lock()
            .unwrap()
            .push(fiscal_code.to_string());
        if self.failing_search.iter().any(|fc| fc == fiscal_code.as_str()) {
            return Err(ApiError::ServerError {
                status: 502,
                message: "Bad Gateway".to_string(),
            }
            .into());
        }
        Ok(self
            .remote
            .get(fiscal_code.as_str())
            .cloned()
            .unwrap_or_default())
    }
}

fn record(id: &str, day: u32) -> BookingRecord {
    BookingRecord {
        booking_id: id.to_string(),
        date: Utc.with_ymd_and_hms(2031, 5, day, 9, 30, 0).unwrap(),
        hospital_name: "Policlinico Umberto I".to_string(),
        address: "Viale del Policlinico 155".to_string(),
        service_name: "Ecografia addome".to_string(),
    }
}

fn subscription(fiscal_code: &str, nre: &str, bookings: Vec<BookingRecord>) -> Subscription {
    let mut sub = Subscription::new(
        FiscalCode::new(fiscal_code).unwrap(),
        Nre::new(nre).unwrap(),
        SubscriberId::new("42").unwrap(),
        FilterConfig::default(),
    );
    sub.bookings = bookings;
    sub
}

#[tokio::test]
async fn test_cancel_without_messages_is_clean() {
    let api = Arc::new(CancellationApi::default());
    let driver = CancellationDriver::new(api.clone());

    let outcome = driver.cancel("B-1").await.unwrap();

    assert_eq!(outcome, CancellationOutcome::Clean);
    assert!(outcome.is_clean());
    assert_eq!(api.cancelled.lock().unwrap().clone(), vec!["B-1"]);
}

#[tokio::test]
async fn test_cancel_with_messages_keeps_them() {
    let api = Arc::new(CancellationApi {
        messages: vec!["Rimborso non previsto".to_string()],
        ..CancellationApi::default()
    });
    let driver = CancellationDriver::new(api);

    let outcome = driver.cancel("B-1").await.unwrap();

    assert_eq!(
        outcome,
        CancellationOutcome::WithWarnings(vec!["Rimborso non previsto".to_string()])
    );
}

#[tokio::test]
async fn test_rejected_cancel_surfaces_remote_text() {
    let api = Arc::new(CancellationApi {
        reject_with: Some(400),
        ..CancellationApi::default()
    });
    let driver = CancellationDriver::new(api.clone());

    let err = driver.cancel("B-1").await.unwrap_err();

    let api_error = err.as_api().unwrap();
    assert_eq!(api_error.remote_message(), "Prenotazione non annullabile");
    assert!(!err.is_transient());
    assert_eq!(api.cancelled.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_cancel_then_remove_local_record() {
    let dir = TempDir::new().unwrap();
    let store = SubscriptionStore::new(dir.path().join("subs.json"), None);
    store
        .add(subscription(
            "RSSMRA80A01H501U",
            "1200A4012345678",
            vec![record("B-1", 3), record("B-2", 9)],
        ))
        .await
        .unwrap();

    let driver = CancellationDriver::new(Arc::new(CancellationApi::default()));
    driver.cancel("B-1").await.unwrap();
    let key = store.remove_booking("B-1").await.unwrap();

    assert_eq!(key.as_deref(), Some("RSSMRA80A01H501U_1200A4012345678"));
    let remaining = &store.all().await.unwrap()[0].bookings;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].booking_id, "B-2");
}

#[tokio::test]
async fn test_local_bookings_win_over_remote_search() {
    let api = Arc::new(CancellationApi {
        remote: HashMap::from([(
            "RSSMRA80A01H501U".to_string(),
            vec![record("REMOTE-1", 1)],
        )]),
        ..CancellationApi::default()
    });
    let driver = CancellationDriver::new(api.clone());
    let subs = vec![
        subscription("RSSMRA80A01H501U", "1200A4012345678", vec![record("B-9", 20)]),
        subscription("VRDLGU75B12F205X", "1200A4099999999", vec![record("B-2", 4)]),
    ];

    let bookings = driver.active_bookings(&subs).await;

    let ids: Vec<&str> = bookings.iter().map(|b| b.record.booking_id.as_str()).collect();
    assert_eq!(ids, vec!["B-2", "B-9"]);
    assert!(bookings.iter().all(|b| b.subscription_key.is_some()));
    assert!(api.searched.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_remote_search_once_per_fiscal_code() {
    let api = Arc::new(CancellationApi {
        remote: HashMap::from([
            (
                "RSSMRA80A01H501U".to_string(),
                vec![record("R-2", 15), record("R-1", 2)],
            ),
            ("VRDLGU75B12F205X".to_string(), vec![record("R-3", 8)]),
        ]),
        ..CancellationApi::default()
    });
    let driver = CancellationDriver::new(api.clone());
    let subs = vec![
        subscription("RSSMRA80A01H501U", "1200A4012345678", Vec::new()),
        subscription("RSSMRA80A01H501U", "1200A4087654321", Vec::new()),
        subscription("VRDLGU75B12F205X", "1200A4099999999", Vec::new()),
    ];

    let bookings = driver.active_bookings(&subs).await;

    let ids: Vec<&str> = bookings.iter().map(|b| b.record.booking_id.as_str()).collect();
    assert_eq!(ids, vec!["R-1", "R-3", "R-2"]);
    assert!(bookings.iter().all(|b| b.subscription_key.is_none()));
    assert_eq!(api.searched.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_failed_search_skips_that_code() {
    let api = Arc::new(CancellationApi {
        remote: HashMap::from([("VRDLGU75B12F205X".to_string(), vec![record("R-3", 8)])]),
        failing_search: vec!["RSSMRA80A01H501U".to_string()],
        ..CancellationApi::default()
    });
    let driver = CancellationDriver::new(api);
    let subs = vec![
        subscription("RSSMRA80A01H501U", "1200A4012345678", Vec::new()),
        subscription("VRDLGU75B12F205X", "1200A4099999999", Vec::new()),
    ];

    let bookings = driver.active_bookings(&subs).await;

    assert_eq!(bookings.len(), 1);
    assert_eq!(bookings[0].fiscal_code.as_str(), "VRDLGU75B12F205X");
}
