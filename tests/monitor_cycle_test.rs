//! Integration tests for polling, the poll cycle and graceful shutdown
//!
//! These tests verify that:
//! - A new subscription reports its current availability once
//! - Snapshots are stored after every successful poll, reported or not
//! - Disabled or failing notifications never lose the snapshot
//! - A token failure aborts the whole cycle
//! - The monitor loop stops promptly on the shutdown signal

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use recup_monitor::adapters::notifier::Notifier;
use recup_monitor::adapters::recup::models::{
    AvailabilityQuery, CompleteBookingRequest, PatientRecord, PrebookingRequest,
    PrescriptionService,
};
use recup_monitor::adapters::recup::{AccessToken, RecupApi};
use recup_monitor::config::secret_string;
use recup_monitor::core::monitor::{CycleScheduler, Delivery, Monitor, Poller};
use recup_monitor::core::store::{SnapshotStore, SubscriptionStore};
use recup_monitor::domain::{
    ApiError, AvailabilitySlot, BookingRecord, FilterConfig, FiscalCode, Nre, PatientSnapshot,
    RecupError, Result, SubscriberId, Subscription, TeamCard,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::watch;

const NRE_OK: &str = "1200A4012345678";
const NRE_BROKEN: &str = "1200A4000000000";

/// Booking service fake serving a mutable availability list
#[derive(Default)]
struct AvailabilityApi {
    slots: Mutex<Vec<AvailabilitySlot>>,
    token_fails: bool,
    patient_calls: Mutex<usize>,
}

impl AvailabilityApi {
    fn serving(slots: Vec<AvailabilitySlot>) -> Self {
        Self {
            slots: Mutex::new(slots),
            ..Self::default()
        }
    }

    fn set_slots(&self, slots: Vec<AvailabilitySlot>) {
        *self.slots.lock().unwrap() = slots;
    }
}

#[async_trait]
impl RecupApi for AvailabilityApi {
    async fn access_token(&self) -> Result<AccessToken> {
        if self.token_fails {
            return Err(ApiError::Authentication("invalid_client".to_string()).into());
        }
        Ok(AccessToken {
            value: secret_string("token".to_string()),
            acquired_at: Utc::now(),
            expires_in: Some(3600),
        })
    }

    async fn patient(&self, _fiscal_code: &FiscalCode) -> Result<PatientRecord> {
        *self.patient_calls.lock().unwrap() += 1;
        Ok(PatientRecord {
            id: "P-1".to_string(),
            snapshot: PatientSnapshot {
                first_name: Some("Mario".to_string()),
                last_name: Some("Rossi".to_string()),
                team_card: Some(TeamCard {
                    code: Some("80380001200000000001".to_string()),
                    valid_from: None,
                    valid_to: None,
                }),
                ..PatientSnapshot::default()
            },
        })
    }

    async fn process_id(&self, _fiscal_code: &FiscalCode) -> Result<String> {
        Ok("PROC-1".to_string())
    }

    async fn check_prescription(&self, _patient_id: &str, nre: &Nre) -> Result<()> {
        if nre.as_str() == NRE_BROKEN {
            return Err(ApiError::Resolution("Prescrizione non trovata".to_string()).into());
        }
        Ok(())
    }

    async fn prescription_details(
        &self,
        _patient_id: &str,
        _nre: &Nre,
    ) -> Result<PrescriptionService> {
        Ok(PrescriptionService {
            order_id: "ORD-1".to_string(),
            service_code: "89.7".to_string(),
            service_name: Some("Visita cardiologica".to_string()),
        })
    }

    async fn availabilities(&self, _query: &AvailabilityQuery) -> Result<Vec<AvailabilitySlot>> {
        Ok(self.slots.lock().unwrap().clone())
    }

    async fn prebook(&self, _request: &PrebookingRequest) -> Result<String> {
        Err(RecupError::Other("prebook is not used by polling".to_string()))
    }

    async fn complete_booking(&self, _request: &CompleteBookingRequest) -> Result<String> {
        Err(RecupError::Other("complete_booking is not used by polling".to_string()))
    }

    async fn booking_document(&self, _booking_id: &str) -> Result<Vec<u8>> {
        Err(RecupError::Other("booking_document is not used by polling".to_string()))
    }

    async fn cancel_booking(&self, _booking_id: &str) -> Result<Vec<String>> {
        Err(RecupError::Other("cancel_booking is not used by polling".to_string()))
    }

    async fn search_bookings(&self, _fiscal_code: &FiscalCode) -> Result<Vec<BookingRecord>> {
        Ok(Vec::new())
    }
}

/// Notifier that keeps every message it is asked to send
#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
    failing: AtomicBool,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_message(&self, to: &SubscriberId, html: &str) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RecupError::Notification("chat not found".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), html.to_string()));
        Ok(())
    }

    async fn send_document(
        &self,
        _to: &SubscriberId,
        _filename: &str,
        _content: &[u8],
        _caption: Option<&str>,
    ) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

struct Fixture {
    _dir: TempDir,
    api: Arc<AvailabilityApi>,
    notifier: Arc<RecordingNotifier>,
    subscriptions: Arc<SubscriptionStore>,
    snapshots: Arc<SnapshotStore>,
}

impl Fixture {
    fn new(api: AvailabilityApi) -> Self {
        let dir = TempDir::new().unwrap();
        let subscriptions = Arc::new(SubscriptionStore::new(dir.path().join("subs.json"), None));
        let snapshots = Arc::new(SnapshotStore::new(dir.path().join("previous.json"), None));
        Self {
            _dir: dir,
            api: Arc::new(api),
            notifier: Arc::new(RecordingNotifier::default()),
            subscriptions,
            snapshots,
        }
    }

    fn poller(&self) -> Poller {
        Poller::new(
            self.api.clone(),
            self.notifier.clone(),
            self.subscriptions.clone(),
            self.snapshots.clone(),
        )
    }

    fn monitor(&self, scheduler: CycleScheduler, shutdown: watch::Receiver<bool>) -> Monitor {
        Monitor::new(
            self.api.clone(),
            self.poller(),
            self.subscriptions.clone(),
            scheduler,
            shutdown,
        )
    }

    async fn subscribe(&self, nre: &str) -> Subscription {
        let sub = Subscription::new(
            FiscalCode::new("RSSMRA80A01H501U").unwrap(),
            Nre::new(nre).unwrap(),
            SubscriberId::new("42").unwrap(),
            FilterConfig::default(),
        );
        self.subscriptions.add(sub.clone()).await.unwrap();
        sub
    }

    fn sent(&self) -> Vec<(String, String)> {
        self.notifier.sent.lock().unwrap().clone()
    }
}

fn slot(day: u32, hour: u32) -> AvailabilitySlot {
    AvailabilitySlot {
        date: Utc.with_ymd_and_hms(2031, 9, day, hour, 0, 0).unwrap(),
        hospital_id: "H1".to_string(),
        hospital_name: "Ospedale Sandro Pertini".to_string(),
        site_address: "Via dei Monti Tiburtini 385".to_string(),
        price: Some(23.5),
        diary_id: "D-1".to_string(),
    }
}

fn fast_scheduler() -> CycleScheduler {
    CycleScheduler::new(
        Duration::from_secs(3600),
        Duration::from_millis(1),
        0,
        Duration::from_secs(3600),
    )
}

#[tokio::test]
async fn test_first_poll_reports_current_availability() {
    let fx = Fixture::new(AvailabilityApi::serving(vec![slot(10, 9), slot(3, 11)]));
    let sub = fx.subscribe(NRE_OK).await;

    let report = fx.poller().poll(&sub).await.unwrap();

    assert_eq!(report.delivery, Delivery::Sent);
    assert_eq!(report.slot_count, 2);
    let sent = fx.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "42");
    assert!(sent[0].1.contains("New prescription"));
    assert!(sent[0].1.contains("80380001200000000001"));
    assert!(sent[0].1.contains("Visita cardiologica"));

    assert_eq!(fx.snapshots.get(&sub.key()).await.unwrap().len(), 2);
    let stored = fx
        .subscriptions
        .get(&sub.fiscal_code, &sub.prescription_code)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.description.as_deref(), Some("Visita cardiologica"));
    assert_eq!(
        stored.patient.unwrap().full_name().as_deref(),
        Some("Mario Rossi")
    );
}

#[tokio::test]
async fn test_unchanged_availability_is_not_reported() {
    let fx = Fixture::new(AvailabilityApi::serving(vec![slot(3, 11)]));
    let sub = fx.subscribe(NRE_OK).await;

    fx.poller().poll(&sub).await.unwrap();
    let report = fx.poller().poll(&sub).await.unwrap();

    assert_eq!(report.delivery, Delivery::NothingToReport);
    assert!(report.message.is_none());
    assert_eq!(fx.sent().len(), 1);
}

#[tokio::test]
async fn test_single_new_date_is_reported() {
    let fx = Fixture::new(AvailabilityApi::serving(vec![slot(3, 11)]));
    let sub = fx.subscribe(NRE_OK).await;
    fx.poller().poll(&sub).await.unwrap();

    fx.api.set_slots(vec![slot(3, 11), slot(7, 15)]);
    let report = fx.poller().poll(&sub).await.unwrap();

    assert_eq!(report.delivery, Delivery::Sent);
    let message = report.message.unwrap();
    assert!(message.contains("Prescription update"));
    assert_eq!(fx.snapshots.get(&sub.key()).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_same_day_shift_within_threshold_is_not_reported() {
    let fx = Fixture::new(AvailabilityApi::serving(vec![slot(3, 11)]));
    let sub = fx.subscribe(NRE_OK).await;
    fx.poller().poll(&sub).await.unwrap();

    let mut shifted = slot(3, 11);
    shifted.date = Utc.with_ymd_and_hms(2031, 9, 3, 11, 45, 0).unwrap();
    fx.api.set_slots(vec![shifted.clone()]);
    let report = fx.poller().poll(&sub).await.unwrap();

    assert_eq!(report.delivery, Delivery::NothingToReport);
    assert_eq!(fx.snapshots.get(&sub.key()).await.unwrap(), vec![shifted]);
}

#[tokio::test]
async fn test_muted_subscription_still_stores_snapshot() {
    let fx = Fixture::new(AvailabilityApi::serving(vec![slot(3, 11)]));
    let mut sub = fx.subscribe(NRE_OK).await;
    fx.subscriptions
        .set_notifications(&sub.fiscal_code, &sub.prescription_code, false)
        .await
        .unwrap();
    sub.notifications_enabled = false;

    let report = fx.poller().poll(&sub).await.unwrap();

    assert_eq!(report.delivery, Delivery::Muted);
    assert!(report.message.is_some());
    assert!(fx.sent().is_empty());
    assert_eq!(fx.snapshots.get(&sub.key()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_failed_delivery_still_stores_snapshot() {
    let fx = Fixture::new(AvailabilityApi::serving(vec![slot(3, 11)]));
    fx.notifier.failing.store(true, Ordering::SeqCst);
    let sub = fx.subscribe(NRE_OK).await;

    let report = fx.poller().poll(&sub).await.unwrap();

    assert!(matches!(report.delivery, Delivery::Failed(ref reason) if reason.contains("chat not found")));
    assert_eq!(fx.snapshots.get(&sub.key()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_empty_answer_produces_no_removal_notice() {
    let fx = Fixture::new(AvailabilityApi::serving(vec![slot(3, 11), slot(4, 9)]));
    let sub = fx.subscribe(NRE_OK).await;
    fx.poller().poll(&sub).await.unwrap();

    fx.api.set_slots(Vec::new());
    let report = fx.poller().poll(&sub).await.unwrap();

    assert_eq!(report.delivery, Delivery::NothingToReport);
    assert_eq!(fx.sent().len(), 1);
}

#[tokio::test]
async fn test_check_reports_unchanged_availability() {
    let fx = Fixture::new(AvailabilityApi::serving(vec![slot(3, 11)]));
    let sub = fx.subscribe(NRE_OK).await;
    fx.poller().poll(&sub).await.unwrap();

    let report = fx.poller().check(&sub).await.unwrap();

    assert_eq!(report.delivery, Delivery::Sent);
    assert!(report.message.unwrap().contains("Ospedale Sandro Pertini"));
}

#[tokio::test]
async fn test_check_without_listing_still_sends_header() {
    let fx = Fixture::new(AvailabilityApi::serving(vec![slot(3, 11)]));
    let mut sub = fx.subscribe(NRE_OK).await;
    sub.filter.show_all_current = false;
    fx.poller().poll(&sub).await.unwrap();

    let report = fx.poller().check(&sub).await.unwrap();

    assert_eq!(report.delivery, Delivery::Sent);
    let message = report.message.unwrap();
    assert!(message.contains("Prescription update"));
    assert!(!message.contains("All availabilities"));
}

#[tokio::test]
async fn test_cycle_counts_failed_subscriptions() {
    let fx = Fixture::new(AvailabilityApi::serving(vec![slot(3, 11)]));
    fx.subscribe(NRE_OK).await;
    fx.subscribe(NRE_BROKEN).await;
    let (_tx, rx) = watch::channel(false);

    let summary = fx.monitor(fast_scheduler(), rx).run_cycle().await.unwrap();

    assert_eq!(summary.polled, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.notified, 1);
    assert!(!summary.interrupted);
}

#[tokio::test]
async fn test_token_failure_aborts_cycle() {
    let fx = Fixture::new(AvailabilityApi {
        token_fails: true,
        ..AvailabilityApi::serving(vec![slot(3, 11)])
    });
    fx.subscribe(NRE_OK).await;
    let (_tx, rx) = watch::channel(false);

    let err = fx
        .monitor(fast_scheduler(), rx)
        .run_cycle()
        .await
        .unwrap_err();

    assert!(matches!(err.as_api(), Some(ApiError::Authentication(_))));
    assert_eq!(*fx.api.patient_calls.lock().unwrap(), 0);
    assert!(fx.sent().is_empty());
}

#[tokio::test]
async fn test_cycle_stops_when_shutdown_already_requested() {
    let fx = Fixture::new(AvailabilityApi::serving(vec![slot(3, 11)]));
    fx.subscribe(NRE_OK).await;
    let (tx, rx) = watch::channel(false);
    tx.send(true).unwrap();

    let summary = fx.monitor(fast_scheduler(), rx).run_cycle().await.unwrap();

    assert!(summary.interrupted);
    assert_eq!(summary.polled, 0);
}

#[tokio::test]
async fn test_monitor_stops_during_sleep() {
    let fx = Fixture::new(AvailabilityApi::serving(vec![slot(3, 11)]));
    fx.subscribe(NRE_OK).await;
    let (tx, rx) = watch::channel(false);
    let monitor = fx.monitor(fast_scheduler(), rx);

    let run = tokio::spawn(async move { monitor.run().await });
    tokio::time::sleep(Duration::from_millis(200)).await;
    tx.send(true).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("monitor did not stop")
        .unwrap();
    assert!(result.is_ok());
    assert_eq!(fx.sent().len(), 1);
}
