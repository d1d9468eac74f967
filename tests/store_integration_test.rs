//! Integration tests for the JSON stores opened from the storage configuration
//!
//! These tests verify that:
//! - All stores share one configuration and create their files on first use
//! - Files written by hand (or by an older release) are read back leniently
//! - Concurrent updates through shared handles are not lost
//! - The journal keeps unresolved booking attempts until they are cleared

use chrono::{TimeZone, Utc};
use recup_monitor::config::StorageConfig;
use recup_monitor::core::store::{Stores, TransactionStatus};
use recup_monitor::domain::{
    AvailabilitySlot, BookingRecord, FilterConfig, FiscalCode, Nre, RecupError, SubscriberId,
    Subscription,
};
use std::path::Path;
use tempfile::TempDir;

fn storage(dir: &Path) -> StorageConfig {
    StorageConfig {
        subscriptions_file: dir.join("input_prescriptions.json").display().to_string(),
        snapshots_file: dir.join("previous_data.json").display().to_string(),
        users_file: dir.join("authorized_users.json").display().to_string(),
        journal_file: dir.join("booking_journal.json").display().to_string(),
        documents_dir: dir.join("documents").display().to_string(),
        fallback_dir: Some(dir.join("fallback").display().to_string()),
    }
}

fn subscription(nre: &str, subscriber: &str) -> Subscription {
    Subscription::new(
        FiscalCode::new("RSSMRA80A01H501U").unwrap(),
        Nre::new(nre).unwrap(),
        SubscriberId::new(subscriber).unwrap(),
        FilterConfig::default(),
    )
}

fn slot() -> AvailabilitySlot {
    AvailabilitySlot {
        date: Utc.with_ymd_and_hms(2031, 2, 10, 7, 45, 0).unwrap(),
        hospital_id: "H9".to_string(),
        hospital_name: "Ospedale Grassi".to_string(),
        site_address: "Via Gian Carlo Passeroni 28".to_string(),
        price: Some(54.3),
        diary_id: "D-9".to_string(),
    }
}

#[tokio::test]
async fn test_stores_create_missing_files() {
    let dir = TempDir::new().unwrap();
    let stores = Stores::open(&storage(dir.path()));

    assert!(stores.subscriptions.all().await.unwrap().is_empty());
    assert!(stores.users.all().await.unwrap().is_empty());
    assert!(stores.snapshots.get("missing").await.unwrap().is_empty());
    assert!(stores.journal.unresolved().await.unwrap().is_empty());

    for name in [
        "input_prescriptions.json",
        "authorized_users.json",
        "previous_data.json",
        "booking_journal.json",
    ] {
        assert!(dir.path().join(name).exists(), "{name} was not created");
    }
}

#[tokio::test]
async fn test_hand_written_subscription_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let config = storage(dir.path());
    std::fs::write(
        &config.subscriptions_file,
        r#"[
            {
                "fiscal_code": "rssmra80a01h501u",
                "nre": "1200a4012345678",
                "subscriber_id": " 42 "
            }
        ]"#,
    )
    .unwrap();

    let subs = Stores::open(&config).subscriptions.all().await.unwrap();

    assert_eq!(subs.len(), 1);
    let sub = &subs[0];
    assert_eq!(sub.key(), "RSSMRA80A01H501U_1200A4012345678");
    assert_eq!(sub.subscriber_id.as_str(), "42");
    assert!(sub.notifications_enabled);
    assert_eq!(sub.filter, FilterConfig::default());
    assert!(sub.bookings.is_empty());
    assert_eq!(sub.display_name(), "Unknown prescription");
}

#[tokio::test]
async fn test_hand_edited_filter_is_clamped_on_load() {
    let dir = TempDir::new().unwrap();
    let config = storage(dir.path());
    std::fs::write(
        &config.subscriptions_file,
        r#"[
            {
                "fiscal_code": "RSSMRA80A01H501U",
                "nre": "1200A4012345678",
                "subscriber_id": "42",
                "filter": {"months_limit": 4000000000, "min_changes_to_notify": 0}
            }
        ]"#,
    )
    .unwrap();

    let subs = Stores::open(&config).subscriptions.all().await.unwrap();

    assert_eq!(subs[0].filter.months_limit, Some(FilterConfig::MAX_MONTHS_LIMIT));
    assert_eq!(subs[0].filter.min_changes_to_notify, 1);
    assert!(subs[0].filter.validate().is_ok());
}

#[tokio::test]
async fn test_invalid_identifier_in_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let config = storage(dir.path());
    std::fs::write(
        &config.subscriptions_file,
        r#"[{"fiscal_code": "TOO-SHORT", "nre": "1200A4012345678", "subscriber_id": "42"}]"#,
    )
    .unwrap();

    let err = Stores::open(&config).subscriptions.all().await.unwrap_err();

    assert!(matches!(err, RecupError::Serialization(_)));
}

#[tokio::test]
async fn test_concurrent_adds_through_shared_handles() {
    let dir = TempDir::new().unwrap();
    let stores = Stores::open(&storage(dir.path()));

    let mut tasks = Vec::new();
    for i in 0..10 {
        let subscriptions = stores.subscriptions.clone();
        tasks.push(tokio::spawn(async move {
            let nre = format!("1200A40123456{i:02}");
            subscriptions.add(subscription(&nre, "42")).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(stores.subscriptions.all().await.unwrap().len(), 10);
}

#[tokio::test]
async fn test_duplicate_subscription_is_rejected() {
    let dir = TempDir::new().unwrap();
    let stores = Stores::open(&storage(dir.path()));
    stores
        .subscriptions
        .add(subscription("1200A4012345678", "42"))
        .await
        .unwrap();

    let err = stores
        .subscriptions
        .add(subscription("1200a4012345678", "77"))
        .await
        .unwrap_err();

    assert!(matches!(err, RecupError::Validation(_)));
    assert_eq!(stores.subscriptions.all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_invalid_filter_is_rejected_on_add() {
    let dir = TempDir::new().unwrap();
    let stores = Stores::open(&storage(dir.path()));
    let mut sub = subscription("1200A4012345678", "42");
    sub.filter.months_limit = Some(0);

    let err = stores.subscriptions.add(sub).await.unwrap_err();

    assert!(matches!(err, RecupError::Validation(_)));
}

#[tokio::test]
async fn test_visibility_follows_administrator() {
    let dir = TempDir::new().unwrap();
    let stores = Stores::open(&storage(dir.path()));
    let admin = SubscriberId::new("1").unwrap();
    let user = SubscriberId::new("2").unwrap();
    stores.users.add(admin.clone()).await.unwrap();
    stores.users.add(user.clone()).await.unwrap();
    stores
        .subscriptions
        .add(subscription("1200A4000000001", "1"))
        .await
        .unwrap();
    stores
        .subscriptions
        .add(subscription("1200A4000000002", "2"))
        .await
        .unwrap();

    assert!(stores.users.is_admin(&admin).await.unwrap());
    assert!(!stores.users.is_admin(&user).await.unwrap());

    let own = stores.subscriptions.visible_to(&user, false).await.unwrap();
    assert_eq!(own.len(), 1);
    assert_eq!(own[0].prescription_code.as_str(), "1200A4000000002");

    let all = stores.subscriptions.visible_to(&admin, true).await.unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn test_booking_records_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let config = storage(dir.path());
    let sub = subscription("1200A4012345678", "42");
    {
        let stores = Stores::open(&config);
        stores.subscriptions.add(sub.clone()).await.unwrap();
        let record = BookingRecord {
            booking_id: "B-1".to_string(),
            date: slot().date,
            hospital_name: slot().hospital_name,
            address: slot().site_address,
            service_name: "Visita oculistica".to_string(),
        };
        // Adding the same booking twice keeps one record
        for _ in 0..2 {
            assert!(stores
                .subscriptions
                .add_booking(&sub.fiscal_code, &sub.prescription_code, record.clone())
                .await
                .unwrap());
        }
    }

    let reopened = Stores::open(&config);
    let stored = reopened
        .subscriptions
        .get(&sub.fiscal_code, &sub.prescription_code)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.bookings.len(), 1);
    assert_eq!(stored.bookings[0].booking_id, "B-1");
}

#[tokio::test]
async fn test_snapshot_file_is_keyed_by_subscription() {
    let dir = TempDir::new().unwrap();
    let config = storage(dir.path());
    let stores = Stores::open(&config);

    stores
        .snapshots
        .put("RSSMRA80A01H501U_1200A4012345678", vec![slot()])
        .await
        .unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&config.snapshots_file).unwrap()).unwrap();
    let stored = &raw["RSSMRA80A01H501U_1200A4012345678"][0];
    assert_eq!(stored["date"], "2031-02-10T07:45:00Z");
    assert_eq!(stored["hospital_id"], "H9");
    assert_eq!(stored["diary_id"], "D-9");
}

#[tokio::test]
async fn test_journal_lifecycle() {
    let dir = TempDir::new().unwrap();
    let stores = Stores::open(&storage(dir.path()));
    let journal = &stores.journal;

    journal.record_prebooked("A", "L-1", &slot()).await.unwrap();
    journal.record_prebooked("B", "L-2", &slot()).await.unwrap();
    journal.mark_confirmed("B", "B-1").await.unwrap();
    journal.mark_completed("B").await.unwrap();
    journal.mark_failed("A", "confirmation rejected").await.unwrap();

    let unresolved = journal.unresolved().await.unwrap();
    assert_eq!(unresolved.len(), 1);
    assert_eq!(unresolved[0].subscription_key, "A");
    assert_eq!(unresolved[0].status, TransactionStatus::Failed);
    assert_eq!(
        unresolved[0].last_error.as_deref(),
        Some("confirmation rejected")
    );

    assert!(journal.clear("A").await.unwrap());
    assert!(!journal.clear("A").await.unwrap());
    assert!(journal.unresolved().await.unwrap().is_empty());
    assert_eq!(
        journal.get("B").await.unwrap().unwrap().booking_id.as_deref(),
        Some("B-1")
    );
}

#[tokio::test]
async fn test_new_attempt_replaces_previous_entry() {
    let dir = TempDir::new().unwrap();
    let stores = Stores::open(&storage(dir.path()));

    let first = stores
        .journal
        .record_prebooked("A", "L-1", &slot())
        .await
        .unwrap();
    let second = stores
        .journal
        .record_prebooked("A", "L-2", &slot())
        .await
        .unwrap();

    let entry = stores.journal.get("A").await.unwrap().unwrap();
    assert_ne!(first.transaction_id, second.transaction_id);
    assert_eq!(entry.transaction_id, second.transaction_id);
    assert_eq!(entry.lock_id, "L-2");
    assert_eq!(entry.status, TransactionStatus::Prebooked);
}
