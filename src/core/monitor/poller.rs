//! Poll of one subscription
//!
//! Refreshes patient and prescription data, fetches availability, diffs it
//! against the stored snapshot, notifies and stores the new snapshot.

use crate::adapters::notifier::Notifier;
use crate::adapters::recup::models::AvailabilityQuery;
use crate::adapters::recup::RecupApi;
use crate::core::detection::{detect_changes, NotificationHeader};
use crate::core::store::{SnapshotStore, SubscriptionStore};
use crate::domain::{FilterConfig, Result, Subscription};
use std::sync::Arc;

/// What happened to the notification of one poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// The change detection found nothing to report
    NothingToReport,
    Sent,
    /// Something to report, but notifications are disabled
    Muted,
    /// Delivery failed; the snapshot was stored anyway
    Failed(String),
}

/// Result of polling one subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollReport {
    pub key: String,
    pub slot_count: usize,
    /// Rendered notification, when there was something to report
    pub message: Option<String>,
    pub delivery: Delivery,
}

pub struct Poller {
    api: Arc<dyn RecupApi>,
    notifier: Arc<dyn Notifier>,
    subscriptions: Arc<SubscriptionStore>,
    snapshots: Arc<SnapshotStore>,
}

impl Poller {
    pub fn new(
        api: Arc<dyn RecupApi>,
        notifier: Arc<dyn Notifier>,
        subscriptions: Arc<SubscriptionStore>,
        snapshots: Arc<SnapshotStore>,
    ) -> Self {
        Self {
            api,
            notifier,
            subscriptions,
            snapshots,
        }
    }

    /// Polls with the subscription's own filter
    ///
    /// Expects the cycle's access token to have been acquired already.
    pub async fn poll(&self, subscription: &Subscription) -> Result<PollReport> {
        self.poll_with_filter(subscription, &subscription.filter).await
    }

    /// Polls with `min_changes_to_notify` forced to 0 so the current
    /// availability is always reported
    pub async fn check(&self, subscription: &Subscription) -> Result<PollReport> {
        let forced = FilterConfig {
            min_changes_to_notify: 0,
            ..subscription.filter.clone()
        };
        self.poll_with_filter(subscription, &forced).await
    }

    async fn poll_with_filter(
        &self,
        subscription: &Subscription,
        filter: &FilterConfig,
    ) -> Result<PollReport> {
        let key = subscription.key();
        let fiscal_code = &subscription.fiscal_code;
        let nre = &subscription.prescription_code;
        tracing::debug!(subscription = %key, "Polling subscription");

        let patient = self.api.patient(fiscal_code).await?;
        let process_id = self.api.process_id(fiscal_code).await?;
        self.api.check_prescription(&patient.id, nre).await?;
        let service = self.api.prescription_details(&patient.id, nre).await?;

        let mut refreshed = subscription.clone();
        if service.service_name.is_some() {
            refreshed.description = service.service_name.clone();
        }
        refreshed.patient = Some(patient.snapshot.clone());
        self.subscriptions
            .update_metadata(
                fiscal_code,
                nre,
                service.service_name.clone(),
                Some(patient.snapshot),
            )
            .await?;

        let query = AvailabilityQuery {
            patient_id: patient.id,
            process_id,
            nre: nre.clone(),
            order_id: service.order_id,
        };
        let slots = self.api.availabilities(&query).await?;
        let previous = self.snapshots.get(&key).await?;

        let message = detect_changes(&previous, &slots, filter)
            .map(|changes| changes.render(&NotificationHeader::for_subscription(&refreshed)));

        let delivery = match &message {
            None => Delivery::NothingToReport,
            Some(_) if !subscription.notifications_enabled => {
                tracing::info!(subscription = %key, "Changes detected, notifications disabled");
                Delivery::Muted
            }
            Some(text) => match self
                .notifier
                .send_message(&subscription.subscriber_id, text)
                .await
            {
                Ok(()) => {
                    tracing::info!(
                        subscription = %key,
                        subscriber = %subscription.subscriber_id,
                        "Notification sent"
                    );
                    Delivery::Sent
                }
                Err(e) => {
                    crate::log_error_with_context!(e, "Failed to deliver notification");
                    Delivery::Failed(e.to_string())
                }
            },
        };

        let slot_count = slots.len();
        self.snapshots.put(&key, slots).await?;

        Ok(PollReport {
            key,
            slot_count,
            message,
            delivery,
        })
    }
}
