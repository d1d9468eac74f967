//! Watched prescriptions

use super::json_file::JsonFile;
use crate::domain::{
    BookingRecord, FilterConfig, FiscalCode, Nre, PatientSnapshot, RecupError, Result,
    SubscriberId, Subscription,
};
use std::path::PathBuf;

/// Subscription list persisted as a JSON array
pub struct SubscriptionStore {
    file: JsonFile<Vec<Subscription>>,
}

impl SubscriptionStore {
    pub fn new(path: impl Into<PathBuf>, fallback_dir: Option<PathBuf>) -> Self {
        Self {
            file: JsonFile::new(path, fallback_dir),
        }
    }

    /// Every stored subscription, with out-of-range filters clamped
    pub async fn all(&self) -> Result<Vec<Subscription>> {
        let mut subs = self.file.load().await?;
        for sub in &mut subs {
            let clamped = sub.filter.clamped();
            if clamped != sub.filter {
                tracing::warn!(
                    subscription = %sub.key(),
                    months_limit = ?sub.filter.months_limit,
                    min_changes_to_notify = sub.filter.min_changes_to_notify,
                    "Stored filter out of range, clamping"
                );
                sub.filter = clamped;
            }
        }
        Ok(subs)
    }

    /// Every subscription for the administrator, otherwise the subscriber's own
    pub async fn visible_to(&self, subscriber: &SubscriberId, admin: bool) -> Result<Vec<Subscription>> {
        let all = self.all().await?;
        if admin {
            return Ok(all);
        }
        Ok(all
            .into_iter()
            .filter(|s| &s.subscriber_id == subscriber)
            .collect())
    }

    pub async fn get(&self, fiscal_code: &FiscalCode, nre: &Nre) -> Result<Option<Subscription>> {
        Ok(self
            .all()
            .await?
            .into_iter()
            .find(|s| s.matches(fiscal_code, nre)))
    }

    /// Adds a subscription; a duplicate `(fiscal code, NRE)` pair is rejected
    pub async fn add(&self, subscription: Subscription) -> Result<()> {
        subscription.filter.validate().map_err(RecupError::Validation)?;

        let key = subscription.key();
        self.file
            .update(move |subs| {
                if subs
                    .iter()
                    .any(|s| s.matches(&subscription.fiscal_code, &subscription.prescription_code))
                {
                    return Err(RecupError::Validation(format!(
                        "Prescription {} is already monitored for {}",
                        subscription.prescription_code, subscription.fiscal_code
                    )));
                }
                subs.push(subscription);
                Ok(())
            })
            .await?;

        tracing::info!(subscription = %key, "Subscription added");
        Ok(())
    }

    /// Removes and returns the subscription, if present
    pub async fn remove(&self, fiscal_code: &FiscalCode, nre: &Nre) -> Result<Option<Subscription>> {
        let removed = self
            .file
            .update(|subs| {
                Ok(subs
                    .iter()
                    .position(|s| s.matches(fiscal_code, nre))
                    .map(|i| subs.remove(i)))
            })
            .await?;

        if let Some(sub) = &removed {
            tracing::info!(subscription = %sub.key(), "Subscription removed");
        }
        Ok(removed)
    }

    /// Writes back what a poll learned; `None` leaves a field unchanged
    pub async fn update_metadata(
        &self,
        fiscal_code: &FiscalCode,
        nre: &Nre,
        description: Option<String>,
        patient: Option<PatientSnapshot>,
    ) -> Result<bool> {
        self.modify(fiscal_code, nre, move |sub| {
            if let Some(description) = description {
                sub.description = Some(description);
            }
            if let Some(patient) = patient {
                sub.patient = Some(patient);
            }
        })
        .await
    }

    pub async fn set_notifications(
        &self,
        fiscal_code: &FiscalCode,
        nre: &Nre,
        enabled: bool,
    ) -> Result<bool> {
        self.modify(fiscal_code, nre, move |sub| sub.notifications_enabled = enabled)
            .await
    }

    pub async fn set_filter(
        &self,
        fiscal_code: &FiscalCode,
        nre: &Nre,
        filter: FilterConfig,
    ) -> Result<bool> {
        filter.validate().map_err(RecupError::Validation)?;
        self.modify(fiscal_code, nre, move |sub| sub.filter = filter)
            .await
    }

    pub async fn add_booking(
        &self,
        fiscal_code: &FiscalCode,
        nre: &Nre,
        booking: BookingRecord,
    ) -> Result<bool> {
        self.modify(fiscal_code, nre, move |sub| {
            sub.bookings.retain(|b| b.booking_id != booking.booking_id);
            sub.bookings.push(booking);
        })
        .await
    }

    /// Drops the booking with this id from whichever subscription holds it
    ///
    /// Returns the key of the subscription it was removed from.
    pub async fn remove_booking(&self, booking_id: &str) -> Result<Option<String>> {
        self.file
            .update(|subs| {
                for sub in subs.iter_mut() {
                    let before = sub.bookings.len();
                    sub.bookings.retain(|b| b.booking_id != booking_id);
                    if sub.bookings.len() != before {
                        return Ok(Some(sub.key()));
                    }
                }
                Ok(None)
            })
            .await
    }

    /// Applies `f` to the matching subscription; false when there is none
    async fn modify<F>(&self, fiscal_code: &FiscalCode, nre: &Nre, f: F) -> Result<bool>
    where
        F: FnOnce(&mut Subscription) + Send,
    {
        self.file
            .update(|subs| match subs.iter_mut().find(|s| s.matches(fiscal_code, nre)) {
                Some(sub) => {
                    f(sub);
                    Ok(true)
                }
                None => Ok(false),
            })
            .await
    }
}
