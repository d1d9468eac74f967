//! Subscription domain model
//!
//! A [`Subscription`] is one watched `(fiscal code, prescription)` pair together
//! with its notification policy and the bookings made through it.

use super::ids::{FiscalCode, Nre, SubscriberId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-subscription notification policy
///
/// Defaults are fixed when the subscription is created and stored with it; the
/// change-detection engine never fills in missing values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Ignore price-only changes; a single new date is always significant
    #[serde(default = "default_only_new_dates")]
    pub only_new_dates: bool,

    #[serde(default)]
    pub notify_removed: bool,

    #[serde(default = "default_min_changes_to_notify")]
    pub min_changes_to_notify: u32,

    /// Window for treating a same-day time shift as the same slot
    #[serde(default = "default_time_threshold_minutes")]
    pub time_threshold_minutes: u32,

    #[serde(default = "default_show_all_current")]
    pub show_all_current: bool,

    /// Only consider slots within this many 30-day months from now
    #[serde(default)]
    pub months_limit: Option<u32>,
}

fn default_only_new_dates() -> bool {
    true
}

fn default_min_changes_to_notify() -> u32 {
    2
}

fn default_time_threshold_minutes() -> u32 {
    60
}

fn default_show_all_current() -> bool {
    true
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            only_new_dates: default_only_new_dates(),
            notify_removed: false,
            min_changes_to_notify: default_min_changes_to_notify(),
            time_threshold_minutes: default_time_threshold_minutes(),
            show_all_current: default_show_all_current(),
            months_limit: None,
        }
    }
}

impl FilterConfig {
    /// Largest accepted months limit
    pub const MAX_MONTHS_LIMIT: u32 = 24;

    /// Validate the filter configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.min_changes_to_notify == 0 {
            return Err("min_changes_to_notify must be at least 1".to_string());
        }

        if let Some(months) = self.months_limit {
            if months == 0 || months > Self::MAX_MONTHS_LIMIT {
                return Err(format!(
                    "months_limit must be between 1 and {}",
                    Self::MAX_MONTHS_LIMIT
                ));
            }
        }

        Ok(())
    }

    /// Brings stored values back into the accepted ranges
    ///
    /// Files may be edited by hand, so filters read from disk are clamped
    /// rather than trusted.
    pub fn clamped(&self) -> Self {
        Self {
            min_changes_to_notify: self.min_changes_to_notify.max(1),
            months_limit: self
                .months_limit
                .map(|m| m.clamp(1, Self::MAX_MONTHS_LIMIT)),
            ..self.clone()
        }
    }
}

/// Demographic data cached from the last patient lookup
///
/// Advisory only: shown to users and in notification headers, never used for
/// decisions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientSnapshot {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: Option<String>,
    pub team_card: Option<TeamCard>,
    pub residence: Option<String>,
    pub domicile: Option<String>,
    pub birth_place: Option<String>,
    pub citizenship: Option<String>,
}

/// Health insurance card details
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamCard {
    pub code: Option<String>,
    pub valid_from: Option<String>,
    pub valid_to: Option<String>,
}

impl PatientSnapshot {
    /// Health card code, if known
    pub fn team_card_code(&self) -> Option<&str> {
        self.team_card.as_ref().and_then(|c| c.code.as_deref())
    }

    /// "First Last" when at least one part is known
    pub fn full_name(&self) -> Option<String> {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

/// A confirmed booking made through a subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRecord {
    pub booking_id: String,
    pub date: DateTime<Utc>,
    pub hospital_name: String,
    pub address: String,
    pub service_name: String,
}

/// A watched prescription
///
/// # Examples
///
/// ```
/// use recup_monitor::domain::{FilterConfig, FiscalCode, Nre, SubscriberId, Subscription};
///
/// let sub = Subscription::new(
///     FiscalCode::new("RSSMRA80A01H501U").unwrap(),
///     Nre::new("1200A4012345678").unwrap(),
///     SubscriberId::new("42").unwrap(),
///     FilterConfig::default(),
/// );
/// assert_eq!(sub.key(), "RSSMRA80A01H501U_1200A4012345678");
/// assert!(sub.notifications_enabled);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub fiscal_code: FiscalCode,

    #[serde(rename = "nre")]
    pub prescription_code: Nre,

    pub subscriber_id: SubscriberId,

    #[serde(default = "default_notifications_enabled")]
    pub notifications_enabled: bool,

    /// Service name resolved by the last successful poll
    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub filter: FilterConfig,

    #[serde(default)]
    pub patient: Option<PatientSnapshot>,

    #[serde(default)]
    pub bookings: Vec<BookingRecord>,
}

fn default_notifications_enabled() -> bool {
    true
}

impl Subscription {
    /// Creates a subscription with notifications enabled and no bookings
    pub fn new(
        fiscal_code: FiscalCode,
        prescription_code: Nre,
        subscriber_id: SubscriberId,
        filter: FilterConfig,
    ) -> Self {
        Self {
            fiscal_code,
            prescription_code,
            subscriber_id,
            notifications_enabled: true,
            description: None,
            filter,
            patient: None,
            bookings: Vec::new(),
        }
    }

    /// Store key shared by the subscription and snapshot files
    pub fn key(&self) -> String {
        subscription_key(&self.fiscal_code, &self.prescription_code)
    }

    /// Whether this subscription watches the given pair
    pub fn matches(&self, fiscal_code: &FiscalCode, nre: &Nre) -> bool {
        &self.fiscal_code == fiscal_code && &self.prescription_code == nre
    }

    /// Description or a placeholder when the service name is not yet known
    pub fn display_name(&self) -> &str {
        self.description.as_deref().unwrap_or("Unknown prescription")
    }
}

/// Builds the `{fiscal_code}_{nre}` key
pub fn subscription_key(fiscal_code: &FiscalCode, nre: &Nre) -> String {
    format!("{}_{}", fiscal_code, nre)
}
