//! Appointment availability slots
//!
//! An [`AvailabilitySlot`] is one concrete appointment opportunity returned by the
//! availability search. Slots are never mutated; each poll replaces the whole list.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Hospital id used when the service omits one
pub const UNKNOWN_HOSPITAL: &str = "unknown";

/// One bookable appointment instance
///
/// Identity for change detection is `(hospital_id, date)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    /// Appointment start, serialized as an ISO-8601 `Z` timestamp
    pub date: DateTime<Utc>,

    #[serde(default = "default_hospital_id")]
    pub hospital_id: String,

    #[serde(default)]
    pub hospital_name: String,

    #[serde(default)]
    pub site_address: String,

    #[serde(default)]
    pub price: Option<f64>,

    /// Scheduling-line identifier, needed for prebooking
    #[serde(default)]
    pub diary_id: String,
}

fn default_hospital_id() -> String {
    UNKNOWN_HOSPITAL.to_string()
}

impl AvailabilitySlot {
    /// Price as shown to subscribers
    pub fn price_label(&self) -> String {
        match self.price {
            Some(p) => format!("{p:.2} €"),
            None => "N/A".to_string(),
        }
    }

    /// The appointment start in the wire format used by the booking endpoints
    pub fn wire_date(&self) -> String {
        self.date.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

/// Sorts slots ascending by date; equal dates keep their relative order
pub fn sort_by_date(slots: &mut [AvailabilitySlot]) {
    slots.sort_by_key(|s| s.date);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn slot(hospital: &str, h: u32, price: Option<f64>) -> AvailabilitySlot {
        AvailabilitySlot {
            date: Utc.with_ymd_and_hms(2025, 6, 1, h, 0, 0).unwrap(),
            hospital_id: hospital.to_string(),
            hospital_name: format!("Hospital {hospital}"),
            site_address: "Via Roma 1".to_string(),
            price,
            diary_id: "D1".to_string(),
        }
    }

    #[test]
    fn test_missing_hospital_id_defaults_to_unknown() {
        let json = r#"{"date":"2025-06-01T10:00:00Z","hospital_name":"San Camillo"}"#;
        let slot: AvailabilitySlot = serde_json::from_str(json).unwrap();
        assert_eq!(slot.hospital_id, UNKNOWN_HOSPITAL);
        assert_eq!(slot.price, None);
    }

    #[test]
    fn test_date_serializes_with_z_suffix() {
        let json = serde_json::to_value(slot("H1", 10, Some(36.15))).unwrap();
        assert_eq!(json["date"], "2025-06-01T10:00:00Z");
    }

    #[test]
    fn test_sort_by_date_is_stable() {
        let mut slots = vec![slot("B", 11, None), slot("A", 10, None), slot("C", 10, None)];
        sort_by_date(&mut slots);
        let order: Vec<_> = slots.iter().map(|s| s.hospital_id.as_str()).collect();
        assert_eq!(order, vec!["A", "C", "B"]);
    }

    #[test]
    fn test_labels() {
        assert_eq!(slot("H1", 10, Some(36.15)).price_label(), "36.15 €");
        assert_eq!(slot("H1", 10, None).price_label(), "N/A");
        assert_eq!(slot("H1", 9, None).wire_date(), "2025-06-01T09:00:00Z");
    }
}
