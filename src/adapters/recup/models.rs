//! Booking service wire models
//!
//! Request bodies mirror what the mobile app sends. Response types are lenient:
//! every field the monitor does not strictly need is optional, and identifiers
//! are accepted as either JSON strings or numbers.

use crate::domain::{
    AvailabilitySlot, BookingRecord, ContactInfo, FiscalCode, Nre, PatientSnapshot, TeamCard,
    UNKNOWN_HOSPITAL,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Reads an identifier that may be a string or a number
fn deserialize_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| value_to_id(&v)))
}

pub(crate) fn value_to_id(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Reads a price that may be a number or a numeric string
fn deserialize_price<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.replace(',', ".").trim().parse().ok(),
        _ => None,
    })
}

/// Parses an ISO-8601 timestamp such as `2025-06-01T10:00:00Z`
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// OAuth token endpoint response
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Generic `{ "content": [...] }` page
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub content: Vec<T>,
}

/// Object carrying only an identifier
#[derive(Debug, Default, Deserialize)]
pub struct IdOnly {
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Named {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamCardDto {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressDto {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub street_number: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub town: Option<Named>,
    #[serde(default)]
    pub province: Option<IdOnly>,
}

impl AddressDto {
    /// Non-empty parts joined with spaces
    fn joined(&self) -> Option<String> {
        let parts = [
            self.address.clone(),
            self.street_number.clone(),
            self.postal_code.clone(),
            self.town.as_ref().and_then(|t| t.name.clone()),
            self.province.as_ref().and_then(|p| p.id.clone()),
        ];
        let joined = parts
            .into_iter()
            .flatten()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if joined.is_empty() {
            None
        } else {
            Some(joined)
        }
    }
}

/// Patient lookup entry
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientDto {
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub team_card: Option<TeamCardDto>,
    #[serde(default)]
    pub residence: Option<AddressDto>,
    #[serde(default)]
    pub domicile: Option<AddressDto>,
    #[serde(default)]
    pub birth_place: Option<Named>,
    #[serde(default)]
    pub birth_province: Option<IdOnly>,
    #[serde(default)]
    pub citizenship: Option<Named>,
}

impl PatientDto {
    /// Demographic snapshot stored on the subscription
    pub fn to_snapshot(&self) -> PatientSnapshot {
        let birth_place = match (
            self.birth_place.as_ref().and_then(|p| p.name.clone()),
            self.birth_province.as_ref().and_then(|p| p.id.clone()),
        ) {
            (Some(place), Some(province)) => Some(format!("{place}, {province}")),
            (Some(place), None) => Some(place),
            (None, Some(province)) => Some(province),
            (None, None) => None,
        };

        PatientSnapshot {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            birth_date: self.birth_date.clone(),
            team_card: self.team_card.as_ref().map(|c| TeamCard {
                code: c.code.clone(),
                valid_from: c.start_date.clone(),
                valid_to: c.end_date.clone(),
            }),
            residence: self.residence.as_ref().and_then(AddressDto::joined),
            domicile: self.domicile.as_ref().and_then(AddressDto::joined),
            birth_place,
            citizenship: self.citizenship.as_ref().and_then(|c| c.name.clone()),
        }
    }
}

/// Resolved patient
#[derive(Debug, Clone, PartialEq)]
pub struct PatientRecord {
    pub id: String,
    pub snapshot: PatientSnapshot,
}

#[derive(Debug, Deserialize)]
pub struct PrescriptionDetailsDto {
    #[serde(default)]
    pub details: Vec<PrescriptionDetailDto>,
}

#[derive(Debug, Deserialize)]
pub struct PrescriptionDetailDto {
    pub service: Option<ServiceDto>,
}

#[derive(Debug, Deserialize)]
pub struct ServiceDto {
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Service identifiers of a prescription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrescriptionService {
    /// Order id, sent as `orderIds` and in the booking `services`
    pub order_id: String,
    /// Service code, sent as `serviceCur` on prebooking
    pub service_code: String,
    pub service_name: Option<String>,
}

/// Availability search entry
#[derive(Debug, Deserialize)]
pub struct SlotDto {
    pub date: Option<String>,
    #[serde(default)]
    pub hospital: Option<HospitalDto>,
    #[serde(default)]
    pub site: Option<SiteDto>,
    #[serde(default, deserialize_with = "deserialize_price")]
    pub price: Option<f64>,
    #[serde(default)]
    pub diary: Option<IdOnly>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HospitalDto {
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SiteDto {
    #[serde(default)]
    pub address: Option<String>,
}

impl SlotDto {
    /// Converts to a domain slot; entries without a parseable date are dropped
    pub fn into_slot(self) -> Option<AvailabilitySlot> {
        let date = self.date.as_deref().and_then(parse_timestamp)?;
        let hospital = self.hospital.unwrap_or_default();
        Some(AvailabilitySlot {
            date,
            hospital_id: hospital.id.unwrap_or_else(|| UNKNOWN_HOSPITAL.to_string()),
            hospital_name: hospital.name.unwrap_or_else(|| "Unknown".to_string()),
            site_address: self
                .site
                .and_then(|s| s.address)
                .unwrap_or_else(|| "Unknown".to_string()),
            price: self.price,
            diary_id: self.diary.and_then(|d| d.id).unwrap_or_default(),
        })
    }
}

/// Inputs of the availability search
#[derive(Debug, Clone)]
pub struct AvailabilityQuery {
    pub patient_id: String,
    pub process_id: String,
    pub nre: Nre,
    pub order_id: String,
}

/// Prebooking (slot lock) request body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrebookingRequest {
    pub date: String,
    pub diary_id: String,
    pub request_id: String,
    pub supply_mode_id: String,
    pub extra_services: Vec<serde_json::Value>,
    pub service_cur: String,
    pub exemption_id: String,
    pub priority: String,
    pub nre: String,
    pub process_id: String,
    pub person_identifier: String,
}

impl PrebookingRequest {
    pub fn new(
        slot: &AvailabilitySlot,
        service_code: &str,
        nre: &Nre,
        process_id: &str,
        fiscal_code: &FiscalCode,
    ) -> Self {
        Self {
            date: slot.wire_date(),
            diary_id: slot.diary_id.clone(),
            request_id: "A0".to_string(),
            supply_mode_id: "A".to_string(),
            extra_services: Vec::new(),
            service_cur: service_code.to_string(),
            exemption_id: "NE00".to_string(),
            priority: "P".to_string(),
            nre: nre.to_string(),
            process_id: process_id.to_string(),
            person_identifier: fiscal_code.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactsBody {
    pub phone_number: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRef {
    pub id: String,
    pub request_id: String,
}

/// Booking confirmation request body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteBookingRequest {
    pub prescription_number: String,
    pub process_id: String,
    pub diary_id: String,
    pub contacts: ContactsBody,
    pub start_time: String,
    pub services: Vec<ServiceRef>,
    pub lock_id: String,
    pub person_identifier: String,
    pub status: String,
    pub supply_mode_id: String,
}

impl CompleteBookingRequest {
    /// Confirms `slot` under `lock_id` for the prescription's first order
    pub fn new(
        slot: &AvailabilitySlot,
        lock_id: &str,
        order_id: &str,
        nre: &Nre,
        process_id: &str,
        fiscal_code: &FiscalCode,
        contact: &ContactInfo,
    ) -> Self {
        Self {
            prescription_number: nre.to_string(),
            process_id: process_id.to_string(),
            diary_id: slot.diary_id.clone(),
            contacts: ContactsBody {
                phone_number: contact.phone().to_string(),
                email: contact.email().to_string(),
            },
            start_time: slot.wire_date(),
            services: vec![ServiceRef {
                id: order_id.to_string(),
                request_id: "A0".to_string(),
            }],
            lock_id: lock_id.to_string(),
            person_identifier: fiscal_code.to_string(),
            status: "PRENOTATA".to_string(),
            supply_mode_id: "A".to_string(),
        }
    }
}

/// One entry of the cancellation PATCH body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationEntry {
    pub reason_id: u32,
    pub booking_status: String,
    pub identified_by: String,
    pub identifier: String,
}

impl CancellationEntry {
    pub fn for_booking(booking_id: &str) -> Self {
        Self {
            reason_id: 4,
            booking_status: "ELIMINATA".to_string(),
            identified_by: "ID_DI_SISTEMA".to_string(),
            identifier: booking_id.to_string(),
        }
    }
}

/// Booking search request body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingSearchRequest {
    pub fiscal_code: String,
    pub statuses: Vec<String>,
}

impl BookingSearchRequest {
    pub fn active(fiscal_code: &FiscalCode) -> Self {
        Self {
            fiscal_code: fiscal_code.to_string(),
            statuses: vec!["PRENOTATA".to_string(), "PRESA_IN_CARICO".to_string()],
        }
    }
}

/// Booking search entry
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteBookingDto {
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub hospital: Option<Named>,
    #[serde(default)]
    pub site: Option<SiteDto>,
    #[serde(default)]
    pub services: Vec<ServiceDto>,
}

impl RemoteBookingDto {
    /// Converts to a booking record; entries without id or start time are dropped
    pub fn into_record(self) -> Option<BookingRecord> {
        let booking_id = self.id?;
        let date = self.start_time.as_deref().and_then(parse_timestamp)?;
        Some(BookingRecord {
            booking_id,
            date,
            hospital_name: self
                .hospital
                .and_then(|h| h.name)
                .unwrap_or_else(|| "Unknown hospital".to_string()),
            address: self
                .site
                .and_then(|s| s.address)
                .unwrap_or_else(|| "Unknown address".to_string()),
            service_name: self
                .services
                .into_iter()
                .next()
                .and_then(|s| s.description)
                .unwrap_or_else(|| "Unknown service".to_string()),
        })
    }
}

/// Booking id from a confirmation response: top-level `id`, then `content[0].id`
pub fn extract_booking_id(body: &serde_json::Value) -> Option<String> {
    body.get("id").and_then(value_to_id).or_else(|| {
        body.get("content")
            .and_then(|c| c.get(0))
            .and_then(|first| first.get("id"))
            .and_then(value_to_id)
    })
}

/// Messages of a cancellation response; a missing list counts as empty
pub fn extract_messages(body: &serde_json::Value) -> Vec<String> {
    body.get("_messages")
        .and_then(|m| m.as_array())
        .map(|messages| {
            messages
                .iter()
                .map(|m| match m {
                    serde_json::Value::String(s) => s.clone(),
                    other => other
                        .get("message")
                        .and_then(|t| t.as_str())
                        .map(str::to_string)
                        .unwrap_or_else(|| other.to_string()),
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_slot_dto_conversion() {
        let dto: SlotDto = serde_json::from_value(json!({
            "date": "2025-06-01T10:00:00Z",
            "hospital": {"id": 120, "name": "Ospedale San Camillo"},
            "site": {"address": "Circonvallazione Gianicolense 87"},
            "price": 36.15,
            "diary": {"id": "D-77"}
        }))
        .unwrap();

        let slot = dto.into_slot().unwrap();
        assert_eq!(slot.hospital_id, "120");
        assert_eq!(slot.hospital_name, "Ospedale San Camillo");
        assert_eq!(slot.price, Some(36.15));
        assert_eq!(slot.diary_id, "D-77");
        assert_eq!(slot.wire_date(), "2025-06-01T10:00:00Z");
    }

    #[test]
    fn test_slot_without_hospital_id_is_unknown() {
        let dto: SlotDto = serde_json::from_value(json!({
            "date": "2025-06-01T10:00:00Z",
            "hospital": {"name": "Policlinico"},
            "price": "23,50"
        }))
        .unwrap();
        let slot = dto.into_slot().unwrap();
        assert_eq!(slot.hospital_id, UNKNOWN_HOSPITAL);
        assert_eq!(slot.price, Some(23.5));
    }

    #[test]
    fn test_slot_with_bad_date_is_dropped() {
        let dto: SlotDto = serde_json::from_value(json!({"date": "tomorrow"})).unwrap();
        assert!(dto.into_slot().is_none());
    }

    #[test]
    fn test_patient_snapshot_joins_address_parts() {
        let dto: PatientDto = serde_json::from_value(json!({
            "id": "P1",
            "firstName": "Mario",
            "lastName": "Rossi",
            "teamCard": {"code": "80380", "startDate": "2020-01-01", "endDate": "2030-01-01"},
            "residence": {
                "address": "Via Roma",
                "streetNumber": "1",
                "postalCode": "00100",
                "town": {"name": "Roma"},
                "province": {"id": "RM"}
            },
            "domicile": {"address": ""},
            "birthPlace": {"name": "Roma"},
            "birthProvince": {"id": "RM"},
            "citizenship": {"name": "Italiana"}
        }))
        .unwrap();

        let snapshot = dto.to_snapshot();
        assert_eq!(snapshot.residence.as_deref(), Some("Via Roma 1 00100 Roma RM"));
        assert_eq!(snapshot.domicile, None);
        assert_eq!(snapshot.birth_place.as_deref(), Some("Roma, RM"));
        assert_eq!(snapshot.team_card_code(), Some("80380"));
        assert_eq!(snapshot.citizenship.as_deref(), Some("Italiana"));
    }

    #[test]
    fn test_extract_booking_id_prefers_top_level() {
        let body = json!({"id": "B1", "content": [{"id": "B2"}]});
        assert_eq!(extract_booking_id(&body).as_deref(), Some("B1"));
    }

    #[test]
    fn test_extract_booking_id_nested() {
        let body = json!({"content": [{"id": 9001}]});
        assert_eq!(extract_booking_id(&body).as_deref(), Some("9001"));
        assert_eq!(extract_booking_id(&json!({"content": []})), None);
        assert_eq!(extract_booking_id(&json!({})), None);
    }

    #[test]
    fn test_extract_messages() {
        assert!(extract_messages(&json!({"_messages": []})).is_empty());
        assert!(extract_messages(&json!({})).is_empty());
        let messages = extract_messages(&json!({
            "_messages": ["plain", {"message": "structured"}, {"code": 7}]
        }));
        assert_eq!(messages, vec!["plain", "structured", "{\"code\":7}"]);
    }

    #[test]
    fn test_prebooking_body_shape() {
        let slot: AvailabilitySlot = serde_json::from_value(json!({
            "date": "2025-06-01T10:00:00Z",
            "hospital_id": "H1",
            "diary_id": "D1"
        }))
        .unwrap();
        let req = PrebookingRequest::new(
            &slot,
            "89.7",
            &Nre::new("1200A4012345678").unwrap(),
            "PROC",
            &FiscalCode::new("RSSMRA80A01H501U").unwrap(),
        );
        let body = serde_json::to_value(req).unwrap();
        assert_eq!(body["date"], "2025-06-01T10:00:00Z");
        assert_eq!(body["diaryId"], "D1");
        assert_eq!(body["requestId"], "A0");
        assert_eq!(body["serviceCur"], "89.7");
        assert_eq!(body["exemptionId"], "NE00");
        assert_eq!(body["personIdentifier"], "RSSMRA80A01H501U");
        assert_eq!(body["extraServices"], json!([]));
    }

    #[test]
    fn test_remote_booking_conversion() {
        let dto: RemoteBookingDto = serde_json::from_value(json!({
            "id": 55,
            "startTime": "2025-07-01T08:30:00Z",
            "hospital": {"name": "Sant'Andrea"},
            "services": [{"description": "Visita cardiologica"}]
        }))
        .unwrap();
        let record = dto.into_record().unwrap();
        assert_eq!(record.booking_id, "55");
        assert_eq!(record.address, "Unknown address");
        assert_eq!(record.service_name, "Visita cardiologica");
    }
}
