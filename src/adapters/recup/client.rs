//! HTTP implementation of the booking service
//!
//! Data endpoints authenticate with the Basic credential the mobile app uses;
//! the client-credentials token is fetched separately through
//! [`RecupApi::access_token`].

use super::api::{AccessToken, RecupApi};
use super::models::{
    extract_booking_id, extract_messages, AvailabilityQuery, BookingSearchRequest,
    CancellationEntry, CompleteBookingRequest, IdOnly, Page, PatientDto, PatientRecord,
    PrebookingRequest, PrescriptionDetailsDto, PrescriptionService, RemoteBookingDto, SlotDto,
    TokenResponse,
};
use crate::config::{secret_string, RecupApiConfig, RetryConfig};
use crate::domain::{
    ApiError, AvailabilitySlot, BookingRecord, FiscalCode, Nre, RecupError, Result,
};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, AUTHORIZATION};
use reqwest::{Client, ClientBuilder, RequestBuilder, Response, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

const PATIENTS_PATH: &str = "api/v3/system-apis/patients";
const DOCTORS_PATH: &str = "api/v4/experience-apis/doctors/bpx";
const CHECK_PRESCRIPTION_PATH: &str =
    "api/v3/experience-apis/citizens/prescriptions/check-prescription";
const AVAILABILITIES_PATH: &str = "api/v3/experience-apis/citizens/availabilities";
const BOOKINGS_PATH: &str = "api/v4/process-apis/booking-management/bookings";
const BOOKINGS_V3_PATH: &str = "api/v3/process-apis/booking-management/bookings";

/// reqwest-backed [`RecupApi`]
///
/// # Example
///
/// ```no_run
/// use recup_monitor::adapters::recup::RecupHttpClient;
/// use recup_monitor::config::load_config;
///
/// # fn example() -> recup_monitor::domain::Result<()> {
/// let config = load_config("recup.toml")?;
/// let client = RecupHttpClient::new(config.recup)?;
/// println!("talking to {}", client.base_url());
/// # Ok(())
/// # }
/// ```
pub struct RecupHttpClient {
    client: Client,
    base_url: Url,
    config: RecupApiConfig,
}

impl RecupHttpClient {
    /// Builds the client with the configured timeouts and user agent
    pub fn new(config: RecupApiConfig) -> Result<Self> {
        let base = format!("{}/", config.base_url.trim_end_matches('/'));
        let base_url = Url::parse(&base).map_err(|e| {
            RecupError::Configuration(format!("Invalid recup.base_url '{}': {e}", config.base_url))
        })?;

        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| RecupError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| RecupError::Configuration(format!("Invalid endpoint path {path}: {e}")))
    }

    fn basic(user: &str, password: &str) -> String {
        let encoded = general_purpose::STANDARD.encode(format!("{user}:{password}"));
        format!("Basic {encoded}")
    }

    fn api_auth_header(&self) -> String {
        Self::basic(
            &self.config.api_username,
            self.config.api_password.expose_secret().as_ref(),
        )
    }

    /// Common headers of every data request
    fn decorate(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(AUTHORIZATION, self.api_auth_header())
            .header(ACCEPT, "*/*")
            .header(ACCEPT_LANGUAGE, self.config.accept_language.as_str())
    }

    /// Retry a request with exponential backoff
    ///
    /// Only transient failures are retried.
    async fn retry_request<F, T, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let retry = &self.config.retry;
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_transient() && attempt < retry.max_retries => {
                    attempt += 1;
                    let delay_ms = backoff_delay_ms(retry, attempt);
                    crate::log_retry_attempt!(attempt, retry.max_retries, e);
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn get_json<T>(&self, url: Url, query: &[(&str, String)]) -> Result<T>
    where
        T: DeserializeOwned + Send,
    {
        self.retry_request(|| async {
            let response = self
                .decorate(self.client.get(url.clone()).query(query))
                .send()
                .await
                .map_err(send_error)?;
            read_json(response).await
        })
        .await
    }

    async fn post_json<B, T>(&self, url: Url, body: &B) -> Result<T>
    where
        B: serde::Serialize + Sync,
        T: DeserializeOwned + Send,
    {
        self.retry_request(|| async {
            let response = self
                .decorate(self.client.post(url.clone()).json(body))
                .send()
                .await
                .map_err(send_error)?;
            read_json(response).await
        })
        .await
    }
}

/// Delay before retry number `attempt` (1-based)
pub(crate) fn backoff_delay_ms(retry: &RetryConfig, attempt: usize) -> u64 {
    let exponent = attempt.saturating_sub(1) as i32;
    let delay = retry.initial_delay_ms as f64 * retry.backoff_multiplier.powi(exponent);
    (delay as u64).min(retry.max_delay_ms)
}

fn send_error(e: reqwest::Error) -> RecupError {
    if e.is_timeout() {
        ApiError::Timeout(e.to_string()).into()
    } else {
        ApiError::ConnectionFailed(e.to_string()).into()
    }
}

async fn body_text(response: Response) -> String {
    response.text().await.unwrap_or_default().trim().to_string()
}

/// Success body as JSON, or the status classified as an [`ApiError`]
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = body_text(response).await;
        return Err(ApiError::from_status(status.as_u16(), body).into());
    }
    response
        .json::<T>()
        .await
        .map_err(|e| ApiError::InvalidResponse(e.to_string()).into())
}

/// Rejects anything but `expected` as a state conflict for a mutating step
async fn require_status(
    response: Response,
    expected: StatusCode,
    operation: &str,
) -> Result<Response> {
    let status = response.status();
    if status == expected {
        return Ok(response);
    }
    let body = body_text(response).await;
    tracing::error!(
        operation,
        status = status.as_u16(),
        expected = expected.as_u16(),
        body = %body,
        "Booking service rejected request"
    );
    Err(ApiError::StateConflict {
        operation: operation.to_string(),
        status: status.as_u16(),
        message: if body.is_empty() {
            status.to_string()
        } else {
            body
        },
    }
    .into())
}

#[derive(Debug, Deserialize)]
struct AvailabilityPage {
    content: Option<Vec<SlotDto>>,
}

#[async_trait]
impl RecupApi for RecupHttpClient {
    async fn access_token(&self) -> Result<AccessToken> {
        let url = Url::parse(&self.config.token_url).map_err(|e| {
            RecupError::Configuration(format!("Invalid recup.token_url: {e}"))
        })?;
        let auth = Self::basic(
            &self.config.token_client_id,
            self.config.token_client_secret.expose_secret().as_ref(),
        );

        let token: TokenResponse = self
            .retry_request(|| async {
                let response = self
                    .client
                    .post(url.clone())
                    .header(AUTHORIZATION, auth.as_str())
                    .header(ACCEPT, "application/json")
                    .form(&[("grant_type", "client_credentials")])
                    .send()
                    .await
                    .map_err(send_error)?;

                let status = response.status();
                if !status.is_success() {
                    let body = body_text(response).await;
                    let err = if status.is_server_error() {
                        ApiError::ServerError {
                            status: status.as_u16(),
                            message: body,
                        }
                    } else {
                        ApiError::Authentication(format!(
                            "token endpoint returned {status}: {body}"
                        ))
                    };
                    return Err(err.into());
                }

                response.json::<TokenResponse>().await.map_err(|e| {
                    ApiError::Authentication(format!("unreadable token response: {e}")).into()
                })
            })
            .await?;

        if token.access_token.is_empty() {
            return Err(ApiError::Authentication("empty access token".to_string()).into());
        }

        tracing::debug!(expires_in = ?token.expires_in, "Access token acquired");
        Ok(AccessToken {
            value: secret_string(token.access_token),
            acquired_at: Utc::now(),
            expires_in: token.expires_in,
        })
    }

    async fn patient(&self, fiscal_code: &FiscalCode) -> Result<PatientRecord> {
        let url = self.endpoint(PATIENTS_PATH)?;
        let page: Page<PatientDto> = self
            .get_json(url, &[("fiscalCode", fiscal_code.to_string())])
            .await?;

        let patient = page.content.into_iter().next().ok_or_else(|| {
            ApiError::Resolution(format!("No patient found for fiscal code {fiscal_code}"))
        })?;
        let id = patient.id.clone().ok_or_else(|| {
            ApiError::Resolution(format!("Patient record for {fiscal_code} has no id"))
        })?;

        Ok(PatientRecord {
            id,
            snapshot: patient.to_snapshot(),
        })
    }

    async fn process_id(&self, fiscal_code: &FiscalCode) -> Result<String> {
        let url = self.endpoint(DOCTORS_PATH)?;
        let body = serde_json::json!({ "personIdentifier": fiscal_code.as_str() });
        let doctor: IdOnly = self.post_json(url, &body).await?;

        doctor.id.ok_or_else(|| {
            ApiError::Resolution(format!("No attending doctor found for {fiscal_code}")).into()
        })
    }

    async fn check_prescription(&self, patient_id: &str, nre: &Nre) -> Result<()> {
        let url = self.endpoint(CHECK_PRESCRIPTION_PATH)?;
        let result: Option<serde_json::Value> = self
            .get_json(
                url,
                &[("patientId", patient_id.to_string()), ("nre", nre.to_string())],
            )
            .await?;

        let checkable = match result {
            None | Some(serde_json::Value::Null) => false,
            Some(serde_json::Value::Object(map)) => !map.is_empty(),
            Some(serde_json::Value::Array(items)) => !items.is_empty(),
            Some(serde_json::Value::Bool(flag)) => flag,
            Some(_) => true,
        };

        if checkable {
            Ok(())
        } else {
            Err(ApiError::Resolution(format!("Prescription {nre} could not be verified")).into())
        }
    }

    async fn prescription_details(
        &self,
        patient_id: &str,
        nre: &Nre,
    ) -> Result<PrescriptionService> {
        let url = self.endpoint(&format!("api/v3/system-apis/prescriptions/{nre}"))?;
        let details: PrescriptionDetailsDto = self
            .get_json(url, &[("patientId", patient_id.to_string())])
            .await?;

        let service = details
            .details
            .into_iter()
            .next()
            .and_then(|d| d.service)
            .ok_or_else(|| {
                ApiError::Resolution(format!("Prescription {nre} has no service details"))
            })?;

        match (service.id, service.code) {
            (Some(order_id), Some(service_code)) => Ok(PrescriptionService {
                order_id,
                service_code,
                service_name: service.description.filter(|d| !d.trim().is_empty()),
            }),
            _ => Err(ApiError::Resolution(format!(
                "Prescription {nre} service is missing its id or code"
            ))
            .into()),
        }
    }

    async fn availabilities(&self, query: &AvailabilityQuery) -> Result<Vec<AvailabilitySlot>> {
        let url = self.endpoint(AVAILABILITIES_PATH)?;
        let params = [
            ("personId", query.patient_id.clone()),
            ("processId", query.process_id.clone()),
            ("nre", query.nre.to_string()),
            ("orderIds", query.order_id.clone()),
            ("prescriptionPriority", "P".to_string()),
            ("firstBy", "hospital-best-10".to_string()),
        ];
        let page: AvailabilityPage = self.get_json(url, &params).await?;

        let entries = page.content.ok_or_else(|| {
            ApiError::Resolution(format!(
                "No availability data for {}; the prescription may already be booked",
                query.nre
            ))
        })?;

        let total = entries.len();
        let slots: Vec<AvailabilitySlot> =
            entries.into_iter().filter_map(SlotDto::into_slot).collect();
        if slots.len() < total {
            tracing::warn!(
                nre = %query.nre,
                dropped = total - slots.len(),
                "Ignoring availability entries without a valid date"
            );
        }
        Ok(slots)
    }

    async fn prebook(&self, request: &PrebookingRequest) -> Result<String> {
        let url = self.endpoint(&format!("{DOCTORS_PATH}/{}/prebooking", request.process_id))?;
        let response = self
            .decorate(self.client.post(url).json(request))
            .send()
            .await
            .map_err(send_error)?;
        let response = require_status(response, StatusCode::CREATED, "prebooking").await?;

        let lock: IdOnly = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("prebooking response: {e}")))?;
        lock.id.ok_or_else(|| {
            ApiError::InvalidResponse("prebooking response has no lock id".to_string()).into()
        })
    }

    async fn complete_booking(&self, request: &CompleteBookingRequest) -> Result<String> {
        let url = self.endpoint(BOOKINGS_PATH)?;
        let response = self
            .decorate(self.client.post(url).json(request))
            .send()
            .await
            .map_err(send_error)?;
        let response = require_status(response, StatusCode::OK, "booking confirmation").await?;

        let body: serde_json::Value = response.json().await.map_err(|e| {
            ApiError::InvalidResponse(format!("booking confirmation response: {e}"))
        })?;
        extract_booking_id(&body).ok_or_else(|| {
            tracing::warn!(response = %body, "Booking confirmation without booking id");
            ApiError::InvalidResponse("booking confirmation response has no booking id".to_string())
                .into()
        })
    }

    async fn booking_document(&self, booking_id: &str) -> Result<Vec<u8>> {
        let url = self.endpoint(&format!("{BOOKINGS_V3_PATH}/{booking_id}/documents"))?;
        self.retry_request(|| async {
            let response = self
                .decorate(self.client.get(url.clone()))
                .send()
                .await
                .map_err(send_error)?;
            let status = response.status();
            if status != StatusCode::OK {
                let body = body_text(response).await;
                return Err(ApiError::from_status(status.as_u16(), body).into());
            }
            let bytes = response
                .bytes()
                .await
                .map_err(|e| ApiError::InvalidResponse(format!("document body: {e}")))?;
            Ok(bytes.to_vec())
        })
        .await
    }

    async fn cancel_booking(&self, booking_id: &str) -> Result<Vec<String>> {
        let url = self.endpoint(BOOKINGS_V3_PATH)?;
        let body = [CancellationEntry::for_booking(booking_id)];
        let response = self
            .decorate(self.client.patch(url).json(&body))
            .send()
            .await
            .map_err(send_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = body_text(response).await;
            return Err(ApiError::StateConflict {
                operation: "cancellation".to_string(),
                status: status.as_u16(),
                message: if text.is_empty() { status.to_string() } else { text },
            }
            .into());
        }

        let text = body_text(response).await;
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let value: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("cancellation response: {e}")))?;
        Ok(extract_messages(&value))
    }

    async fn search_bookings(&self, fiscal_code: &FiscalCode) -> Result<Vec<BookingRecord>> {
        let url = self.endpoint(&format!("{BOOKINGS_V3_PATH}/search"))?;
        let page: Page<RemoteBookingDto> = self
            .post_json(url, &BookingSearchRequest::active(fiscal_code))
            .await?;

        Ok(page
            .content
            .into_iter()
            .filter_map(RemoteBookingDto::into_record)
            .collect())
    }
}
