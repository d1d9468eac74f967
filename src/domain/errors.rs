//! Domain error types
//!
//! This module defines the error hierarchy for the monitor. The booking-service
//! errors are kept in their own enum so callers can tell authentication,
//! resolution, transient and state-conflict failures apart without looking at
//! HTTP client types.

use thiserror::Error;

/// Main error type
///
/// This is the primary error type used throughout the library.
#[derive(Debug, Error)]
pub enum RecupError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Booking service errors
    #[error("Booking service error: {0}")]
    Api(#[from] ApiError),

    /// Local file persistence failed, including the fallback location
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Outbound notification failed
    #[error("Notification error: {0}")]
    Notification(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl RecupError {
    /// Returns the nested booking service error, if any
    pub fn as_api(&self) -> Option<&ApiError> {
        match self {
            RecupError::Api(e) => Some(e),
            _ => None,
        }
    }

    /// Whether retrying the same operation later may succeed
    pub fn is_transient(&self) -> bool {
        self.as_api().map(ApiError::is_transient).unwrap_or(false)
    }
}

/// Booking service errors
///
/// Errors that occur when talking to the ReCUP API or its token endpoint.
/// These errors don't expose `reqwest` types.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Token acquisition failed; aborts a whole poll cycle
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Patient, doctor or prescription could not be resolved
    #[error("Not found: {0}")]
    Resolution(String),

    /// Failed to reach the server
    #[error("Failed to connect to booking service: {0}")]
    ConnectionFailed(String),

    /// The per-call timeout expired
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Server error (5xx)
    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// Client error (4xx) outside of the booking steps
    #[error("Client error: {status} - {message}")]
    ClientError { status: u16, message: String },

    /// A booking step answered with a status other than the one it requires
    #[error("{operation} rejected with status {status}: {message}")]
    StateConflict {
        operation: String,
        status: u16,
        message: String,
    },

    /// Response body could not be understood
    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// Network failures, timeouts and 5xx answers are worth retrying
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ApiError::ConnectionFailed(_) | ApiError::Timeout(_) | ApiError::ServerError { .. }
        )
    }

    /// Classify a non-success HTTP status from a read-only endpoint
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => ApiError::Authentication(message),
            404 => ApiError::Resolution(message),
            500..=599 => ApiError::ServerError { status, message },
            _ => ApiError::ClientError { status, message },
        }
    }

    /// Remote error text suitable for showing to a user verbatim
    pub fn remote_message(&self) -> &str {
        match self {
            ApiError::ServerError { message, .. }
            | ApiError::ClientError { message, .. }
            | ApiError::StateConflict { message, .. } => message,
            ApiError::Authentication(m)
            | ApiError::Resolution(m)
            | ApiError::ConnectionFailed(m)
            | ApiError::Timeout(m)
            | ApiError::InvalidResponse(m) => m,
        }
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for RecupError {
    fn from(err: std::io::Error) -> Self {
        RecupError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for RecupError {
    fn from(err: serde_json::Error) -> Self {
        RecupError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for RecupError {
    fn from(err: toml::de::Error) -> Self {
        RecupError::Configuration(format!("TOML parse error: {err}"))
    }
}
