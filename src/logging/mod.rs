//! Logging and observability
//!
//! Structured logging through `tracing`:
//! - console output for operators
//! - JSON lines in a rolling local file
//!
//! # Example
//!
//! ```no_run
//! use recup_monitor::logging::init_logging;
//! use recup_monitor::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(subscription = "RSSMRA80A01H501U_1200A4012345678", "Polling");
//! ```

pub mod structured;

// Re-export commonly used items
pub use structured::{init_logging, parse_log_level, LoggingGuard};

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use recup_monitor::log_error_with_context;
/// use recup_monitor::domain::RecupError;
///
/// let error = RecupError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}

/// Log a retry attempt
///
/// # Example
///
/// ```no_run
/// use recup_monitor::log_retry_attempt;
///
/// log_retry_attempt!(2, 3, "Connection timeout");
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($attempt:expr, $max_attempts:expr, $reason:expr) => {
        tracing::warn!(
            attempt = $attempt,
            max_attempts = $max_attempts,
            reason = %$reason,
            "Retrying operation"
        );
    };
}

/// Log the end of a poll cycle
///
/// # Example
///
/// ```no_run
/// use recup_monitor::log_cycle_complete;
/// use std::time::Duration;
///
/// log_cycle_complete!(12, 1, Duration::from_secs(20), Duration::from_secs(280));
/// ```
#[macro_export]
macro_rules! log_cycle_complete {
    ($polled:expr, $failed:expr, $elapsed:expr, $sleep:expr) => {
        tracing::info!(
            polled = $polled,
            failed = $failed,
            elapsed_ms = $elapsed.as_millis() as u64,
            next_cycle_in_s = $sleep.as_secs(),
            "Poll cycle completed"
        );
    };
}
