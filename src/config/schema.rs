//! Configuration schema types
//!
//! This module defines the configuration structure for the monitor. Every section
//! except `[recup]` has usable defaults.

use crate::config::SecretString;
use crate::domain::FilterConfig;
use serde::{Deserialize, Serialize};

/// Root configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecupConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Booking service connection and credentials
    pub recup: RecupApiConfig,

    /// Local JSON documents
    #[serde(default)]
    pub storage: StorageConfig,

    /// Poll loop timing
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Outbound notifications
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Filter applied to newly created subscriptions
    #[serde(default)]
    pub filter_defaults: FilterConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RecupConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.recup.validate()?;
        self.storage.validate()?;
        self.monitor.validate()?;
        self.telegram.validate()?;
        self.filter_defaults
            .validate()
            .map_err(|e| format!("filter_defaults: {e}"))?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

/// Retry configuration for idempotent reads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Backoff multiplier
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryConfig {
    fn validate(&self) -> Result<(), String> {
        if self.max_retries > 10 {
            return Err(format!(
                "recup.retry.max_retries must be at most 10, got {}",
                self.max_retries
            ));
        }
        if self.backoff_multiplier < 1.0 {
            return Err("recup.retry.backoff_multiplier must be >= 1.0".to_string());
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err("recup.retry.initial_delay_ms cannot exceed max_delay_ms".to_string());
        }
        Ok(())
    }
}

/// Booking service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecupApiConfig {
    /// Base URL of the booking API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Absolute URL of the OAuth client-credentials token endpoint
    #[serde(default = "default_token_url")]
    pub token_url: String,

    /// Client id for the token endpoint
    pub token_client_id: String,

    /// Client secret for the token endpoint
    /// Stored securely in memory and automatically zeroized on drop
    pub token_client_secret: SecretString,

    /// Username of the Basic credential the booking API expects
    pub api_username: String,

    /// Password of the Basic credential the booking API expects
    pub api_password: SecretString,

    /// User-Agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_accept_language")]
    pub accept_language: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    #[serde(default = "default_connect_timeout_seconds")]
    pub connect_timeout_seconds: u64,

    /// Retry configuration
    #[serde(default)]
    pub retry: RetryConfig,
}

impl RecupApiConfig {
    fn validate(&self) -> Result<(), String> {
        use secrecy::ExposeSecret;

        for (name, url) in [("base_url", &self.base_url), ("token_url", &self.token_url)] {
            if url.is_empty() {
                return Err(format!("recup.{name} cannot be empty"));
            }
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(format!("recup.{name} must start with http:// or https://"));
            }
        }

        if self.token_client_id.trim().is_empty() {
            return Err("recup.token_client_id cannot be empty".to_string());
        }
        if self.token_client_secret.expose_secret().is_empty() {
            return Err("recup.token_client_secret cannot be empty".to_string());
        }
        if self.api_username.trim().is_empty() {
            return Err("recup.api_username cannot be empty".to_string());
        }
        if self.api_password.expose_secret().is_empty() {
            return Err("recup.api_password cannot be empty".to_string());
        }

        if self.timeout_seconds == 0 || self.timeout_seconds > 300 {
            return Err(format!(
                "recup.timeout_seconds must be between 1 and 300, got {}",
                self.timeout_seconds
            ));
        }
        if self.connect_timeout_seconds == 0 {
            return Err("recup.connect_timeout_seconds must be > 0".to_string());
        }

        self.retry.validate()
    }
}

/// Local storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Subscription list
    #[serde(default = "default_subscriptions_file")]
    pub subscriptions_file: String,

    /// Previous availability per subscription key
    #[serde(default = "default_snapshots_file")]
    pub snapshots_file: String,

    /// Authorized subscriber ids; the first is the administrator
    #[serde(default = "default_users_file")]
    pub users_file: String,

    /// Booking transaction journal
    #[serde(default = "default_journal_file")]
    pub journal_file: String,

    /// Where booking confirmation documents are written
    #[serde(default = "default_documents_dir")]
    pub documents_dir: String,

    /// Secondary directory for writes that fail at the primary path
    /// (defaults to the home directory)
    #[serde(default)]
    pub fallback_dir: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            subscriptions_file: default_subscriptions_file(),
            snapshots_file: default_snapshots_file(),
            users_file: default_users_file(),
            journal_file: default_journal_file(),
            documents_dir: default_documents_dir(),
            fallback_dir: None,
        }
    }
}

impl StorageConfig {
    fn validate(&self) -> Result<(), String> {
        let files = [
            ("subscriptions_file", &self.subscriptions_file),
            ("snapshots_file", &self.snapshots_file),
            ("users_file", &self.users_file),
            ("journal_file", &self.journal_file),
        ];
        for (name, path) in files {
            if path.trim().is_empty() {
                return Err(format!("storage.{name} cannot be empty"));
            }
        }

        let mut unique: Vec<&String> = files.iter().map(|(_, p)| *p).collect();
        unique.sort();
        unique.dedup();
        if unique.len() != files.len() {
            return Err("storage files must all be different paths".to_string());
        }

        if self.documents_dir.trim().is_empty() {
            return Err("storage.documents_dir cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Poll loop timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Target length of one poll cycle
    #[serde(default = "default_cycle_seconds")]
    pub cycle_seconds: u64,

    /// Pause between two subscriptions
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,

    /// Random extra pause added to the pacing, 0 disables jitter
    #[serde(default)]
    pub jitter_ms: u64,

    /// Pause after a cycle-level failure
    #[serde(default = "default_error_backoff_seconds")]
    pub error_backoff_seconds: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            cycle_seconds: default_cycle_seconds(),
            pacing_ms: default_pacing_ms(),
            jitter_ms: 0,
            error_backoff_seconds: default_error_backoff_seconds(),
        }
    }
}

impl MonitorConfig {
    fn validate(&self) -> Result<(), String> {
        if self.cycle_seconds == 0 {
            return Err("monitor.cycle_seconds must be > 0".to_string());
        }
        if self.error_backoff_seconds == 0 {
            return Err("monitor.error_backoff_seconds must be > 0".to_string());
        }
        if self.jitter_ms > 60_000 {
            return Err(format!(
                "monitor.jitter_ms must be at most 60000, got {}",
                self.jitter_ms
            ));
        }
        Ok(())
    }
}

/// Telegram Bot API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token; without it notifications are only logged
    #[serde(default)]
    pub bot_token: Option<SecretString>,

    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,

    #[serde(default = "default_telegram_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            api_base: default_telegram_api_base(),
            timeout_seconds: default_telegram_timeout_seconds(),
        }
    }
}

impl TelegramConfig {
    fn validate(&self) -> Result<(), String> {
        use secrecy::ExposeSecret;

        if let Some(token) = &self.bot_token {
            if token.expose_secret().is_empty() {
                return Err("telegram.bot_token cannot be empty when set".to_string());
            }
        }
        if !self.api_base.starts_with("http://") && !self.api_base.starts_with("https://") {
            return Err("telegram.api_base must start with http:// or https://".to_string());
        }
        if self.timeout_seconds == 0 {
            return Err("telegram.timeout_seconds must be > 0".to_string());
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default = "default_true")]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy (daily, hourly, never)
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path cannot be empty when local logging is enabled".to_string());
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: true,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_base_url() -> String {
    "https://recup-webapi-appmobile.regione.lazio.it".to_string()
}

fn default_token_url() -> String {
    "https://gwapi-az.servicelazio.it/token".to_string()
}

fn default_user_agent() -> String {
    "salutelazio/2.2.0 CFNetwork/3826.400.120 Darwin/24.3.0".to_string()
}

fn default_accept_language() -> String {
    "it-IT,it;q=0.9".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_connect_timeout_seconds() -> u64 {
    10
}

fn default_max_retries() -> usize {
    3
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_subscriptions_file() -> String {
    "input_prescriptions.json".to_string()
}

fn default_snapshots_file() -> String {
    "previous_data.json".to_string()
}

fn default_users_file() -> String {
    "authorized_users.json".to_string()
}

fn default_journal_file() -> String {
    "booking_journal.json".to_string()
}

fn default_documents_dir() -> String {
    "documents".to_string()
}

fn default_cycle_seconds() -> u64 {
    300
}

fn default_pacing_ms() -> u64 {
    1000
}

fn default_error_backoff_seconds() -> u64 {
    60
}

fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_telegram_timeout_seconds() -> u64 {
    10
}

fn default_local_path() -> String {
    "logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}
