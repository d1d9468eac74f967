//! Configuration management.
//!
//! The monitor reads one TOML file (by default `recup.toml`) with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `RECUP_<SECTION>_<KEY>` environment overrides
//! - Default values for everything except the booking service credentials
//! - Validation of every section on load
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use recup_monitor::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("recup.toml")?;
//! println!("Booking API: {}", config.recup.base_url);
//! println!("Cycle: {}s", config.monitor.cycle_seconds);
//! # Ok(())
//! # }
//! ```
//!
//! # Example Configuration
//!
//! ```toml
//! [recup]
//! token_client_id = "${RECUP_TOKEN_CLIENT_ID}"
//! token_client_secret = "${RECUP_TOKEN_CLIENT_SECRET}"
//! api_username = "APPMOBILE_SPECIAL"
//! api_password = "${RECUP_API_PASSWORD}"
//!
//! [telegram]
//! bot_token = "${TELEGRAM_BOT_TOKEN}"
//!
//! [filter_defaults]
//! min_changes_to_notify = 2
//! months_limit = 6
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_config, parse_config};
pub use schema::{
    ApplicationConfig, LoggingConfig, MonitorConfig, RecupApiConfig, RecupConfig, RetryConfig,
    StorageConfig, TelegramConfig,
};
pub use secret::{secret_string, secret_string_opt, SecretString, SecretValue};
