//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "recup.toml")]
    pub output: String,

    /// Include example values and comments
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing recup-monitor configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2); // Configuration error exit code
        }

        let config_content = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()
        };

        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your settings", self.output);
                println!("  2. Create a .env file with your credentials:");
                println!("     - RECUP_TOKEN_CLIENT_ID and RECUP_TOKEN_CLIENT_SECRET");
                println!("     - RECUP_API_PASSWORD");
                println!("     - TELEGRAM_BOT_TOKEN (optional, notifications are logged without it)");
                println!("  3. Validate configuration: recup-monitor validate-config");
                println!("  4. Authorize yourself: recup-monitor users add <CHAT_ID>");
                println!("  5. Watch a prescription: recup-monitor subscriptions add <FISCAL_CODE> <NRE> --subscriber <CHAT_ID>");
                println!("  6. Start monitoring: recup-monitor monitor");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {}", e);
                Ok(5) // Fatal error exit code
            }
        }
    }

    /// Generate minimal configuration
    fn generate_minimal_config() -> String {
        r#"# recup-monitor configuration

[application]
log_level = "info"

[recup]
token_client_id = "${RECUP_TOKEN_CLIENT_ID}"
token_client_secret = "${RECUP_TOKEN_CLIENT_SECRET}"
api_username = "APPMOBILE_SPECIAL"
api_password = "${RECUP_API_PASSWORD}"

[storage]
subscriptions_file = "input_prescriptions.json"
snapshots_file = "previous_data.json"
users_file = "authorized_users.json"
journal_file = "booking_journal.json"
documents_dir = "documents"

[monitor]
cycle_seconds = 300
pacing_ms = 1000

[telegram]
bot_token = "${TELEGRAM_BOT_TOKEN}"

[filter_defaults]
only_new_dates = true
notify_removed = false
min_changes_to_notify = 2
time_threshold_minutes = 60
show_all_current = true

[logging]
local_enabled = true
local_path = "logs"
local_rotation = "daily"
"#
        .to_string()
    }

    /// Generate configuration with examples and comments
    fn generate_config_with_examples() -> String {
        r#"# recup-monitor configuration
#
# Every value can reference environment variables with ${VAR_NAME} and be
# overridden with RECUP_<SECTION>_<KEY>, e.g. RECUP_MONITOR_CYCLE_SECONDS=120.

# ============================================================================
# Application Settings
# ============================================================================
[application]
# Log level (trace, debug, info, warn, error)
log_level = "info"

# ============================================================================
# Booking Service
# ============================================================================
[recup]
# Base URL of the booking API
base_url = "https://recup-webapi-appmobile.regione.lazio.it"

# OAuth client-credentials token endpoint (absolute URL)
token_url = "https://gwapi-az.servicelazio.it/token"
token_client_id = "${RECUP_TOKEN_CLIENT_ID}"
token_client_secret = "${RECUP_TOKEN_CLIENT_SECRET}"

# Basic credential sent with every booking API call
api_username = "APPMOBILE_SPECIAL"
api_password = "${RECUP_API_PASSWORD}"

# Per-request timeouts in seconds
timeout_seconds = 30
connect_timeout_seconds = 10

# Retries apply to read operations only; prebooking, confirmation and
# cancellation are attempted exactly once
[recup.retry]
max_retries = 3
initial_delay_ms = 1000
max_delay_ms = 30000
backoff_multiplier = 2.0

# ============================================================================
# Local Storage
# ============================================================================
[storage]
subscriptions_file = "input_prescriptions.json"
snapshots_file = "previous_data.json"

# The first authorized subscriber is the administrator
users_file = "authorized_users.json"

# Booking attempts that locked a slot but never completed
journal_file = "booking_journal.json"

# Booking confirmation PDFs
documents_dir = "documents"

# Writes that fail at the paths above are retried here (default: home directory)
# fallback_dir = "/var/lib/recup-monitor"

# ============================================================================
# Poll Loop
# ============================================================================
[monitor]
# Target length of one cycle over all subscriptions
cycle_seconds = 300

# Pause between two subscriptions, plus up to jitter_ms of random extra
pacing_ms = 1000
jitter_ms = 0

# Pause after a cycle that could not start (e.g. token failure)
error_backoff_seconds = 60

# ============================================================================
# Notifications
# ============================================================================
[telegram]
# Without a bot token notifications are only written to the log
bot_token = "${TELEGRAM_BOT_TOKEN}"
api_base = "https://api.telegram.org"
timeout_seconds = 10

# ============================================================================
# Filter Applied To New Subscriptions
# ============================================================================
[filter_defaults]
# Ignore price changes; a single new date is always reported
only_new_dates = true

# Report dates that disappeared
notify_removed = false

# Minimum number of changes before notifying
min_changes_to_notify = 2

# Same-day shifts up to this many minutes are the same slot
time_threshold_minutes = 60

# Append the full current availability to each notification
show_all_current = true

# Only consider slots within this many 30-day months (1 to 24)
# months_limit = 6

# ============================================================================
# Logging
# ============================================================================
[logging]
# JSON lines in a rolling file next to the console output
local_enabled = true
local_path = "logs"

# Log rotation (daily, hourly, never)
local_rotation = "daily"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RecupConfig;
    use tempfile::TempDir;

    fn without_placeholders(config: &str) -> String {
        regex::Regex::new(r"\$\{[A-Z_]+\}")
            .unwrap()
            .replace_all(config, "placeholder")
            .into_owned()
    }

    #[test]
    fn test_init_args_defaults() {
        let args = InitArgs {
            output: "recup.toml".to_string(),
            with_examples: false,
            force: false,
        };

        assert_eq!(args.output, "recup.toml");
        assert!(!args.with_examples);
        assert!(!args.force);
    }

    #[test]
    fn test_generate_minimal_config() {
        let config = InitArgs::generate_minimal_config();
        assert!(config.contains("[recup]"));
        assert!(config.contains("[filter_defaults]"));

        let parsed: RecupConfig = toml::from_str(&without_placeholders(&config)).unwrap();
        assert!(parsed.validate().is_ok());
        assert_eq!(parsed.filter_defaults.min_changes_to_notify, 2);
    }

    #[test]
    fn test_generate_config_with_examples() {
        let config = InitArgs::generate_config_with_examples();
        assert!(config.contains("[recup.retry]"));

        let parsed: RecupConfig = toml::from_str(&without_placeholders(&config)).unwrap();
        assert!(parsed.validate().is_ok());
        assert_eq!(parsed.monitor.cycle_seconds, 300);
    }

    #[tokio::test]
    async fn test_init_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("recup.toml");
        fs::write(&output, "existing").unwrap();

        let args = InitArgs {
            output: output.display().to_string(),
            with_examples: false,
            force: false,
        };
        assert_eq!(args.execute().await.unwrap(), 2);
        assert_eq!(fs::read_to_string(&output).unwrap(), "existing");
    }
}
