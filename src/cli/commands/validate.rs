//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the monitor configuration file.

use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // Loading already runs every section's validation
        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration file loaded successfully");
                c
            }
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Booking API: {}", config.recup.base_url);
        println!("  Token Endpoint: {}", config.recup.token_url);
        println!("  API User: {}", config.recup.api_username);
        println!(
            "  Timeouts: {}s request, {}s connect",
            config.recup.timeout_seconds, config.recup.connect_timeout_seconds
        );
        println!("  Read Retries: {}", config.recup.retry.max_retries);
        println!("  Subscriptions File: {}", config.storage.subscriptions_file);
        println!("  Snapshots File: {}", config.storage.snapshots_file);
        println!("  Users File: {}", config.storage.users_file);
        println!("  Journal File: {}", config.storage.journal_file);
        println!("  Documents: {}", config.storage.documents_dir);
        println!(
            "  Cycle: {}s, pacing {}ms (+{}ms jitter)",
            config.monitor.cycle_seconds, config.monitor.pacing_ms, config.monitor.jitter_ms
        );
        println!(
            "  Notifications: {}",
            if config.telegram.bot_token.is_some() {
                "Telegram"
            } else {
                "log only"
            }
        );
        let filter = &config.filter_defaults;
        println!(
            "  Default Filter: only_new_dates={}, notify_removed={}, min_changes={}, threshold={}min, months_limit={}",
            filter.only_new_dates,
            filter.notify_removed,
            filter.min_changes_to_notify,
            filter.time_threshold_minutes,
            filter
                .months_limit
                .map(|m| m.to_string())
                .unwrap_or_else(|| "none".to_string())
        );
        println!();
        Ok(0)
    }
}
