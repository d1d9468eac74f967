//! Status command implementation
//!
//! This module implements the `status` command for displaying the watched
//! prescriptions and booking transactions that never completed.

use super::{open_services, EXIT_CONFIG, EXIT_FATAL, EXIT_OK};
use crate::core::store::{JournalEntry, TransactionStatus};
use clap::Args;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Acknowledge the unresolved transaction of this subscription key
    #[arg(long, value_name = "KEY")]
    pub clear: Option<String>,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking monitor status");

        println!("📊 Monitor Status");
        println!();

        let (_config, services) = match open_services(config_path) {
            Ok(opened) => opened,
            Err(code) => return Ok(code),
        };

        if let Some(key) = &self.clear {
            return match services.stores.journal.clear(key).await {
                Ok(true) => {
                    println!("✅ Transaction for {key} cleared");
                    Ok(EXIT_OK)
                }
                Ok(false) => {
                    println!("❌ No transaction recorded for {key}");
                    Ok(EXIT_CONFIG)
                }
                Err(e) => {
                    println!("❌ Failed to update the transaction journal");
                    println!("   Error: {e}");
                    Ok(EXIT_FATAL)
                }
            };
        }

        let subscriptions = match services.stores.subscriptions.all().await {
            Ok(s) => s,
            Err(e) => {
                println!("❌ Failed to load subscriptions");
                println!("   Error: {e}");
                return Ok(EXIT_FATAL);
            }
        };

        let muted = subscriptions
            .iter()
            .filter(|s| !s.notifications_enabled)
            .count();
        let bookings: usize = subscriptions.iter().map(|s| s.bookings.len()).sum();

        println!("Subscriptions: {}", subscriptions.len());
        println!("  Notifications disabled: {muted}");
        println!("  Recorded bookings: {bookings}");
        println!();

        let unresolved = match services.stores.journal.unresolved().await {
            Ok(entries) => entries,
            Err(e) => {
                println!("❌ Failed to load the transaction journal");
                println!("   Error: {e}");
                return Ok(EXIT_FATAL);
            }
        };

        if unresolved.is_empty() {
            println!("No unresolved booking transactions.");
            return Ok(EXIT_OK);
        }

        println!("Found {} unresolved transaction(s):", unresolved.len());
        println!();
        println!(
            "{:<34} {:<14} {:<20} {:<18} {:<20}",
            "Subscription", "Status", "Lock ID", "Slot", "Updated"
        );
        println!("{}", "-".repeat(110));

        for entry in &unresolved {
            println!(
                "{:<34} {:<14} {:<20} {:<18} {:<20}",
                entry.subscription_key,
                status_label(entry),
                entry.lock_id,
                entry.slot_date.format("%Y-%m-%d %H:%M"),
                entry.updated_at.format("%Y-%m-%d %H:%M:%S")
            );
            if let Some(error) = &entry.last_error {
                println!("    ↳ {error}");
            }
        }

        println!();
        println!("A lock may still be held for these slots. Check with the booking service,");
        println!("then acknowledge with: recup-monitor status --clear <KEY>");
        println!();
        Ok(EXIT_OK)
    }
}

fn status_label(entry: &JournalEntry) -> &'static str {
    match entry.status {
        TransactionStatus::Prebooked => "🔒 Prebooked",
        TransactionStatus::Confirmed => "📄 Confirmed",
        TransactionStatus::Completed => "✅ Completed",
        TransactionStatus::Failed => "❌ Failed",
    }
}
