//! Monitor command implementation
//!
//! This module implements the `monitor` command, the long-running poll loop.

use super::{exit_code_for, open_services, EXIT_FATAL, EXIT_OK};
use clap::Args;
use tokio::sync::watch;

/// Arguments for the monitor command
#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Run a single cycle and exit
    #[arg(long)]
    pub once: bool,
}

impl MonitorArgs {
    /// Execute the monitor command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!(once = self.once, "Starting monitor command");

        let (config, services) = match open_services(config_path) {
            Ok(opened) => opened,
            Err(code) => return Ok(code),
        };

        if config.telegram.bot_token.is_none() {
            println!("⚠️  No telegram.bot_token configured, notifications will only be logged");
        }

        let monitor = services.monitor(shutdown_signal);

        if self.once {
            println!("🔄 Running one poll cycle...");
            return match monitor.run_cycle().await {
                Ok(summary) => {
                    println!(
                        "✅ Cycle complete: {} polled, {} failed, {} notified",
                        summary.polled, summary.failed, summary.notified
                    );
                    Ok(EXIT_OK)
                }
                Err(e) => {
                    tracing::error!(error = %e, "Poll cycle aborted");
                    println!("❌ Poll cycle aborted");
                    println!("   Error: {e}");
                    Ok(exit_code_for(&e))
                }
            };
        }

        println!(
            "🚀 Monitoring subscriptions every {}s (Ctrl+C to stop)",
            config.monitor.cycle_seconds
        );
        println!();

        match monitor.run().await {
            Ok(()) => {
                println!("✅ Monitor stopped");
                Ok(EXIT_OK)
            }
            Err(e) => {
                tracing::error!(error = %e, "Monitor failed");
                eprintln!("Monitor failed: {e}");
                Ok(EXIT_FATAL)
            }
        }
    }
}
