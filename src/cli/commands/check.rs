//! Check command implementation
//!
//! This module implements the `check` command: an immediate poll that
//! always reports the current availability, with the subscription's own
//! notification settings.

use super::{exit_code_for, open_services, TargetArgs, EXIT_CONFIG, EXIT_OK};
use crate::core::monitor::Delivery;
use crate::domain::{FiscalCode, Nre, Subscription};
use clap::Args;

/// Arguments for the check command
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Fiscal code of the patient (checks every subscription when omitted)
    #[arg(requires = "nre")]
    pub fiscal_code: Option<String>,

    /// Prescription code (NRE)
    pub nre: Option<String>,
}

impl CheckArgs {
    fn target(&self) -> Option<TargetArgs> {
        match (&self.fiscal_code, &self.nre) {
            (Some(fiscal_code), Some(nre)) => Some(TargetArgs {
                fiscal_code: fiscal_code.clone(),
                nre: nre.clone(),
            }),
            _ => None,
        }
    }

    /// Execute the check command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Starting check command");

        let (_config, services) = match open_services(config_path) {
            Ok(opened) => opened,
            Err(code) => return Ok(code),
        };

        let subscriptions: Vec<Subscription> = match self.target() {
            Some(target) => {
                let (fiscal_code, nre): (FiscalCode, Nre) = match target.parse() {
                    Ok(pair) => pair,
                    Err(e) => {
                        println!("❌ {e}");
                        return Ok(EXIT_CONFIG);
                    }
                };
                match services.stores.subscriptions.get(&fiscal_code, &nre).await? {
                    Some(sub) => vec![sub],
                    None => {
                        println!("❌ No subscription for {fiscal_code} / {nre}");
                        return Ok(EXIT_CONFIG);
                    }
                }
            }
            None => services.stores.subscriptions.all().await?,
        };

        if subscriptions.is_empty() {
            println!("No subscriptions found.");
            println!("Run 'recup-monitor subscriptions add' to watch a prescription.");
            return Ok(EXIT_OK);
        }

        if let Err(e) = services.api.access_token().await {
            println!("❌ Failed to authenticate with the booking service");
            println!("   Error: {e}");
            return Ok(exit_code_for(&e));
        }

        let poller = services.poller();
        let mut last_error = None;
        for subscription in &subscriptions {
            println!("🔍 {} ({})", subscription.key(), subscription.display_name());
            match poller.check(subscription).await {
                Ok(report) => {
                    match &report.message {
                        Some(message) => println!("{message}"),
                        None => println!("   No availability to report"),
                    }
                    match report.delivery {
                        Delivery::Sent => println!("   ✉️  Sent to {}", subscription.subscriber_id),
                        Delivery::Muted => println!("   🔕 Notifications disabled"),
                        Delivery::Failed(reason) => println!("   ⚠️  Delivery failed: {reason}"),
                        Delivery::NothingToReport => {}
                    }
                }
                Err(e) => {
                    tracing::warn!(subscription = %subscription.key(), error = %e, "Check failed");
                    println!("   ❌ {e}");
                    last_error = Some(exit_code_for(&e));
                }
            }
            println!();
        }

        Ok(last_error.unwrap_or(EXIT_OK))
    }
}
