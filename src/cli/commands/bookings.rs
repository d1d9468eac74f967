//! Bookings command implementation
//!
//! This module implements the `bookings` command group for listing and
//! cancelling active bookings.

use super::{exit_code_for, open_services, EXIT_CONFIG, EXIT_OK};
use crate::core::cancellation::{ActiveBooking, CancellationOutcome};
use crate::core::detection::format_slot_date;
use crate::domain::{FiscalCode, Subscription};
use clap::{Args, Subcommand};

/// Booking management commands
#[derive(Subcommand, Debug)]
pub enum BookingsCommand {
    /// List active bookings
    List(BookingsListArgs),

    /// Cancel a booking by id
    Cancel(CancelArgs),
}

impl BookingsCommand {
    /// Execute the selected subcommand
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        match self {
            BookingsCommand::List(args) => args.execute(config_path).await,
            BookingsCommand::Cancel(args) => args.execute(config_path).await,
        }
    }
}

/// Arguments for `bookings list`
#[derive(Args, Debug)]
pub struct BookingsListArgs {
    /// Only bookings of this fiscal code
    #[arg(long)]
    pub fiscal_code: Option<String>,
}

impl BookingsListArgs {
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let fiscal_code = match self.fiscal_code.as_deref().map(FiscalCode::new).transpose() {
            Ok(code) => code,
            Err(e) => {
                println!("❌ {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        let (_config, services) = match open_services(config_path) {
            Ok(opened) => opened,
            Err(code) => return Ok(code),
        };

        let subscriptions: Vec<Subscription> = services
            .stores
            .subscriptions
            .all()
            .await?
            .into_iter()
            .filter(|s| fiscal_code.as_ref().map_or(true, |fc| &s.fiscal_code == fc))
            .collect();

        if subscriptions.is_empty() {
            println!("No subscriptions found.");
            return Ok(EXIT_OK);
        }

        let bookings = services
            .cancellation_driver()
            .active_bookings(&subscriptions)
            .await;

        if bookings.is_empty() {
            println!("No active bookings found.");
            return Ok(EXIT_OK);
        }

        print_bookings(&bookings);
        Ok(EXIT_OK)
    }
}

fn print_bookings(bookings: &[ActiveBooking]) {
    println!("Found {} active booking(s):", bookings.len());
    println!();
    for booking in bookings {
        let source = if booking.subscription_key.is_some() {
            "local"
        } else {
            "remote"
        };
        println!("🆔 {} ({source})", booking.record.booking_id);
        println!("   👤 {}", booking.fiscal_code);
        println!("   🩺 {}", booking.record.service_name);
        println!("   📅 {}", format_slot_date(booking.record.date));
        println!("   🏥 {}", booking.record.hospital_name);
        println!("   📍 {}", booking.record.address);
        println!();
    }
}

/// Arguments for `bookings cancel`
#[derive(Args, Debug)]
pub struct CancelArgs {
    /// Booking id to cancel
    pub booking_id: String,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

impl CancelArgs {
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let booking_id = self.booking_id.trim();
        if booking_id.is_empty() {
            println!("❌ Booking id cannot be empty");
            return Ok(EXIT_CONFIG);
        }

        let (_config, services) = match open_services(config_path) {
            Ok(opened) => opened,
            Err(code) => return Ok(code),
        };

        if !self.yes {
            print!("Cancel booking {booking_id}? [y/N]: ");
            use std::io::{self, Write};
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;

            if !input.trim().eq_ignore_ascii_case("y") {
                println!("Nothing cancelled.");
                return Ok(EXIT_OK);
            }
        }

        let outcome = match services.cancellation_driver().cancel(booking_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                println!("❌ Cancellation failed");
                println!("   Error: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        println!("✅ Booking {booking_id} cancelled");
        if let CancellationOutcome::WithWarnings(messages) = &outcome {
            for message in messages {
                println!("   ⚠️  {message}");
            }
        }

        match services.stores.subscriptions.remove_booking(booking_id).await {
            Ok(Some(key)) => println!("   Removed from subscription {key}"),
            Ok(None) => tracing::debug!(booking_id, "Cancelled booking was not recorded locally"),
            Err(e) => {
                crate::log_error_with_context!(e, "Failed to remove cancelled booking record");
                println!("   ⚠️  Local record not removed: {e}");
            }
        }

        Ok(EXIT_OK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancel_rejects_empty_id() {
        let args = CancelArgs {
            booking_id: "   ".to_string(),
            yes: true,
        };
        assert_eq!(args.execute("unused.toml").await.unwrap(), EXIT_CONFIG);
    }

    #[tokio::test]
    async fn test_list_rejects_invalid_fiscal_code() {
        let args = BookingsListArgs {
            fiscal_code: Some("bad".to_string()),
        };
        assert_eq!(args.execute("unused.toml").await.unwrap(), EXIT_CONFIG);
    }
}
