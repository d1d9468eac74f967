//! Book command implementation
//!
//! This module implements the `book` command. Without `--slot` it lists the
//! bookable slots of a prescription; with an index it reserves and confirms
//! that slot, stores the booking and delivers the confirmation document.

use super::{
    exit_code_for, open_services, TargetArgs, EXIT_CONFIG, EXIT_CONNECTION, EXIT_OK,
    EXIT_OPERATION_FAILED,
};
use crate::core::booking::{
    BookingConfirmation, BookingOutcome, BookingRequest, DocumentStatus, SlotChoice, SlotList,
};
use crate::core::detection::format_slot_date;
use crate::core::services::Services;
use crate::domain::{ContactInfo, Subscription};
use clap::Args;

/// Arguments for the book command
#[derive(Args, Debug)]
pub struct BookArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Slot index from the listing, or `list` (also `-1`) to only list
    #[arg(long, default_value = "list", allow_hyphen_values = true)]
    pub slot: SlotChoice,

    /// Contact phone attached to the booking
    #[arg(long)]
    pub phone: Option<String>,

    /// Contact email attached to the booking
    #[arg(long)]
    pub email: Option<String>,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

impl BookArgs {
    fn request(&self) -> Result<BookingRequest, String> {
        match self.slot {
            SlotChoice::ListOnly => Ok(BookingRequest::list_only()),
            choice => {
                let (Some(phone), Some(email)) = (&self.phone, &self.email) else {
                    return Err("--phone and --email are required to book a slot".to_string());
                };
                let contact = ContactInfo::new(phone, email)?;
                Ok(BookingRequest::new(contact, choice))
            }
        }
    }

    /// Execute the book command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let (fiscal_code, nre) = match self.target.parse() {
            Ok(pair) => pair,
            Err(e) => {
                println!("❌ {e}");
                return Ok(EXIT_CONFIG);
            }
        };
        let request = match self.request() {
            Ok(r) => r,
            Err(e) => {
                println!("❌ {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        let (_config, services) = match open_services(config_path) {
            Ok(opened) => opened,
            Err(code) => return Ok(code),
        };

        let Some(subscription) = services.stores.subscriptions.get(&fiscal_code, &nre).await?
        else {
            println!("❌ No subscription for {fiscal_code} / {nre}");
            println!("   Run 'recup-monitor subscriptions add' first");
            return Ok(EXIT_CONFIG);
        };

        if !self.yes && request.choice != SlotChoice::ListOnly {
            println!("Booking:");
            println!("  Prescription: {} ({})", subscription.key(), subscription.display_name());
            if let Some(name) = subscription.patient.as_ref().and_then(|p| p.full_name()) {
                println!("  Patient: {name}");
            }
            println!("  Slot index: {}", request.choice);
            println!();
            print!("This reserves a real appointment. Proceed? [y/N]: ");
            use std::io::{self, Write};
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;

            if !input.trim().eq_ignore_ascii_case("y") {
                println!("Booking cancelled.");
                return Ok(EXIT_OK);
            }
        }

        if let Err(e) = services.api.access_token().await {
            println!("❌ Failed to authenticate with the booking service");
            println!("   Error: {e}");
            return Ok(exit_code_for(&e));
        }

        let driver = services.booking_driver();
        match driver.book(&subscription, &request).await {
            BookingOutcome::SlotList(list) => {
                print_slot_list(&subscription, &list);
                Ok(EXIT_OK)
            }
            BookingOutcome::Booked(confirmation) => {
                finish_booking(&services, &subscription, &confirmation).await;
                Ok(EXIT_OK)
            }
            BookingOutcome::Failed(failure) => {
                println!("❌ Booking failed at step '{}'", failure.state);
                println!("   {failure}");
                if failure.lock_id.is_some() {
                    println!("   See 'recup-monitor status' for the unresolved transaction");
                }
                Ok(if failure.transient {
                    EXIT_CONNECTION
                } else {
                    EXIT_OPERATION_FAILED
                })
            }
        }
    }
}

fn print_slot_list(subscription: &Subscription, list: &SlotList) {
    println!(
        "📅 {} slot(s) for {} ({})",
        list.slots.len(),
        subscription.key(),
        list.service_name
            .as_deref()
            .unwrap_or_else(|| subscription.display_name())
    );
    println!();
    for (i, slot) in list.slots.iter().enumerate() {
        println!("{:>3}. {}", i, format_slot_date(slot.date));
        println!("     🏥 {}", slot.hospital_name);
        println!("     📍 {}", slot.site_address);
        println!("     💰 {}", slot.price_label());
    }
    println!();
    println!(
        "Book one with: recup-monitor book {} {} --slot <INDEX> --phone <PHONE> --email <EMAIL>",
        subscription.fiscal_code, subscription.prescription_code
    );
}

/// Stores the booking, saves the document and sends it to the subscriber
///
/// The booking is already confirmed remotely; failures here are reported but
/// never turn the command into a failure.
async fn finish_booking(
    services: &Services,
    subscription: &Subscription,
    confirmation: &BookingConfirmation,
) {
    let record = confirmation.record();
    println!("✅ Booking confirmed: {}", confirmation.booking_id);
    println!("   📅 {}", format_slot_date(record.date));
    println!("   🏥 {}", record.hospital_name);
    println!("   📍 {}", record.address);

    if let Err(e) = services
        .stores
        .subscriptions
        .add_booking(
            &subscription.fiscal_code,
            &subscription.prescription_code,
            record,
        )
        .await
    {
        crate::log_error_with_context!(e, "Failed to store booking record");
        println!("   ⚠️  Booking not recorded locally: {e}");
    }

    let Some(content) = confirmation.document() else {
        if let DocumentStatus::Unavailable { reason } = &confirmation.document {
            println!("   ⚠️  Confirmation document unavailable: {reason}");
        }
        return;
    };

    match confirmation.save_document(&services.documents_dir).await {
        Ok(Some(path)) => println!("   📄 Document saved to {}", path.display()),
        Ok(None) => {}
        Err(e) => {
            crate::log_error_with_context!(e, "Failed to save booking document");
            println!("   ⚠️  Document not saved: {e}");
        }
    }

    let caption = format!(
        "Booking {} confirmed for {}",
        confirmation.booking_id,
        format_slot_date(confirmation.slot.date)
    );
    if let Err(e) = services
        .notifier
        .send_document(
            &subscription.subscriber_id,
            &confirmation.document_filename(),
            content,
            Some(&caption),
        )
        .await
    {
        crate::log_error_with_context!(e, "Failed to send booking document");
        println!("   ⚠️  Document not delivered: {e}");
    }
}
