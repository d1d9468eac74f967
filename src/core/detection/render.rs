//! Notification text for a change set
//!
//! Output uses the HTML subset accepted by the messaging channel (`<b>`,
//! `<code>`).

use super::engine::{group_by_hospital, ChangeSet};
use crate::domain::{AvailabilitySlot, Subscription};
use chrono::{DateTime, Utc};

/// Subscription details printed above the changes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationHeader {
    pub fiscal_code: String,
    pub team_card_code: Option<String>,
    pub nre: String,
    pub description: Option<String>,
}

impl NotificationHeader {
    pub fn for_subscription(subscription: &Subscription) -> Self {
        Self {
            fiscal_code: subscription.fiscal_code.to_string(),
            team_card_code: subscription
                .patient
                .as_ref()
                .and_then(|p| p.team_card_code())
                .map(str::to_string),
            nre: subscription.prescription_code.to_string(),
            description: subscription.description.clone(),
        }
    }
}

/// `Monday 2 June 2025, 10:00`
pub fn format_slot_date(date: DateTime<Utc>) -> String {
    date.format("%A %-d %B %Y, %H:%M").to_string()
}

impl ChangeSet {
    /// Renders the message sent to the subscriber
    pub fn render(&self, header: &NotificationHeader) -> String {
        let mut out = String::new();

        let title = if self.is_first_sighting() {
            "🔍 New prescription"
        } else {
            "🔍 Prescription update"
        };
        out.push_str(&format!("<b>{title}</b>\n\n"));
        out.push_str(&format!(
            "<b>Fiscal code:</b> <code>{}</code>\n",
            header.fiscal_code
        ));
        out.push_str(&format!(
            "<b>Health card:</b> <code>{}</code>\n",
            header.team_card_code.as_deref().unwrap_or("N/A")
        ));
        out.push_str(&format!("<b>NRE:</b> <code>{}</code>\n", header.nre));
        out.push_str(&format!(
            "<b>Description:</b> <code>{}</code>\n",
            header.description.as_deref().unwrap_or("")
        ));
        if let Some(months) = self.months_limit {
            out.push_str(&format!(
                "<b>Filter:</b> only appointments within {months} months\n"
            ));
        }

        if self.is_first_sighting() {
            out.push_str(&format!(
                "\n📋 <b>Availabilities found:</b> {}\n",
                self.new_slots.len()
            ));
            push_slot_groups(&mut out, &self.new_slots, true);
            return out;
        }

        if self.only_new_dates {
            out.push_str(&format!(
                "🆕 <b>New availabilities:</b> {}\n",
                self.new_slots.len()
            ));
        } else {
            out.push_str(&format!("🔄 <b>Changes:</b> {}\n", self.total_changes));
        }

        if !self.new_slots.is_empty() {
            out.push_str("\n<b>🟢 New availabilities:</b>\n");
            push_slot_groups(&mut out, &self.new_slots, true);
        }

        if !self.removed_slots.is_empty() {
            out.push_str("\n<b>🔴 Removed availabilities:</b>\n");
            push_slot_groups(&mut out, &self.removed_slots, false);
        }

        if !self.changed_slots.is_empty() {
            out.push_str("\n<b>💶 Price changes:</b>\n");
            for group in group_by_hospital(&self.changed_slots) {
                push_group_heading(&mut out, group.hospital_name, group.address);
                for change in group.entries {
                    out.push_str(&format!(
                        "📅 {} - {} → {}\n",
                        format_slot_date(change.current.date),
                        change.previous.price_label(),
                        change.current.price_label()
                    ));
                }
            }
        }

        if !self.current_slots.is_empty() {
            out.push_str(&format!(
                "\n📋 <b>All availabilities:</b> {}\n",
                self.current_slots.len()
            ));
            push_slot_groups(&mut out, &self.current_slots, true);
        }

        out
    }
}

fn push_group_heading(out: &mut String, hospital_name: &str, address: &str) {
    out.push_str(&format!("\n<b>{hospital_name}</b>\n"));
    out.push_str(&format!("📍 {address}\n"));
}

fn push_slot_groups(out: &mut String, slots: &[AvailabilitySlot], with_price: bool) {
    for group in group_by_hospital(slots) {
        push_group_heading(out, group.hospital_name, group.address);
        for slot in group.entries {
            if with_price {
                out.push_str(&format!(
                    "📅 {} - {}\n",
                    format_slot_date(slot.date),
                    slot.price_label()
                ));
            } else {
                out.push_str(&format!("📅 {}\n", format_slot_date(slot.date)));
            }
        }
    }
}
