//! Subscriptions command implementation
//!
//! This module implements the `subscriptions` command group: adding,
//! removing, listing and tuning watched prescriptions.

use super::{exit_code_for, open_services, TargetArgs, EXIT_CONFIG, EXIT_OK};
use crate::domain::{FilterConfig, RecupError, SubscriberId, Subscription};
use clap::{Args, Subcommand, ValueEnum};

/// Subscription management commands
#[derive(Subcommand, Debug)]
pub enum SubscriptionsCommand {
    /// Watch a prescription for a subscriber
    Add(AddArgs),

    /// Stop watching a prescription
    Remove(RemoveArgs),

    /// List watched prescriptions
    List(ListArgs),

    /// Turn notifications on or off for one prescription
    Notifications(NotificationsArgs),

    /// Change the change-detection filter of one prescription
    Filter(FilterCommandArgs),
}

impl SubscriptionsCommand {
    /// Execute the selected subcommand
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        match self {
            SubscriptionsCommand::Add(args) => args.execute(config_path).await,
            SubscriptionsCommand::Remove(args) => args.execute(config_path).await,
            SubscriptionsCommand::List(args) => args.execute(config_path).await,
            SubscriptionsCommand::Notifications(args) => args.execute(config_path).await,
            SubscriptionsCommand::Filter(args) => args.execute(config_path).await,
        }
    }
}

/// Overrides for the change-detection filter
///
/// Unset options keep the value of the filter they are applied to.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Report only dates that were not available before
    #[arg(long, value_name = "BOOL")]
    pub only_new_dates: Option<bool>,

    /// Also report dates that disappeared
    #[arg(long, value_name = "BOOL")]
    pub notify_removed: Option<bool>,

    /// Minimum number of changes before notifying
    #[arg(long, value_name = "N")]
    pub min_changes: Option<u32>,

    /// Same-day shifts up to this many minutes are not changes
    #[arg(long, value_name = "MINUTES")]
    pub threshold_minutes: Option<u32>,

    /// Append the full current availability to notifications
    #[arg(long, value_name = "BOOL")]
    pub show_all_current: Option<bool>,

    /// Ignore slots further than this many months away
    #[arg(long, value_name = "MONTHS", conflicts_with = "no_months_limit")]
    pub months_limit: Option<u32>,

    /// Remove the months limit
    #[arg(long)]
    pub no_months_limit: bool,
}

impl FilterArgs {
    /// Applies the overrides on top of `base`
    pub fn apply(&self, base: FilterConfig) -> FilterConfig {
        let mut filter = base;
        if let Some(v) = self.only_new_dates {
            filter.only_new_dates = v;
        }
        if let Some(v) = self.notify_removed {
            filter.notify_removed = v;
        }
        if let Some(v) = self.min_changes {
            filter.min_changes_to_notify = v;
        }
        if let Some(v) = self.threshold_minutes {
            filter.time_threshold_minutes = v;
        }
        if let Some(v) = self.show_all_current {
            filter.show_all_current = v;
        }
        if self.no_months_limit {
            filter.months_limit = None;
        } else if let Some(v) = self.months_limit {
            filter.months_limit = Some(v);
        }
        filter
    }
}

fn print_filter(filter: &FilterConfig) {
    println!("  Only new dates: {}", filter.only_new_dates);
    println!("  Notify removed: {}", filter.notify_removed);
    println!("  Min changes: {}", filter.min_changes_to_notify);
    println!("  Time threshold: {} min", filter.time_threshold_minutes);
    println!("  Show all current: {}", filter.show_all_current);
    match filter.months_limit {
        Some(months) => println!("  Months limit: {months}"),
        None => println!("  Months limit: none"),
    }
}

/// Arguments for `subscriptions add`
#[derive(Args, Debug)]
pub struct AddArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Subscriber id that receives the notifications
    #[arg(short, long)]
    pub subscriber: String,

    /// Skip the verification poll against the booking service
    #[arg(long)]
    pub no_verify: bool,

    #[command(flatten)]
    pub filter: FilterArgs,
}

impl AddArgs {
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let (fiscal_code, nre) = match self.target.parse() {
            Ok(pair) => pair,
            Err(e) => {
                println!("❌ {e}");
                return Ok(EXIT_CONFIG);
            }
        };
        let subscriber = match SubscriberId::new(self.subscriber.as_str()) {
            Ok(id) => id,
            Err(e) => {
                println!("❌ {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        let (config, services) = match open_services(config_path) {
            Ok(opened) => opened,
            Err(code) => return Ok(code),
        };

        if !services.stores.users.is_authorized(&subscriber).await? {
            println!("❌ Subscriber {subscriber} is not authorized");
            println!("   Run 'recup-monitor users add {subscriber}' first");
            return Ok(EXIT_CONFIG);
        }

        let filter = self.filter.apply(config.filter_defaults.clone());
        let subscription = Subscription::new(fiscal_code, nre, subscriber, filter);
        let key = subscription.key();
        tracing::info!(subscription = %key, "Adding subscription");

        match services.stores.subscriptions.add(subscription.clone()).await {
            Ok(()) => {}
            Err(RecupError::Validation(e)) => {
                println!("❌ {e}");
                return Ok(EXIT_CONFIG);
            }
            Err(e) => return Err(e.into()),
        }

        if self.no_verify {
            println!("✅ Subscription added: {key}");
            return Ok(EXIT_OK);
        }

        println!("🔍 Verifying prescription with the booking service...");
        let verified = match services.api.access_token().await {
            Ok(_) => services.poller().poll(&subscription).await,
            Err(e) => Err(e),
        };

        match verified {
            Ok(report) => {
                println!("✅ Subscription added: {key}");
                println!("   Slots currently available: {}", report.slot_count);
                if let Some(message) = report.message {
                    println!();
                    println!("{message}");
                }
                Ok(EXIT_OK)
            }
            Err(e) => {
                tracing::warn!(subscription = %key, error = %e, "Verification failed, removing subscription");
                services
                    .stores
                    .subscriptions
                    .remove(&subscription.fiscal_code, &subscription.prescription_code)
                    .await?;
                services.stores.snapshots.remove(&key).await?;
                println!("❌ Prescription could not be verified, subscription not added");
                println!("   Error: {e}");
                Ok(exit_code_for(&e))
            }
        }
    }
}

/// Arguments for `subscriptions remove`
#[derive(Args, Debug)]
pub struct RemoveArgs {
    #[command(flatten)]
    pub target: TargetArgs,
}

impl RemoveArgs {
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let (fiscal_code, nre) = match self.target.parse() {
            Ok(pair) => pair,
            Err(e) => {
                println!("❌ {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        let (_config, services) = match open_services(config_path) {
            Ok(opened) => opened,
            Err(code) => return Ok(code),
        };

        match services.stores.subscriptions.remove(&fiscal_code, &nre).await? {
            Some(removed) => {
                services.stores.snapshots.remove(&removed.key()).await?;
                println!("✅ Subscription removed: {}", removed.key());
                if !removed.bookings.is_empty() {
                    println!(
                        "   ⚠️  {} booking(s) were recorded for it; they remain active remotely",
                        removed.bookings.len()
                    );
                }
                Ok(EXIT_OK)
            }
            None => {
                println!("❌ No subscription for {fiscal_code} / {nre}");
                Ok(EXIT_CONFIG)
            }
        }
    }
}

/// Arguments for `subscriptions list`
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only show what this subscriber may see
    #[arg(short, long)]
    pub subscriber: Option<String>,
}

impl ListArgs {
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let (_config, services) = match open_services(config_path) {
            Ok(opened) => opened,
            Err(code) => return Ok(code),
        };
        let store = &services.stores.subscriptions;

        let subscriptions = match &self.subscriber {
            Some(raw) => {
                let subscriber = match SubscriberId::new(raw.as_str()) {
                    Ok(id) => id,
                    Err(e) => {
                        println!("❌ {e}");
                        return Ok(EXIT_CONFIG);
                    }
                };
                let admin = services.stores.users.is_admin(&subscriber).await?;
                store.visible_to(&subscriber, admin).await?
            }
            None => store.all().await?,
        };

        if subscriptions.is_empty() {
            println!("No subscriptions found.");
            return Ok(EXIT_OK);
        }

        println!("Found {} subscription(s):", subscriptions.len());
        println!();
        println!(
            "{:<34} {:<36} {:<14} {:<8} {:<8}",
            "Key", "Description", "Subscriber", "Notify", "Bookings"
        );
        println!("{}", "-".repeat(104));

        for sub in &subscriptions {
            println!(
                "{:<34} {:<36} {:<14} {:<8} {:<8}",
                sub.key(),
                truncate(sub.display_name(), 35),
                sub.subscriber_id.as_str(),
                if sub.notifications_enabled { "🔔" } else { "🔕" },
                sub.bookings.len()
            );
        }

        println!();
        Ok(EXIT_OK)
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
        cut.push('…');
        cut
    }
}

/// Notification switch
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    On,
    Off,
}

/// Arguments for `subscriptions notifications`
#[derive(Args, Debug)]
pub struct NotificationsArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// New notification state
    #[arg(value_enum)]
    pub state: Toggle,
}

impl NotificationsArgs {
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let (fiscal_code, nre) = match self.target.parse() {
            Ok(pair) => pair,
            Err(e) => {
                println!("❌ {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        let (_config, services) = match open_services(config_path) {
            Ok(opened) => opened,
            Err(code) => return Ok(code),
        };

        let enabled = self.state == Toggle::On;
        if services
            .stores
            .subscriptions
            .set_notifications(&fiscal_code, &nre, enabled)
            .await?
        {
            let label = if enabled { "🔔 enabled" } else { "🔕 disabled" };
            println!("✅ Notifications {label} for {fiscal_code}_{nre}");
            Ok(EXIT_OK)
        } else {
            println!("❌ No subscription for {fiscal_code} / {nre}");
            Ok(EXIT_CONFIG)
        }
    }
}

/// Arguments for `subscriptions filter`
#[derive(Args, Debug)]
pub struct FilterCommandArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    #[command(flatten)]
    pub filter: FilterArgs,
}

impl FilterCommandArgs {
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let (fiscal_code, nre) = match self.target.parse() {
            Ok(pair) => pair,
            Err(e) => {
                println!("❌ {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        let (_config, services) = match open_services(config_path) {
            Ok(opened) => opened,
            Err(code) => return Ok(code),
        };
        let store = &services.stores.subscriptions;

        let Some(current) = store.get(&fiscal_code, &nre).await? else {
            println!("❌ No subscription for {fiscal_code} / {nre}");
            return Ok(EXIT_CONFIG);
        };

        let filter = self.filter.apply(current.filter.clone());
        match store.set_filter(&fiscal_code, &nre, filter.clone()).await {
            Ok(_) => {
                println!("✅ Filter updated for {}", current.key());
                print_filter(&filter);
                Ok(EXIT_OK)
            }
            Err(RecupError::Validation(e)) => {
                println!("❌ Invalid filter: {e}");
                Ok(EXIT_CONFIG)
            }
            Err(e) => Err(e.into()),
        }
    }
}
