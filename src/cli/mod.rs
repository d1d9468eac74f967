//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for the monitor using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// ReCUP prescription monitor
#[derive(Parser, Debug)]
#[command(name = "recup-monitor")]
#[command(version, about, long_about = None)]
#[command(author = "Recup Monitor Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "recup.toml", env = "RECUP_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "RECUP_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Poll every subscription until interrupted
    Monitor(commands::monitor::MonitorArgs),

    /// Poll subscriptions once and report the current availability
    Check(commands::check::CheckArgs),

    /// Manage watched prescriptions
    #[command(subcommand)]
    Subscriptions(commands::subscriptions::SubscriptionsCommand),

    /// List the slots of a prescription or book one of them
    Book(commands::book::BookArgs),

    /// List or cancel active bookings
    #[command(subcommand)]
    Bookings(commands::bookings::BookingsCommand),

    /// Manage authorized subscribers
    #[command(subcommand)]
    Users(commands::users::UsersCommand),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Show subscriptions and unresolved booking transactions
    Status(commands::status::StatusArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
