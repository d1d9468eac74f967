// Recup Monitor - ReCUP prescription availability monitor
// Copyright (c) 2025 Recup Monitor Contributors
// Licensed under the MIT License

//! # recup-monitor
//!
//! Watches prescriptions on the ReCUP appointment booking service, notifies
//! subscribers when new appointment slots open and books a chosen slot on
//! their behalf.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Detecting** meaningful changes between two availability snapshots
//! - **Notifying** subscribers through Telegram (or the log)
//! - **Booking** a slot through the ordered prebook and confirm sequence
//! - **Cancelling** bookings and listing the active ones
//! - **Persisting** subscriptions, snapshots and booking attempts as JSON
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (detection, monitor loop, booking, cancellation, stores)
//! - [`adapters`] - External integrations (booking service, notifications)
//! - [`domain`] - Core domain types and models
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and observability
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use recup_monitor::config::load_config;
//! use recup_monitor::core::services::Services;
//! use tokio::sync::watch;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("recup.toml")?;
//!     let services = Services::from_config(&config)?;
//!
//!     let (_shutdown_tx, shutdown_rx) = watch::channel(false);
//!     let summary = services.monitor(shutdown_rx).run_cycle().await?;
//!
//!     println!("Polled {} subscriptions, {} notified", summary.polled, summary.notified);
//!     Ok(())
//! }
//! ```
//!
//! ## Change Detection
//!
//! The engine is pure and works on two slot lists and a per-subscription
//! filter:
//!
//! ```rust
//! use recup_monitor::core::detection::detect_changes;
//! use recup_monitor::domain::FilterConfig;
//!
//! let filter = FilterConfig::default();
//! assert!(detect_changes(&[], &[], &filter).is_none());
//! ```
//!
//! ## Booking
//!
//! [`core::booking::BookingDriver::book`] never returns an error. The outcome
//! is a tagged [`core::booking::BookingOutcome`]: a slot list, a confirmed
//! booking with its document, or a failure naming the last step reached and
//! any slot lock that may still be held.
//!
//! ## Error Handling
//!
//! The library uses the [`domain::RecupError`] type for all errors:
//!
//! ```rust,no_run
//! use recup_monitor::domain::RecupError;
//!
//! fn example() -> Result<(), RecupError> {
//!     // Errors are automatically converted using the ? operator
//!     let config = recup_monitor::config::load_config("recup.toml")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Logging
//!
//! Structured logging with the `tracing` crate:
//!
//! ```rust,no_run
//! use tracing::{info, warn};
//!
//! info!(subscription = "RSSMRA80A01H501U_1200A4012345678", "Polling subscription");
//! warn!(booking_id = "B-991", "Booking cancelled with messages");
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
