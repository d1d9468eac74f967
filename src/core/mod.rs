//! Core monitoring and booking logic.
//!
//! # Modules
//!
//! - [`detection`] - change detection between two polls and notification text
//! - [`monitor`] - per-subscription poll, cycle scheduler and loop
//! - [`booking`] - the multi-step booking transaction
//! - [`cancellation`] - cancel and list active bookings
//! - [`store`] - JSON file persistence and the transaction journal
//! - [`services`] - wiring from configuration
//!
//! # Monitoring Workflow
//!
//! 1. **Token**: acquire an access token; failure aborts the cycle
//! 2. **Refresh**: resolve patient, doctor and prescription for each subscription
//! 3. **Fetch**: search availability
//! 4. **Diff**: compare with the stored snapshot
//! 5. **Notify**: send the rendered change set when notifications are enabled
//! 6. **Store**: overwrite the snapshot
//!
//! # Example
//!
//! ```rust,no_run
//! use recup_monitor::config::load_config;
//! use recup_monitor::core::services::Services;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("recup.toml")?;
//! let services = Services::from_config(&config)?;
//!
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//! let monitor = services.monitor(shutdown_rx);
//!
//! let summary = monitor.run_cycle().await?;
//! println!("Polled: {}", summary.polled);
//! println!("Failed: {}", summary.failed);
//! # Ok(())
//! # }
//! ```

pub mod booking;
pub mod cancellation;
pub mod detection;
pub mod monitor;
pub mod services;
pub mod store;
