//! External system integrations.
//!
//! - [`recup`] - the regional booking service (token, lookups, availability,
//!   booking, cancellation)
//! - [`notifier`] - outbound messages to subscribers
//!
//! # Design Pattern
//!
//! Each adapter exposes an `async_trait` so the monitor and the booking
//! workflows can be driven by in-memory implementations in tests.
//!
//! ```rust,no_run
//! use recup_monitor::adapters::notifier::{build_notifier, Notifier};
//! use recup_monitor::adapters::recup::{RecupApi, RecupHttpClient};
//! use recup_monitor::config::load_config;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("recup.toml")?;
//! let notifier = build_notifier(&config.telegram)?;
//! let api = RecupHttpClient::new(config.recup)?;
//!
//! api.access_token().await?;
//! # let _ = notifier;
//! # Ok(())
//! # }
//! ```

pub mod notifier;
pub mod recup;
