//! CLI command implementations
//!
//! This module contains all CLI command implementations and the small helpers
//! they share: opening the services from the configuration file, parsing a
//! prescription target and mapping errors to exit codes.

pub mod book;
pub mod bookings;
pub mod check;
pub mod init;
pub mod monitor;
pub mod status;
pub mod subscriptions;
pub mod users;
pub mod validate;

use crate::config::{load_config, RecupConfig};
use crate::core::services::Services;
use crate::domain::{ApiError, FiscalCode, Nre, RecupError};
use clap::Args;

/// Exit code for a successful command
pub const EXIT_OK: i32 = 0;
/// Exit code for configuration and validation errors
pub const EXIT_CONFIG: i32 = 2;
/// Exit code for a booking or cancellation the service refused
pub const EXIT_OPERATION_FAILED: i32 = 3;
/// Exit code when the booking service cannot be reached
pub const EXIT_CONNECTION: i32 = 4;
/// Exit code for everything else
pub const EXIT_FATAL: i32 = 5;

/// Fiscal code and prescription code naming one subscription
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Fiscal code of the patient
    pub fiscal_code: String,

    /// Prescription code (NRE)
    pub nre: String,
}

impl TargetArgs {
    /// Normalizes and validates both codes
    pub fn parse(&self) -> Result<(FiscalCode, Nre), String> {
        let fiscal_code = FiscalCode::new(&self.fiscal_code)?;
        let nre = Nre::new(&self.nre)?;
        Ok((fiscal_code, nre))
    }
}

/// Maps an error to the process exit code
pub fn exit_code_for(error: &RecupError) -> i32 {
    match error {
        RecupError::Configuration(_) | RecupError::Validation(_) => EXIT_CONFIG,
        RecupError::Api(api) if api.is_transient() => EXIT_CONNECTION,
        RecupError::Api(ApiError::Authentication(_)) => EXIT_CONNECTION,
        RecupError::Api(_) => EXIT_OPERATION_FAILED,
        _ => EXIT_FATAL,
    }
}

/// Loads the configuration and wires the services
///
/// Prints the failure and returns the exit code to use when either step
/// fails.
pub(crate) fn open_services(config_path: &str) -> Result<(RecupConfig, Services), i32> {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => {
            println!("❌ Failed to load configuration file");
            println!("   Error: {e}");
            return Err(EXIT_CONFIG);
        }
    };

    match Services::from_config(&config) {
        Ok(services) => Ok((config, services)),
        Err(e) => {
            println!("❌ Failed to initialize services");
            println!("   Error: {e}");
            Err(exit_code_for(&e))
        }
    }
}
