//! Domain models and types for the ReCUP monitor.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`FiscalCode`], [`Nre`], [`SubscriberId`])
//! - **Domain models** ([`Subscription`], [`FilterConfig`], [`AvailabilitySlot`], [`BookingRecord`])
//! - **Error types** ([`RecupError`], [`ApiError`])
//! - **Result type alias** ([`Result`])
//!
//! # Type Safety
//!
//! Identifiers are normalized and validated on construction, including when they
//! are read back from the subscription file:
//!
//! ```rust
//! use recup_monitor::domain::{FiscalCode, Nre};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fiscal_code = FiscalCode::new("rssmra80a01h501u")?;
//! let nre = Nre::new("1200A4012345678")?;
//!
//! // This won't compile - the two codes are distinct types
//! // let wrong: FiscalCode = nre;
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! All fallible library operations return [`Result<T, RecupError>`]:
//!
//! ```rust
//! use recup_monitor::domain::Result;
//!
//! fn example() -> Result<()> {
//!     let config = recup_monitor::config::load_config("recup.toml")?;
//!     Ok(())
//! }
//! ```

pub mod contact;
pub mod errors;
pub mod ids;
pub mod result;
pub mod slot;
pub mod subscription;

// Re-export commonly used types for convenience
pub use contact::ContactInfo;
pub use errors::{ApiError, RecupError};
pub use ids::{FiscalCode, Nre, SubscriberId};
pub use result::Result;
pub use slot::{AvailabilitySlot, UNKNOWN_HOSPITAL};
pub use subscription::{
    subscription_key, BookingRecord, FilterConfig, PatientSnapshot, Subscription, TeamCard,
};
