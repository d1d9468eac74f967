//! Availability monitoring
//!
//! - [`poller`] - one subscription: refresh, diff, notify, store
//! - [`scheduler`] - cycle length, pacing, jitter and error backoff
//! - [`runner`] - the loop driving both until shutdown

pub mod poller;
pub mod runner;
pub mod scheduler;

pub use poller::{Delivery, PollReport, Poller};
pub use runner::{CycleSummary, Monitor};
pub use scheduler::{CycleScheduler, MIN_CYCLE_SLEEP};
