//! Availability change detection
//!
//! - [`engine`] - the diff between two polls ([`detect_changes`])
//! - [`similarity`] - same-slot time matching and the months window
//! - [`render`] - notification text

pub mod engine;
pub mod render;
pub mod similarity;

pub use engine::{
    detect_changes, detect_changes_at, group_by_hospital, ChangeKind, ChangeSet, HospitalGroup,
    Located, PriceChange,
};
pub use render::{format_slot_date, NotificationHeader};
pub use similarity::{is_similar_datetime, is_within_months};
