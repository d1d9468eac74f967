//! Time-based slot matching
//!
//! Both predicates are pure functions of their arguments so the diff is
//! deterministic under test.

use chrono::{DateTime, TimeDelta, Utc};

/// Days counted per month by the months filter
pub const DAYS_PER_MONTH: i64 = 30;

/// Whether two slot times denote the same slot moved by a small adjustment
///
/// True iff both fall on the same UTC calendar day and are at most
/// `threshold_minutes` apart. A pair straddling midnight is never similar,
/// however close.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use recup_monitor::core::detection::is_similar_datetime;
///
/// let a = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
/// let b = Utc.with_ymd_and_hms(2025, 6, 1, 10, 20, 0).unwrap();
/// assert!(is_similar_datetime(a, b, 60));
/// assert!(!is_similar_datetime(a, b, 10));
/// ```
pub fn is_similar_datetime(a: DateTime<Utc>, b: DateTime<Utc>, threshold_minutes: u32) -> bool {
    let same_day = a.date_naive() == b.date_naive();
    let diff_seconds = (a - b).num_seconds().abs();
    same_day && diff_seconds <= i64::from(threshold_minutes) * 60
}

/// Whether `date` lies in `[now, now + months × 30 days]`; `None` accepts all
///
/// A limit beyond the representable date range has no upper bound.
pub fn is_within_months(date: DateTime<Utc>, now: DateTime<Utc>, months: Option<u32>) -> bool {
    let Some(m) = months else {
        return true;
    };
    if date < now {
        return false;
    }
    TimeDelta::try_days(DAYS_PER_MONTH * i64::from(m))
        .and_then(|window| now.checked_add_signed(window))
        .map_or(true, |limit| date <= limit)
}
