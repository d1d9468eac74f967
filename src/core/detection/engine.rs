//! Availability change detection
//!
//! Compares the slots seen by the previous poll with the current ones and
//! decides whether the difference is worth a notification.

use super::similarity::{is_similar_datetime, is_within_months};
use crate::domain::slot::sort_by_date;
use crate::domain::{AvailabilitySlot, FilterConfig};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Whether a change set reports a first sighting or an update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Nothing was known before; every current slot is listed
    FirstSighting,
    /// Difference against a previous poll
    Update,
}

/// A slot present in both polls whose price moved
#[derive(Debug, Clone, PartialEq)]
pub struct PriceChange {
    pub previous: AvailabilitySlot,
    pub current: AvailabilitySlot,
}

/// Classified difference between two polls
///
/// Every list is sorted ascending by date.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeSet {
    pub kind: ChangeKind,
    pub new_slots: Vec<AvailabilitySlot>,
    pub removed_slots: Vec<AvailabilitySlot>,
    pub changed_slots: Vec<PriceChange>,

    /// Count that was compared against `min_changes_to_notify`
    pub total_changes: usize,

    /// Full listing of the filtered current slots, when `show_all_current`
    pub current_slots: Vec<AvailabilitySlot>,

    pub only_new_dates: bool,
    pub months_limit: Option<u32>,
}

impl ChangeSet {
    pub fn is_first_sighting(&self) -> bool {
        self.kind == ChangeKind::FirstSighting
    }
}

/// [`detect_changes_at`] relative to the current instant
pub fn detect_changes(
    previous: &[AvailabilitySlot],
    current: &[AvailabilitySlot],
    filter: &FilterConfig,
) -> Option<ChangeSet> {
    detect_changes_at(previous, current, filter, Utc::now())
}

/// Decides whether and what to report for one subscription
///
/// `now` anchors the months filter. Returns `None` when nothing should be
/// sent, including when the service returned no slots at all after a poll
/// that did.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use recup_monitor::core::detection::detect_changes_at;
/// use recup_monitor::domain::{AvailabilitySlot, FilterConfig};
///
/// let slot = |h: u32| AvailabilitySlot {
///     date: Utc.with_ymd_and_hms(2025, 6, 1, h, 0, 0).unwrap(),
///     hospital_id: "H1".to_string(),
///     hospital_name: "Hospital".to_string(),
///     site_address: "Via Roma 1".to_string(),
///     price: Some(36.15),
///     diary_id: "D1".to_string(),
/// };
/// let now = Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap();
/// let filter = FilterConfig::default();
///
/// assert!(detect_changes_at(&[slot(9)], &[slot(9)], &filter, now).is_none());
///
/// let changes = detect_changes_at(&[slot(9)], &[slot(9), slot(15)], &filter, now).unwrap();
/// assert_eq!(changes.new_slots, vec![slot(15)]);
/// ```
pub fn detect_changes_at(
    previous: &[AvailabilitySlot],
    current: &[AvailabilitySlot],
    filter: &FilterConfig,
    now: DateTime<Utc>,
) -> Option<ChangeSet> {
    let in_window = |s: &&AvailabilitySlot| is_within_months(s.date, now, filter.months_limit);
    let mut filtered_current: Vec<AvailabilitySlot> =
        current.iter().filter(in_window).cloned().collect();
    sort_by_date(&mut filtered_current);

    if previous.is_empty() {
        if filtered_current.is_empty() {
            return None;
        }
        return Some(ChangeSet {
            kind: ChangeKind::FirstSighting,
            total_changes: filtered_current.len(),
            new_slots: filtered_current,
            removed_slots: Vec::new(),
            changed_slots: Vec::new(),
            current_slots: Vec::new(),
            only_new_dates: filter.only_new_dates,
            months_limit: filter.months_limit,
        });
    }

    if current.is_empty() {
        return None;
    }

    let filtered_previous: Vec<&AvailabilitySlot> = previous.iter().filter(in_window).collect();

    let prev_by_hospital = index_by_hospital(filtered_previous.iter().copied());
    let curr_by_hospital = index_by_hospital(filtered_current.iter());

    let mut new_slots = Vec::new();
    let mut removed_slots = Vec::new();
    let mut changed_slots = Vec::new();

    let empty = BTreeMap::new();
    let mut hospitals: Vec<&str> = prev_by_hospital
        .keys()
        .chain(curr_by_hospital.keys())
        .copied()
        .collect();
    hospitals.sort_unstable();
    hospitals.dedup();

    for hospital in hospitals {
        let prev_dates = prev_by_hospital.get(hospital).unwrap_or(&empty);
        let curr_dates = curr_by_hospital.get(hospital).unwrap_or(&empty);

        for (date, slot) in curr_dates {
            if prev_dates.contains_key(date) {
                continue;
            }
            let adjusted = prev_dates
                .keys()
                .any(|p| is_similar_datetime(*p, *date, filter.time_threshold_minutes));
            if !adjusted {
                new_slots.push((*slot).clone());
            }
        }

        if filter.notify_removed {
            for (date, slot) in prev_dates {
                if curr_dates.contains_key(date) {
                    continue;
                }
                let adjusted = curr_dates
                    .keys()
                    .any(|c| is_similar_datetime(*date, *c, filter.time_threshold_minutes));
                if !adjusted {
                    removed_slots.push((*slot).clone());
                }
            }
        }

        if !filter.only_new_dates {
            for (date, curr) in curr_dates {
                if let Some(prev) = prev_dates.get(date) {
                    if prev.price != curr.price {
                        changed_slots.push(PriceChange {
                            previous: (*prev).clone(),
                            current: (*curr).clone(),
                        });
                    }
                }
            }
        }
    }

    let mut total_changes = new_slots.len();
    if filter.notify_removed {
        total_changes += removed_slots.len();
    }
    if !filter.only_new_dates {
        total_changes += changed_slots.len();
    }

    let new_is_significant = filter.only_new_dates && !new_slots.is_empty();
    let enough_changes = total_changes >= filter.min_changes_to_notify as usize;
    if !new_is_significant && !enough_changes {
        return None;
    }

    sort_by_date(&mut new_slots);
    sort_by_date(&mut removed_slots);
    changed_slots.sort_by_key(|c| c.current.date);

    Some(ChangeSet {
        kind: ChangeKind::Update,
        new_slots,
        removed_slots,
        changed_slots,
        total_changes,
        current_slots: if filter.show_all_current {
            filtered_current
        } else {
            Vec::new()
        },
        only_new_dates: filter.only_new_dates,
        months_limit: filter.months_limit,
    })
}

/// hospital id → (date → slot); a repeated date keeps the last slot
fn index_by_hospital<'a>(
    slots: impl Iterator<Item = &'a AvailabilitySlot>,
) -> BTreeMap<&'a str, BTreeMap<DateTime<Utc>, &'a AvailabilitySlot>> {
    let mut index: BTreeMap<&str, BTreeMap<DateTime<Utc>, &AvailabilitySlot>> = BTreeMap::new();
    for slot in slots {
        index
            .entry(slot.hospital_id.as_str())
            .or_default()
            .insert(slot.date, slot);
    }
    index
}

/// An entry shown under the hospital of one slot
pub trait Located {
    fn slot(&self) -> &AvailabilitySlot;
}

impl Located for AvailabilitySlot {
    fn slot(&self) -> &AvailabilitySlot {
        self
    }
}

impl Located for PriceChange {
    /// Price changes are placed by their current slot
    fn slot(&self) -> &AvailabilitySlot {
        &self.current
    }
}

/// Entries of one hospital, in display order
#[derive(Debug, Clone, PartialEq)]
pub struct HospitalGroup<'a, T> {
    pub hospital_name: &'a str,
    /// Address of the earliest entry in the group
    pub address: &'a str,
    pub entries: Vec<&'a T>,
}

/// Groups entries by hospital name
///
/// Entries are sorted ascending by date first; groups appear in the order of
/// their earliest entry.
pub fn group_by_hospital<T: Located>(items: &[T]) -> Vec<HospitalGroup<'_, T>> {
    let mut sorted: Vec<&T> = items.iter().collect();
    sorted.sort_by_key(|item| item.slot().date);

    let mut groups: Vec<HospitalGroup<'_, T>> = Vec::new();
    for item in sorted {
        let slot = item.slot();
        match groups
            .iter_mut()
            .find(|g| g.hospital_name == slot.hospital_name)
        {
            Some(group) => group.entries.push(item),
            None => groups.push(HospitalGroup {
                hospital_name: &slot.hospital_name,
                address: &slot.site_address,
                entries: vec![item],
            }),
        }
    }
    groups
}
