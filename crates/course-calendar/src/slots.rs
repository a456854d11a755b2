//! Per-section meeting slots.
//!
//! Enumerates a section's meeting dates within the term, drops blacked-out
//! dates, and numbers the survivors within their week. A slot is identified by
//! the Monday that starts its week plus its 1-based ordinal in that week.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, Duration, NaiveDate};

use crate::plan::{Section, Term};

/// Timeline position shared across sections.
///
/// Ordering is chronological: by week, then by slot within the week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotKey {
    pub week_start: NaiveDate,
    pub slot_in_week: u32,
}

impl SlotKey {
    pub fn new(week_start: NaiveDate, slot_in_week: u32) -> Self {
        Self {
            week_start,
            slot_in_week,
        }
    }
}

/// A section's meeting dates keyed by slot.
pub type SectionSlots = BTreeMap<SlotKey, NaiveDate>;

/// The Monday on or before `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Compute the meeting slots of one section.
///
/// `blackout` holds the dates this section does not meet (see
/// [`Term::blackout_dates`]). A section with no surviving dates yields an
/// empty map.
pub fn section_slots(section: &Section, term: &Term, blackout: &BTreeSet<NaiveDate>) -> SectionSlots {
    let mut weekly: BTreeMap<NaiveDate, Vec<NaiveDate>> = BTreeMap::new();
    for day in term.days() {
        if !section.meets_on(day.weekday()) || blackout.contains(&day) {
            continue;
        }
        weekly.entry(week_start(day)).or_default().push(day);
    }

    let mut slots = SectionSlots::new();
    for (monday, mut dates) in weekly {
        dates.sort();
        for (idx, meeting_date) in dates.into_iter().enumerate() {
            slots.insert(SlotKey::new(monday, idx as u32 + 1), meeting_date);
        }
    }
    slots
}

/// Slots for every section of the plan, in section order.
pub fn all_section_slots(sections: &[Section], term: &Term) -> Vec<(String, SectionSlots)> {
    sections
        .iter()
        .map(|section| {
            let blackout = term.blackout_dates(&section.id);
            (section.id.clone(), section_slots(section, term, &blackout))
        })
        .collect()
}
