//! Shared slot timeline across sections.
//!
//! Combines each section's slot keys according to the sync mode:
//!
//! - lockstep with skip-for-all (and more than one section): intersection,
//!   so a slot exists only where every section meets;
//! - lockstep otherwise: union, with absent dates for sections that do not
//!   meet at that key;
//! - independent: the first section's keys only.
//!
//! Slot identity is fixed once the timeline is built. Topic allocations live
//! in [`crate::allocator::Allocation`], never on the slots themselves.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{Result, ScheduleError};
use crate::plan::{SyncConfig, SyncMode};
use crate::slots::{SectionSlots, SlotKey};

/// One position of the shared timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Slot {
    pub week_start: NaiveDate,
    /// 1-based, in chronological order of `week_start`.
    pub week_number: u32,
    pub slot_in_week: u32,
    /// Section id -> meeting date in section order, `None` where the section
    /// has no meeting.
    pub dates: IndexMap<String, Option<NaiveDate>>,
}

impl Slot {
    pub fn key(&self) -> SlotKey {
        SlotKey::new(self.week_start, self.slot_in_week)
    }

    pub fn date_for(&self, section_id: &str) -> Option<NaiveDate> {
        self.dates.get(section_id).copied().flatten()
    }

    pub fn earliest_date(&self) -> Option<NaiveDate> {
        self.dates.values().flatten().min().copied()
    }

    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.dates.values().flatten().max().copied()
    }
}

/// The synchronized slot list of one scheduling run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeline {
    section_ids: Vec<String>,
    slots: Vec<Slot>,
}

impl Timeline {
    /// Synchronize per-section slot maps (in section order) into one timeline.
    ///
    /// # Errors
    /// Returns `ScheduleError::NoSections` if `sections` is empty.
    pub fn synchronize(sync: &SyncConfig, sections: &[(String, SectionSlots)]) -> Result<Self> {
        let (_, first) = sections.first().ok_or(ScheduleError::NoSections)?;

        let selected: BTreeSet<SlotKey> = match sync.mode {
            SyncMode::LockstepByTopic if sync.skip_for_all_if_any_section_skips && sections.len() > 1 => first
                .keys()
                .filter(|key| sections.iter().all(|(_, slots)| slots.contains_key(*key)))
                .copied()
                .collect(),
            SyncMode::LockstepByTopic => sections
                .iter()
                .flat_map(|(_, slots)| slots.keys().copied())
                .collect(),
            SyncMode::Independent => first.keys().copied().collect(),
        };

        let mut week_numbers: BTreeMap<NaiveDate, u32> = BTreeMap::new();
        for key in &selected {
            let next = week_numbers.len() as u32 + 1;
            week_numbers.entry(key.week_start).or_insert(next);
        }

        let slots = selected
            .into_iter()
            .map(|key| Slot {
                week_start: key.week_start,
                week_number: week_numbers[&key.week_start],
                slot_in_week: key.slot_in_week,
                dates: sections
                    .iter()
                    .map(|(id, slots)| (id.clone(), slots.get(&key).copied()))
                    .collect(),
            })
            .collect();

        Ok(Self {
            section_ids: sections.iter().map(|(id, _)| id.clone()).collect(),
            slots,
        })
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> &Slot {
        &self.slots[index]
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn section_ids(&self) -> &[String] {
        &self.section_ids
    }

    pub fn has_section(&self, section_id: &str) -> bool {
        self.section_ids.iter().any(|id| id == section_id)
    }

    /// Week numbers keyed by week start, as assigned during synchronization.
    pub fn week_numbers(&self) -> BTreeMap<NaiveDate, u32> {
        self.slots
            .iter()
            .map(|slot| (slot.week_start, slot.week_number))
            .collect()
    }

    pub fn keys(&self) -> BTreeSet<SlotKey> {
        self.slots.iter().map(Slot::key).collect()
    }

    /// Index of the slot where `section_id` meets on `date`.
    pub fn index_of(&self, section_id: &str, date: NaiveDate) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.date_for(section_id) == Some(date))
    }
}
