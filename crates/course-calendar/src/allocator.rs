//! Greedy topic packing into timeline slots.
//!
//! Topics are packed in input order. Each slot holds at most
//! `hours_per_meeting` hours; a topic longer than the remaining capacity spills
//! into the following slots as separate allocation entries. Blocked slots
//! (exam days) are skipped. The function is pure: every call produces a fresh
//! [`Allocation`], so re-running it with a larger blocked set never
//! accumulates earlier results.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::plan::Topic;
use crate::warning::ScheduleWarning;

/// Hours of one topic placed in one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopicAllocation {
    /// Index into the topic list passed to [`allocate_topics`].
    pub topic: usize,
    pub hours: u32,
}

/// First and last slot index a topic touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopicSpan {
    pub first: usize,
    pub last: usize,
}

/// Result of one packing pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Allocation {
    /// Allocations per slot index, in the order they were appended.
    pub slots: Vec<Vec<TopicAllocation>>,
    /// Topic id -> slots it occupies.
    pub topic_spans: BTreeMap<String, TopicSpan>,
    pub warnings: Vec<ScheduleWarning>,
}

impl Allocation {
    pub fn slot(&self, index: usize) -> &[TopicAllocation] {
        self.slots.get(index).map(Vec::as_slice).unwrap_or_default()
    }

    /// The first allocation appended to a slot.
    pub fn primary(&self, index: usize) -> Option<&TopicAllocation> {
        self.slot(index).first()
    }

    /// Hours packed into a slot.
    pub fn used_hours(&self, index: usize) -> u32 {
        self.slot(index).iter().map(|a| a.hours).sum()
    }

    /// Total hours allocated to the topic at `topic` index.
    pub fn hours_for(&self, topic: usize) -> u32 {
        self.slots
            .iter()
            .flatten()
            .filter(|a| a.topic == topic)
            .map(|a| a.hours)
            .sum()
    }
}

/// Pack `topics` into `slot_count` slots, skipping every index in `blocked`.
///
/// A topic that runs past the end of the timeline produces a
/// [`ScheduleWarning::TopicDidNotFit`] naming the unscheduled hours; packing
/// continues with the next topic (which will not fit either).
pub fn allocate_topics(
    topics: &[Topic],
    slot_count: usize,
    hours_per_meeting: u32,
    blocked: &BTreeSet<usize>,
) -> Allocation {
    let capacity = hours_per_meeting.max(1);
    let mut allocation = Allocation {
        slots: vec![Vec::new(); slot_count],
        ..Allocation::default()
    };

    let mut cursor = 0usize;
    let mut slot_remaining = capacity;
    for (topic_idx, topic) in topics.iter().enumerate() {
        let mut remaining = topic.hours();
        while remaining > 0 {
            while cursor < slot_count && blocked.contains(&cursor) {
                cursor += 1;
                slot_remaining = capacity;
            }

            if cursor >= slot_count {
                let warning = ScheduleWarning::TopicDidNotFit {
                    topic_id: topic.id.clone(),
                    unscheduled_hours: remaining,
                };
                debug!("{warning}");
                allocation.warnings.push(warning);
                break;
            }

            let hours = remaining.min(slot_remaining);
            allocation.slots[cursor].push(TopicAllocation {
                topic: topic_idx,
                hours,
            });
            allocation
                .topic_spans
                .entry(topic.id.clone())
                .and_modify(|span| span.last = cursor)
                .or_insert(TopicSpan {
                    first: cursor,
                    last: cursor,
                });

            remaining -= hours;
            slot_remaining -= hours;
            if slot_remaining == 0 {
                cursor += 1;
                slot_remaining = capacity;
            }
        }
    }

    debug!(
        topics = topics.len(),
        slots = slot_count,
        blocked = blocked.len(),
        unplaced = allocation.warnings.len(),
        "allocated topics"
    );
    allocation
}
