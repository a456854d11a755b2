//! Exam date resolution and slot blocking.
//!
//! Each exam group gets one date per section, either from fixed overrides or
//! derived from where its coverage topics were packed:
//!
//! 1. Fixed overrides are recorded first. An override that lands on a
//!    timeline slot blocks that slot for every section.
//! 2. Topics are packed once around the fixed blocks.
//! 3. Groups still missing dates are derived in order. The earliest free slot
//!    at least `min_class_meetings_after_last_new_material` meetings after the
//!    last coverage slot is chosen, preferring the configured meeting of the
//!    week and, when asked, a slot before the next break. A newly chosen slot
//!    is blocked and topics are re-packed before the next group.
//!
//! Each group blocks at most one new slot, so the loop re-packs at most once
//! per group.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::allocator::{allocate_topics, Allocation};
use crate::coverage::Coverage;
use crate::plan::{CoursePlan, ExamGroup, Term};
use crate::timeline::Timeline;
use crate::warning::ScheduleWarning;

/// Section id -> exam date, in section order.
pub type SectionDates = IndexMap<String, NaiveDate>;

/// Exam name -> dates per section, in group order.
pub type ExamDates = IndexMap<String, SectionDates>;

/// Fixpoint result of exam placement and topic packing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamPlacement {
    pub exam_dates: ExamDates,
    /// Exam name -> timeline slot indices the exam occupies, in group order.
    pub exam_slots: IndexMap<String, BTreeSet<usize>>,
    /// Every slot index closed to topics.
    pub blocked: BTreeSet<usize>,
    /// Topic packing around the final blocked set.
    pub allocation: Allocation,
    /// Placement warnings, in the order they were raised.
    pub warnings: Vec<ScheduleWarning>,
}

impl ExamPlacement {
    /// Exam names occupying slot `index`, in group order.
    pub fn exams_at(&self, index: usize) -> Vec<String> {
        self.exam_slots
            .iter()
            .filter(|(_, slots)| slots.contains(&index))
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// The exam groups to schedule: the declared ones, or one per covered exam
/// when none are declared.
pub fn effective_groups(plan: &CoursePlan, coverage: &Coverage) -> Vec<ExamGroup> {
    if plan.exam_rules.groups.is_empty() {
        coverage.implicit_groups()
    } else {
        plan.exam_rules.groups.clone()
    }
}

/// Resolve every exam group's dates against `timeline`, re-packing topics as
/// exams claim slots.
pub fn place_exams(plan: &CoursePlan, timeline: &Timeline, coverage: &Coverage) -> ExamPlacement {
    let groups = effective_groups(plan, coverage);
    let capacity = plan.sync.capacity();
    let repack = |blocked: &BTreeSet<usize>| {
        allocate_topics(&plan.topics, timeline.len(), capacity, blocked)
    };

    let mut placement = ExamPlacement {
        exam_dates: ExamDates::new(),
        exam_slots: IndexMap::new(),
        blocked: BTreeSet::new(),
        allocation: Allocation::default(),
        warnings: Vec::new(),
    };

    for group in &groups {
        let name = group.name.trim();
        if name.is_empty() {
            continue;
        }
        seed_fixed_dates(&mut placement, name, group, timeline);
    }

    placement.allocation = repack(&placement.blocked);

    let mut exam_dates = ExamDates::new();
    let mut exam_slots = IndexMap::new();
    for group in &groups {
        let name = group.name.trim();
        if name.is_empty() {
            continue;
        }

        let mut dates = placement.exam_dates.get(name).cloned().unwrap_or_default();
        let mut slots = placement.exam_slots.get(name).cloned().unwrap_or_default();
        let section_count = timeline.section_ids().len();

        if dates.len() < section_count {
            if let Some(&anchor) = slots.first() {
                fill_missing_dates(&mut dates, timeline, anchor);
            }
        }

        if dates.len() < section_count {
            match last_coverage_slot(group, name, coverage, &placement.allocation) {
                None => push_warning(
                    &mut placement.warnings,
                    ScheduleWarning::ExamNotDerivable {
                        exam: name.to_string(),
                    },
                ),
                Some(last) => {
                    let candidates =
                        candidate_slots(plan, timeline, group, name, last, &mut placement);
                    match candidates.first() {
                        Some(&chosen) => {
                            debug!(exam = name, slot = chosen, anchor = last, "placed exam");
                            slots.insert(chosen);
                            fill_missing_dates(&mut dates, timeline, chosen);
                            if placement.blocked.insert(chosen) {
                                placement.allocation = repack(&placement.blocked);
                            }
                        }
                        None => push_warning(
                            &mut placement.warnings,
                            ScheduleWarning::NoCandidateSlot {
                                exam: name.to_string(),
                            },
                        ),
                    }
                }
            }
        }

        if !dates.is_empty() {
            exam_dates.insert(name.to_string(), in_section_order(&dates, timeline));
        }
        if !slots.is_empty() {
            exam_slots.insert(name.to_string(), slots);
        }
    }

    placement.exam_dates = exam_dates;
    placement.exam_slots = exam_slots;
    placement
}

fn seed_fixed_dates(placement: &mut ExamPlacement, name: &str, group: &ExamGroup, timeline: &Timeline) {
    let mut dates = SectionDates::new();
    let mut slots = BTreeSet::new();

    for (section_id, date) in &group.fixed_date_overrides {
        if !timeline.has_section(section_id) {
            push_warning(
                &mut placement.warnings,
                ScheduleWarning::UnknownSection {
                    exam: name.to_string(),
                    section_id: section_id.clone(),
                },
            );
            continue;
        }
        dates.insert(section_id.clone(), *date);
        if let Some(index) = timeline.index_of(section_id, *date) {
            slots.insert(index);
        }
    }

    if !dates.is_empty() {
        placement.exam_dates.insert(name.to_string(), dates);
    }
    if !slots.is_empty() {
        placement.blocked.extend(slots.iter().copied());
        placement.exam_slots.insert(name.to_string(), slots);
    }
}

/// Give sections without a date the meeting date they have at `index`.
fn fill_missing_dates(dates: &mut SectionDates, timeline: &Timeline, index: usize) {
    let slot = timeline.slot(index);
    for section_id in timeline.section_ids() {
        if dates.contains_key(section_id) {
            continue;
        }
        if let Some(date) = slot.date_for(section_id) {
            dates.insert(section_id.clone(), date);
        }
    }
}

fn in_section_order(dates: &SectionDates, timeline: &Timeline) -> SectionDates {
    timeline
        .section_ids()
        .iter()
        .filter_map(|id| dates.get(id).map(|date| (id.clone(), *date)))
        .collect()
}

/// Highest slot index holding any of the group's coverage topics.
fn last_coverage_slot(
    group: &ExamGroup,
    name: &str,
    coverage: &Coverage,
    allocation: &Allocation,
) -> Option<usize> {
    group
        .included_topics
        .iter()
        .chain(group.through_topic.iter())
        .chain(coverage.topics_for_exam(name))
        .filter_map(|topic_id| allocation.topic_spans.get(topic_id))
        .map(|span| span.last)
        .max()
}

/// Unblocked slots eligible for the exam, earliest first.
fn candidate_slots(
    plan: &CoursePlan,
    timeline: &Timeline,
    group: &ExamGroup,
    name: &str,
    last: usize,
    placement: &mut ExamPlacement,
) -> Vec<usize> {
    let rules = group.rules(&plan.exam_rules.defaults);
    let earliest = last + rules.min_class_meetings_after_last_new_material as usize + 1;
    let open: Vec<usize> = (earliest..timeline.len())
        .filter(|idx| !placement.blocked.contains(idx))
        .collect();

    let preferred: Vec<usize> = open
        .iter()
        .copied()
        .filter(|idx| timeline.slot(*idx).slot_in_week == rules.class_meeting_index_in_week)
        .collect();
    let candidates = if preferred.is_empty() { open } else { preferred };

    if candidates.is_empty() || !(rules.prefer_before_break || rules.require_before_break) {
        return candidates;
    }

    let Some(break_start) = next_break_after_slot(&plan.term, timeline, last) else {
        return candidates;
    };

    let before_break: Vec<usize> = candidates
        .iter()
        .copied()
        .filter(|idx| {
            timeline
                .slot(*idx)
                .latest_date()
                .is_some_and(|latest| latest < break_start)
        })
        .collect();

    if !before_break.is_empty() {
        return before_break;
    }
    if rules.require_before_break {
        push_warning(
            &mut placement.warnings,
            ScheduleWarning::BreakRequirementUnmet {
                exam: name.to_string(),
                break_start,
            },
        );
    }
    candidates
}

fn next_break_after_slot(term: &Term, timeline: &Timeline, index: usize) -> Option<NaiveDate> {
    let pivot = timeline.slot(index).earliest_date()?;
    term.next_break_start_after(pivot)
}

fn push_warning(warnings: &mut Vec<ScheduleWarning>, warning: ScheduleWarning) {
    warn!("{warning}");
    warnings.push(warning);
}
