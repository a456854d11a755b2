//! Top-level scheduling run.
//!
//! Wires the stages together: per-section slots, synchronization, coverage
//! resolution, exam placement (which drives topic packing to a fixpoint), and
//! row building.

use serde::Serialize;
use tracing::{info, warn};

use crate::calendar::{build_rows, CalendarRow};
use crate::coverage::Coverage;
use crate::error::{Result, ScheduleError};
use crate::exams::{place_exams, ExamDates, SectionDates};
use crate::plan::{CoursePlan, Section, Term};
use crate::slots::all_section_slots;
use crate::timeline::Timeline;
use crate::warning::ScheduleWarning;

/// The computed course calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schedule {
    pub sections: Vec<Section>,
    pub rows: Vec<CalendarRow>,
    pub exam_dates: ExamDates,
    pub term: Term,
}

impl Schedule {
    /// Dates of `exam` per section, if the exam was dated at all.
    pub fn exam_dates_for(&self, exam: &str) -> Option<&SectionDates> {
        self.exam_dates.get(exam)
    }
}

/// A schedule together with every recoverable problem found while building it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleOutcome {
    pub schedule: Schedule,
    pub warnings: Vec<ScheduleWarning>,
}

impl ScheduleOutcome {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Build the date-resolved calendar for `plan`.
///
/// Warnings are ordered with topic packing warnings from the final packing
/// pass first, then exam placement warnings in the order they were raised.
///
/// # Errors
/// Returns `ScheduleError::NoSections` if the plan has no sections.
pub fn build_schedule(plan: &CoursePlan) -> Result<ScheduleOutcome> {
    if plan.sections.is_empty() {
        return Err(ScheduleError::NoSections);
    }

    let section_slots = all_section_slots(&plan.sections, &plan.term);
    let timeline = Timeline::synchronize(&plan.sync, &section_slots)?;
    let coverage = Coverage::resolve(plan);
    let placement = place_exams(plan, &timeline, &coverage);
    let rows = build_rows(plan, &timeline, &placement, &coverage);

    for warning in &placement.allocation.warnings {
        warn!("{warning}");
    }
    let mut warnings = placement.allocation.warnings.clone();
    warnings.extend(placement.warnings.iter().cloned());

    info!(
        slots = timeline.len(),
        rows = rows.len(),
        exams = placement.exam_dates.len(),
        warnings = warnings.len(),
        "built course schedule"
    );

    Ok(ScheduleOutcome {
        schedule: Schedule {
            sections: plan.sections.clone(),
            rows,
            exam_dates: placement.exam_dates,
            term: plan.term.clone(),
        },
        warnings,
    })
}
