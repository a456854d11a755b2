//! Recoverable conditions collected during a scheduling run.

use std::fmt;

use chrono::NaiveDate;
use serde::{Serialize, Serializer};

/// A non-fatal problem found while building a schedule.
///
/// The run always continues; callers decide whether any of these are fatal
/// for their context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleWarning {
    /// The timeline ended before the topic's hours were fully packed.
    TopicDidNotFit { topic_id: String, unscheduled_hours: u32 },
    /// No coverage topic of the exam was allocated to any slot.
    ExamNotDerivable { exam: String },
    /// `require_before_break` could not be honored; the exam was placed anyway.
    BreakRequirementUnmet { exam: String, break_start: NaiveDate },
    /// Every slot after the coverage anchor is taken.
    NoCandidateSlot { exam: String },
    /// A fixed date override names a section the plan does not define.
    UnknownSection { exam: String, section_id: String },
}

impl fmt::Display for ScheduleWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TopicDidNotFit {
                topic_id,
                unscheduled_hours,
            } => write!(
                f,
                "Topic '{topic_id}' did not fit in available meeting slots ({unscheduled_hours}h unscheduled)."
            ),
            Self::ExamNotDerivable { exam } => write!(
                f,
                "Exam '{exam}' could not be derived (no through_topic/included_topics matched scheduled topics)."
            ),
            Self::BreakRequirementUnmet { exam, break_start } => write!(
                f,
                "Exam '{exam}' requires placement before break starting {break_start}, but no slot matched."
            ),
            Self::NoCandidateSlot { exam } => write!(
                f,
                "Exam '{exam}' could not be scheduled; no remaining candidate slots."
            ),
            Self::UnknownSection { exam, section_id } => write!(
                f,
                "Exam '{exam}' has fixed_date_overrides for unknown section '{section_id}'."
            ),
        }
    }
}

impl Serialize for ScheduleWarning {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
