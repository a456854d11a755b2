//! # course-calendar
//!
//! Deterministic course-term scheduling.
//!
//! Turns a normalized course plan (sections, topics, breaks, exam rules) into
//! a date-resolved calendar: which topic is taught in which meeting, which
//! meetings are cancelled, and when each exam falls for each section.
//!
//! ## Modules
//!
//! - [`plan`] — Normalized input model
//! - [`slots`] — Per-section meeting slots within the term
//! - [`timeline`] — Shared slot timeline across sections
//! - [`allocator`] — Greedy packing of topics into slots
//! - [`coverage`] — Exam <-> topic coverage resolution
//! - [`exams`] — Exam date placement, iterated with packing to a fixpoint
//! - [`calendar`] — Final calendar rows
//! - [`schedule`] — End-to-end `build_schedule`
//! - [`warning`] — Recoverable conditions
//! - [`error`] — Error types

pub mod allocator;
pub mod calendar;
pub mod coverage;
pub mod error;
pub mod exams;
pub mod plan;
pub mod schedule;
pub mod slots;
pub mod timeline;
pub mod warning;

pub use allocator::{allocate_topics, Allocation, TopicAllocation, TopicSpan};
pub use calendar::{CalendarRow, SlotLabel};
pub use error::ScheduleError;
pub use plan::CoursePlan;
pub use schedule::{build_schedule, Schedule, ScheduleOutcome};
pub use timeline::{Slot, Timeline};
pub use warning::ScheduleWarning;
