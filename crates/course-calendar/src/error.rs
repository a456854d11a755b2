//! Error types for course-calendar operations.

use thiserror::Error;

/// Fatal errors that abort a scheduling run.
///
/// Everything recoverable is reported as a [`crate::ScheduleWarning`] instead.
#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("At least one section is required.")]
    NoSections,

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Plan parse error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ScheduleError>;
