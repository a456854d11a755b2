//! Normalized course plan consumed by the scheduler.
//!
//! These types mirror the output of the plan normalizer. Missing optional
//! fields fall back to the normalizer's defaults so sparse documents still
//! deserialize, but no schema validation happens here.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate, Weekday};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScheduleError};

/// The full scheduling input for one course term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoursePlan {
    pub term: Term,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub topics: Vec<Topic>,
    #[serde(default)]
    pub exam_rules: ExamRules,
    /// Exam name -> topic ids, a fallback coverage source. Declaration order
    /// is the order implicit exam groups are resolved in.
    #[serde(default)]
    pub exam_coverage: IndexMap<String, Vec<String>>,
}

impl CoursePlan {
    /// Parse a normalized plan from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn section_ids(&self) -> Vec<String> {
        self.sections.iter().map(|s| s.id.clone()).collect()
    }
}

/// Term boundaries and the dates on which classes do not meet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub global_no_class_dates: BTreeSet<NaiveDate>,
    #[serde(default)]
    pub breaks: Vec<Break>,
}

fn default_timezone() -> String {
    "America/Los_Angeles".to_string()
}

impl Term {
    /// Resolve the term's IANA timezone.
    ///
    /// # Errors
    /// Returns `ScheduleError::InvalidTimezone` if the identifier is unknown.
    pub fn zone(&self) -> Result<chrono_tz::Tz> {
        self.timezone
            .parse()
            .map_err(|_| ScheduleError::InvalidTimezone(self.timezone.clone()))
    }

    /// Every date of the term, inclusive. Empty when `end_date < start_date`.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start_date
            .iter_days()
            .take_while(move |day| *day <= self.end_date)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    /// Dates on which `section_id` does not meet: global no-class dates plus
    /// every applicable break's range.
    pub fn blackout_dates(&self, section_id: &str) -> BTreeSet<NaiveDate> {
        let mut blocked = self.global_no_class_dates.clone();
        for break_period in self.breaks.iter().filter(|b| b.applies_to_section(section_id)) {
            blocked.extend(break_period.days());
        }
        blocked
    }

    /// No-class labels explaining why `section_id` has no class on `date`.
    pub fn no_class_labels(&self, section_id: &str, date: NaiveDate) -> Vec<String> {
        let mut labels = Vec::new();
        if self.global_no_class_dates.contains(&date) {
            labels.push("No class".to_string());
        }
        for break_period in &self.breaks {
            if break_period.applies_to_section(section_id) && break_period.contains(date) {
                labels.push(break_period.name.clone());
            }
        }
        labels
    }

    /// Earliest break start strictly after `pivot`.
    pub fn next_break_start_after(&self, pivot: NaiveDate) -> Option<NaiveDate> {
        self.breaks
            .iter()
            .map(|b| b.start_date)
            .filter(|start| *start > pivot)
            .min()
    }
}

/// A named closure covering an inclusive date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Break {
    #[serde(default = "default_break_name")]
    pub name: String,
    #[serde(default = "default_break_kind")]
    pub kind: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Section ids the break applies to. Absent or empty means all sections.
    #[serde(default)]
    pub applies_to: Option<BTreeSet<String>>,
}

fn default_break_name() -> String {
    "Break".to_string()
}

fn default_break_kind() -> String {
    "break".to_string()
}

impl Break {
    pub fn applies_to_section(&self, section_id: &str) -> bool {
        match &self.applies_to {
            Some(ids) if !ids.is_empty() => ids.contains(section_id),
            _ => true,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start_date
            .iter_days()
            .take_while(move |day| *day <= self.end_date)
    }
}

/// One meeting section of the course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Weekday ordinals, 0 = Monday through 6 = Sunday.
    #[serde(default)]
    pub meeting_days: BTreeSet<u32>,
}

impl Section {
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    pub fn meets_on(&self, weekday: Weekday) -> bool {
        self.meeting_days.contains(&weekday.num_days_from_monday())
    }

    /// 1-based position of `date`'s weekday among the section's meeting days.
    pub fn meeting_index_for(&self, date: NaiveDate) -> Option<u32> {
        let ordinal = date.weekday().num_days_from_monday();
        self.meeting_days
            .iter()
            .position(|day| *day == ordinal)
            .map(|idx| idx as u32 + 1)
    }
}

/// A unit of course content, packed into meetings in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_one")]
    pub duration_hours: u32,
    #[serde(default = "default_true")]
    pub new_material: bool,
    /// Exams this topic is covered by, merged with `CoursePlan::exam_coverage`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub appears_on: Vec<String>,
}

impl Topic {
    pub fn hours(&self) -> u32 {
        self.duration_hours.max(1)
    }

    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.id
        } else {
            &self.title
        }
    }
}

/// How multiple sections share one timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Every section is kept at the same topic.
    #[default]
    LockstepByTopic,
    /// The first section drives the timeline.
    Independent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub mode: SyncMode,
    #[serde(default = "default_true")]
    pub skip_for_all_if_any_section_skips: bool,
    #[serde(default = "default_one", alias = "topics_per_meeting")]
    pub hours_per_meeting: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            mode: SyncMode::default(),
            skip_for_all_if_any_section_skips: true,
            hours_per_meeting: 1,
        }
    }
}

impl SyncConfig {
    /// Per-slot capacity, never below one hour.
    pub fn capacity(&self) -> u32 {
        self.hours_per_meeting.max(1)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamRules {
    #[serde(default)]
    pub defaults: ExamRuleDefaults,
    #[serde(default)]
    pub groups: Vec<ExamGroup>,
}

/// Placement constraints applied to every exam group unless overridden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExamRuleDefaults {
    pub class_meeting_index_in_week: u32,
    pub min_class_meetings_after_last_new_material: u32,
    pub prefer_before_break: bool,
    pub require_before_break: bool,
}

impl Default for ExamRuleDefaults {
    fn default() -> Self {
        Self {
            class_meeting_index_in_week: 2,
            min_class_meetings_after_last_new_material: 1,
            prefer_before_break: true,
            require_before_break: false,
        }
    }
}

/// One exam and how its date is determined.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamGroup {
    /// Groups with a blank name are skipped.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub included_topics: Vec<String>,
    #[serde(default)]
    pub through_topic: Option<String>,
    /// Section id -> exam date; pre-empts derivation for that section.
    #[serde(default)]
    pub fixed_date_overrides: IndexMap<String, NaiveDate>,
    #[serde(default)]
    pub class_meeting_index_in_week: Option<u32>,
    #[serde(default)]
    pub min_class_meetings_after_last_new_material: Option<u32>,
    #[serde(default)]
    pub prefer_before_break: Option<bool>,
    #[serde(default)]
    pub require_before_break: Option<bool>,
}

impl ExamGroup {
    /// The group's constraints with unset fields taken from `defaults`.
    pub fn rules(&self, defaults: &ExamRuleDefaults) -> ExamRuleDefaults {
        ExamRuleDefaults {
            class_meeting_index_in_week: self
                .class_meeting_index_in_week
                .unwrap_or(defaults.class_meeting_index_in_week),
            min_class_meetings_after_last_new_material: self
                .min_class_meetings_after_last_new_material
                .unwrap_or(defaults.min_class_meetings_after_last_new_material),
            prefer_before_break: self
                .prefer_before_break
                .unwrap_or(defaults.prefer_before_break),
            require_before_break: self
                .require_before_break
                .unwrap_or(defaults.require_before_break),
        }
    }
}

fn default_one() -> u32 {
    1
}

fn default_true() -> bool {
    true
}
