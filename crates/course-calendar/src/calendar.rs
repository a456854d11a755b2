//! Calendar rows: the externally visible schedule.
//!
//! Rows come from three sources:
//!
//! - one row per timeline slot, carrying its packed topics and exams;
//! - no-class rows for blacked-out meeting days that have no slot of their own;
//! - exam-only rows for exams whose dates never landed on a slot.
//!
//! After merging, week numbers are recomputed over weeks that hold at least
//! one non-no-class row, rows are sorted chronologically, and no-class rows in
//! weeks without a number collapse into a single notice per week.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Serialize, Serializer};

use crate::coverage::Coverage;
use crate::exams::ExamPlacement;
use crate::plan::CoursePlan;
use crate::slots::{week_start, SlotKey};
use crate::timeline::Timeline;

const NO_CLASS: &str = "No class";

/// Position label of a row within its week.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotLabel {
    /// 1-based meeting ordinal; serialized as a number.
    Meeting(u32),
    /// Exam outside the meeting timeline; serialized as `"Exam"`.
    Exam,
    /// Collapsed no-class notice; serialized as `""`.
    Notice,
}

impl SlotLabel {
    /// Meetings sort before exam rows, exam rows before notices.
    fn sort_key(self) -> (u8, u32) {
        match self {
            Self::Meeting(n) => (0, n),
            Self::Exam => (1, 0),
            Self::Notice => (1, 1),
        }
    }
}

impl Serialize for SlotLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Meeting(n) => serializer.serialize_u32(*n),
            Self::Exam => serializer.serialize_str("Exam"),
            Self::Notice => serializer.serialize_str(""),
        }
    }
}

/// Hours of one topic within a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowAllocation {
    pub topic_id: String,
    pub topic_title: String,
    pub hours: u32,
}

/// One line of the rendered course calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarRow {
    /// `None` for no-class rows in weeks without any class.
    pub week_number: Option<u32>,
    pub slot_in_week: SlotLabel,
    /// Section id -> date, in section order.
    pub dates: IndexMap<String, Option<NaiveDate>>,
    pub topic_ids: Vec<String>,
    /// Titles, suffixed with `(Nh)` when an allocation spans several hours.
    pub topic_titles: Vec<String>,
    pub topic_allocations: Vec<RowAllocation>,
    pub topic_id: Option<String>,
    pub topic_title: Option<String>,
    pub exam_names: Vec<String>,
    /// Exams covering the topics taught in this row.
    pub coverage_exams: Vec<String>,
    pub new_material: bool,
    pub no_class: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub no_class_notice: bool,
    pub no_class_label: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub no_class_dates: Vec<NaiveDate>,
}

impl CalendarRow {
    fn empty(section_ids: &[String], slot_in_week: SlotLabel) -> Self {
        Self {
            week_number: None,
            slot_in_week,
            dates: section_ids.iter().map(|id| (id.clone(), None)).collect(),
            topic_ids: Vec::new(),
            topic_titles: Vec::new(),
            topic_allocations: Vec::new(),
            topic_id: None,
            topic_title: None,
            exam_names: Vec::new(),
            coverage_exams: Vec::new(),
            new_material: false,
            no_class: false,
            no_class_notice: false,
            no_class_label: None,
            no_class_dates: Vec::new(),
        }
    }

    pub fn is_notice(&self) -> bool {
        self.no_class_notice
    }
}

/// A row plus the week it belongs to, while rows are still being merged.
struct PendingRow {
    week_start: NaiveDate,
    row: CalendarRow,
}

impl PendingRow {
    fn is_unnumbered_no_class(&self) -> bool {
        self.row.no_class && self.row.week_number.is_none()
    }
}

/// Build the final calendar rows from the fixpoint placement.
pub fn build_rows(
    plan: &CoursePlan,
    timeline: &Timeline,
    placement: &ExamPlacement,
    coverage: &Coverage,
) -> Vec<CalendarRow> {
    let mut rows = slot_rows(plan, timeline, placement, coverage);
    rows.extend(no_class_rows(plan, timeline));
    rows.extend(exam_only_rows(timeline, placement));

    renumber_weeks(&mut rows);
    rows.sort_by_key(|pending| (pending.week_start, pending.row.slot_in_week.sort_key()));
    collapse_no_class_weeks(rows, timeline.section_ids())
}

fn slot_rows(
    plan: &CoursePlan,
    timeline: &Timeline,
    placement: &ExamPlacement,
    coverage: &Coverage,
) -> Vec<PendingRow> {
    timeline
        .slots()
        .iter()
        .enumerate()
        .map(|(idx, slot)| {
            let mut row =
                CalendarRow::empty(timeline.section_ids(), SlotLabel::Meeting(slot.slot_in_week));
            row.week_number = Some(slot.week_number);
            row.dates = slot.dates.clone();
            row.exam_names = placement.exams_at(idx);

            let mut coverage_exams = BTreeSet::new();
            for allocation in placement.allocation.slot(idx) {
                let topic = &plan.topics[allocation.topic];
                let title = topic.display_title();
                row.topic_ids.push(topic.id.clone());
                row.topic_titles.push(if allocation.hours == 1 {
                    title.to_string()
                } else {
                    format!("{title} ({}h)", allocation.hours)
                });
                row.topic_allocations.push(RowAllocation {
                    topic_id: topic.id.clone(),
                    topic_title: title.to_string(),
                    hours: allocation.hours,
                });
                row.new_material |= topic.new_material;
                coverage_exams.extend(coverage.exams_for_topic(&topic.id).map(str::to_string));
            }
            row.coverage_exams = coverage_exams.into_iter().collect();

            if let Some(primary) = placement.allocation.primary(idx) {
                let topic = &plan.topics[primary.topic];
                row.topic_id = Some(topic.id.clone());
                row.topic_title = Some(topic.display_title().to_string());
            }

            PendingRow {
                week_start: slot.week_start,
                row,
            }
        })
        .collect()
}

/// Rows for blacked-out meeting days whose slot key is absent from the
/// timeline, one per key, labelled with the reasons for the closure.
fn no_class_rows(plan: &CoursePlan, timeline: &Timeline) -> Vec<PendingRow> {
    let existing = timeline.keys();
    let mut by_key: BTreeMap<SlotKey, (CalendarRow, BTreeSet<String>)> = BTreeMap::new();

    for section in &plan.sections {
        for blocked in plan.term.blackout_dates(&section.id) {
            if !plan.term.contains(blocked) {
                continue;
            }
            let Some(slot_in_week) = section.meeting_index_for(blocked) else {
                continue;
            };
            let key = SlotKey::new(week_start(blocked), slot_in_week);
            if existing.contains(&key) {
                continue;
            }

            let (row, labels) = by_key.entry(key).or_insert_with(|| {
                let mut row =
                    CalendarRow::empty(timeline.section_ids(), SlotLabel::Meeting(slot_in_week));
                row.no_class = true;
                row.no_class_label = Some(NO_CLASS.to_string());
                (row, BTreeSet::new())
            });
            row.dates.insert(section.id.clone(), Some(blocked));
            labels.extend(plan.term.no_class_labels(&section.id, blocked));
        }
    }

    by_key
        .into_iter()
        .map(|(key, (mut row, labels))| {
            if !labels.is_empty() {
                row.no_class_label = Some(no_class_label(&labels));
            }
            PendingRow {
                week_start: key.week_start,
                row,
            }
        })
        .collect()
}

/// `"No class"` alone, or `"No class: A, B"` listing the distinct reasons.
fn no_class_label(labels: &BTreeSet<String>) -> String {
    let reasons: BTreeSet<String> = labels
        .iter()
        .filter(|label| label.as_str() != NO_CLASS)
        .map(|label| normalize_break_label(label))
        .collect();
    if reasons.is_empty() {
        return NO_CLASS.to_string();
    }
    let joined: Vec<&str> = reasons.iter().map(String::as_str).collect();
    format!("{NO_CLASS}: {}", joined.join(", "))
}

/// Drop trailing week numbers from break labels: `"Break week 11"` becomes
/// `"Break week"`. The phrase matches case-insensitively on word boundaries;
/// everything around it, spacing and punctuation included, is kept.
pub fn normalize_break_label(label: &str) -> String {
    let text = label.trim();
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut prev: Option<char> = None;
    while let Some(ch) = rest.chars().next() {
        if !prev.is_some_and(is_word_char) {
            if let Some(len) = break_week_prefix(rest) {
                out.push_str("Break week");
                prev = rest[..len].chars().next_back();
                rest = &rest[len..];
                continue;
            }
        }
        out.push(ch);
        prev = Some(ch);
        rest = &rest[ch.len_utf8()..];
    }
    out
}

const BREAK_WEEK: &str = "break week";

/// Byte length of a leading `break week <digits>` run that ends on a word
/// boundary.
fn break_week_prefix(text: &str) -> Option<usize> {
    let phrase = text.get(..BREAK_WEEK.len())?;
    if !phrase.eq_ignore_ascii_case(BREAK_WEEK) {
        return None;
    }
    let after_phrase = &text[BREAK_WEEK.len()..];
    let number = after_phrase.trim_start();
    if number.len() == after_phrase.len() {
        return None;
    }
    let tail = number.trim_start_matches(|c: char| c.is_ascii_digit());
    if tail.len() == number.len() || tail.chars().next().is_some_and(is_word_char) {
        return None;
    }
    Some(text.len() - tail.len())
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Rows for exams that occupy no timeline slot, e.g. a fixed final exam date
/// after the last meeting.
fn exam_only_rows(timeline: &Timeline, placement: &ExamPlacement) -> Vec<PendingRow> {
    let mut week_numbers = timeline.week_numbers();
    let mut next_week = week_numbers.len() as u32 + 1;
    let mut rows = Vec::new();

    for (name, section_dates) in &placement.exam_dates {
        let has_slot = placement
            .exam_slots
            .get(name)
            .is_some_and(|slots| !slots.is_empty());
        if has_slot {
            continue;
        }
        let Some(earliest) = section_dates.values().min().copied() else {
            continue;
        };

        let exam_week = week_start(earliest);
        let week_number = *week_numbers.entry(exam_week).or_insert_with(|| {
            next_week += 1;
            next_week - 1
        });

        let mut row = CalendarRow::empty(timeline.section_ids(), SlotLabel::Exam);
        row.week_number = Some(week_number);
        for (section_id, date) in &mut row.dates {
            *date = section_dates.get(section_id).copied();
        }
        row.exam_names = vec![name.clone()];
        rows.push(PendingRow {
            week_start: exam_week,
            row,
        });
    }
    rows
}

/// Number weeks 1.. in chronological order over weeks holding at least one
/// class or exam row. Weeks with only no-class rows get no number.
fn renumber_weeks(rows: &mut [PendingRow]) {
    let numbered: BTreeSet<NaiveDate> = rows
        .iter()
        .filter(|pending| !pending.row.no_class)
        .map(|pending| pending.week_start)
        .collect();
    let by_start: BTreeMap<NaiveDate, u32> = numbered
        .into_iter()
        .enumerate()
        .map(|(idx, start)| (start, idx as u32 + 1))
        .collect();
    for pending in rows.iter_mut() {
        pending.row.week_number = by_start.get(&pending.week_start).copied();
    }
}

/// Replace each week's unnumbered no-class rows with one notice row placed
/// where the first of them sorted.
fn collapse_no_class_weeks(rows: Vec<PendingRow>, section_ids: &[String]) -> Vec<CalendarRow> {
    let mut grouped: BTreeMap<NaiveDate, Vec<&CalendarRow>> = BTreeMap::new();
    for pending in rows.iter().filter(|p| p.is_unnumbered_no_class()) {
        grouped.entry(pending.week_start).or_default().push(&pending.row);
    }

    let notices: BTreeMap<NaiveDate, CalendarRow> = grouped
        .into_iter()
        .map(|(start, group)| (start, notice_row(&group, section_ids)))
        .collect();

    let mut emitted = BTreeSet::new();
    let mut out = Vec::with_capacity(rows.len());
    for pending in &rows {
        if !pending.is_unnumbered_no_class() {
            out.push(pending.row.clone());
            continue;
        }
        if emitted.insert(pending.week_start) {
            if let Some(notice) = notices.get(&pending.week_start) {
                out.push(notice.clone());
            }
        }
    }
    out
}

fn notice_row(group: &[&CalendarRow], section_ids: &[String]) -> CalendarRow {
    let labels: BTreeSet<&str> = group
        .iter()
        .filter_map(|row| row.no_class_label.as_deref())
        .filter(|label| !label.trim().is_empty())
        .collect();
    let label = match labels.len() {
        1 => labels.iter().next().copied().unwrap_or(NO_CLASS),
        _ => NO_CLASS,
    };
    let dates: BTreeSet<NaiveDate> = group
        .iter()
        .flat_map(|row| row.dates.values().flatten().copied())
        .collect();

    let mut row = CalendarRow::empty(section_ids, SlotLabel::Notice);
    row.no_class = true;
    row.no_class_notice = true;
    row.no_class_label = Some(label.to_string());
    row.no_class_dates = dates.into_iter().collect();
    row
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn break_week_numbers_are_stripped() {
        assert_eq!(normalize_break_label("Break week 11"), "Break week");
        assert_eq!(normalize_break_label("  spring BREAK WEEK 3 "), "spring Break week");
        assert_eq!(normalize_break_label("Break week"), "Break week");
        assert_eq!(normalize_break_label("Thanksgiving"), "Thanksgiving");
    }

    #[test]
    fn break_week_numbers_stop_at_word_boundaries() {
        assert_eq!(normalize_break_label("Break week 11,"), "Break week,");
        assert_eq!(normalize_break_label("Closure (break week 4)"), "Closure (Break week)");
        assert_eq!(normalize_break_label("Spring  Break week\t9 - campus"), "Spring  Break week - campus");
        assert_eq!(normalize_break_label("Break week 11a"), "Break week 11a");
        assert_eq!(normalize_break_label("Outbreak week 3"), "Outbreak week 3");
    }

    #[test]
    fn single_global_label_stays_plain() {
        let labels: BTreeSet<String> = [NO_CLASS.to_string()].into_iter().collect();
        assert_eq!(no_class_label(&labels), "No class");
    }

    #[test]
    fn distinct_reasons_are_joined() {
        let labels: BTreeSet<String> = ["No class", "Spring Break week 9", "Holiday"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(no_class_label(&labels), "No class: Holiday, Spring Break week");
    }

    #[test]
    fn slot_labels_serialize_as_number_or_text() {
        assert_eq!(serde_json::to_string(&SlotLabel::Meeting(2)).unwrap(), "2");
        assert_eq!(serde_json::to_string(&SlotLabel::Exam).unwrap(), "\"Exam\"");
        assert_eq!(serde_json::to_string(&SlotLabel::Notice).unwrap(), "\"\"");
    }

    #[test]
    fn meetings_sort_before_exam_rows() {
        assert!(SlotLabel::Meeting(5).sort_key() < SlotLabel::Exam.sort_key());
    }
}
