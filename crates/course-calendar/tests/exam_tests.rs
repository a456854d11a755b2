//! Tests for exam placement and its fixpoint with topic packing.

use chrono::NaiveDate;
use course_calendar::coverage::Coverage;
use course_calendar::exams::{place_exams, ExamPlacement};
use course_calendar::slots::all_section_slots;
use course_calendar::{CoursePlan, ScheduleWarning, Timeline};
use serde_json::{json, Value};

// ── Helpers ─────────────────────────────────────────────────────────────────

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn topics(n: usize) -> Value {
    Value::Array(
        (1..=n)
            .map(|i| json!({"id": format!("t{i}"), "title": format!("Topic {i}")}))
            .collect(),
    )
}

/// Single Mon/Wed section starting 2026-01-05 with `n_topics` one-hour topics.
fn mw_plan(end: &str, n_topics: usize, exam_rules: Value) -> CoursePlan {
    serde_json::from_value(json!({
        "term": {"start_date": "2026-01-05", "end_date": end},
        "sections": [{"id": "sec_mw", "meeting_days": [0, 2]}],
        "topics": topics(n_topics),
        "exam_rules": exam_rules
    }))
    .unwrap()
}

fn place(plan: &CoursePlan) -> (Timeline, ExamPlacement) {
    let timeline =
        Timeline::synchronize(&plan.sync, &all_section_slots(&plan.sections, &plan.term)).unwrap();
    let coverage = Coverage::resolve(plan);
    let placement = place_exams(plan, &timeline, &coverage);
    (timeline, placement)
}

// ── Fixed overrides ─────────────────────────────────────────────────────────

#[test]
fn fixed_override_blocks_slot_before_packing() {
    let plan = mw_plan(
        "2026-01-16",
        3,
        json!({"groups": [{"name": "Quiz", "fixed_date_overrides": {"sec_mw": "2026-01-07"}}]}),
    );
    let (_, placement) = place(&plan);

    assert_eq!(placement.exam_slots["Quiz"].iter().copied().collect::<Vec<_>>(), vec![1]);
    assert!(placement.allocation.slot(1).is_empty());
    assert_eq!(placement.allocation.topic_spans["t2"].first, 2);
    assert_eq!(placement.allocation.topic_spans["t3"].first, 3);
    assert!(placement.warnings.is_empty());
}

#[test]
fn unknown_section_is_reported_and_derivation_continues() {
    let plan = mw_plan(
        "2026-01-16",
        2,
        json!({"groups": [{
            "name": "Quiz",
            "through_topic": "t1",
            "class_meeting_index_in_week": 1,
            "min_class_meetings_after_last_new_material": 0,
            "fixed_date_overrides": {"sec_x": "2026-01-07"}
        }]}),
    );
    let (_, placement) = place(&plan);

    assert_eq!(
        placement.warnings,
        vec![ScheduleWarning::UnknownSection {
            exam: "Quiz".into(),
            section_id: "sec_x".into()
        }]
    );
    assert_eq!(placement.exam_dates["Quiz"]["sec_mw"], date("2026-01-12"));
    assert!(placement.blocked.contains(&2));
}

#[test]
fn partial_override_fills_other_sections_from_anchor_slot() {
    let plan: CoursePlan = serde_json::from_value(json!({
        "term": {"start_date": "2026-01-05", "end_date": "2026-01-16"},
        "sections": [
            {"id": "sec_mw", "meeting_days": [0, 2]},
            {"id": "sec_tth", "meeting_days": [1, 3]}
        ],
        "topics": topics(3),
        "exam_rules": {"groups": [{
            "name": "Exam 1",
            "through_topic": "t1",
            "fixed_date_overrides": {"sec_mw": "2026-01-07"}
        }]}
    }))
    .unwrap();
    let (_, placement) = place(&plan);

    let dates = &placement.exam_dates["Exam 1"];
    assert_eq!(dates["sec_mw"], date("2026-01-07"));
    assert_eq!(dates["sec_tth"], date("2026-01-08"));
    assert_eq!(placement.blocked.len(), 1);
    assert!(placement.warnings.is_empty());
}

// ── Derivation ──────────────────────────────────────────────────────────────

#[test]
fn derived_exam_respects_gap_and_preferred_meeting() {
    // Defaults: one meeting gap, second meeting of the week.
    let plan = mw_plan(
        "2026-01-23",
        3,
        json!({"groups": [{"name": "Midterm", "through_topic": "t1"}]}),
    );
    let (timeline, placement) = place(&plan);

    let slot = *placement.exam_slots["Midterm"].iter().next().unwrap();
    assert_eq!(slot, 3);
    assert_eq!(timeline.slot(slot).slot_in_week, 2);
    assert_eq!(placement.exam_dates["Midterm"]["sec_mw"], date("2026-01-14"));
    assert!(placement.allocation.slot(3).is_empty());
    assert_eq!(placement.allocation.topic_spans["t3"].first, 2);
}

#[test]
fn preferred_meeting_relaxes_when_unavailable() {
    let plan = mw_plan(
        "2026-01-12",
        1,
        json!({"groups": [{
            "name": "Quiz",
            "through_topic": "t1",
            "min_class_meetings_after_last_new_material": 1,
            "class_meeting_index_in_week": 2
        }]}),
    );
    let (_, placement) = place(&plan);

    // Slots: Jan 5, Jan 7, Jan 12. Only index 2 (a first meeting) is open.
    assert_eq!(placement.exam_dates["Quiz"]["sec_mw"], date("2026-01-12"));
}

#[test]
fn coverage_without_scheduled_topics_cannot_be_derived() {
    let plan = mw_plan(
        "2026-01-16",
        2,
        json!({"groups": [{"name": "Exam 1", "through_topic": "missing"}]}),
    );
    let (_, placement) = place(&plan);

    assert!(placement.exam_dates.is_empty());
    assert_eq!(placement.warnings.len(), 1);
    assert!(placement.warnings[0].to_string().contains("could not be derived"));
}

#[test]
fn exam_after_last_slot_cannot_be_scheduled() {
    let plan = mw_plan(
        "2026-01-09",
        2,
        json!({"groups": [{"name": "Exam 1", "through_topic": "t2"}]}),
    );
    let (_, placement) = place(&plan);

    assert!(placement.exam_dates.is_empty());
    assert_eq!(
        placement.warnings,
        vec![ScheduleWarning::NoCandidateSlot {
            exam: "Exam 1".into()
        }]
    );
}

#[test]
fn unmet_break_requirement_warns_but_still_places() {
    let break_term = |require: bool| -> CoursePlan {
        serde_json::from_value(json!({
            "term": {
                "start_date": "2026-01-05",
                "end_date": "2026-01-30",
                "breaks": [{"name": "Spring", "start_date": "2026-01-19", "end_date": "2026-01-23"}]
            },
            "sections": [{"id": "sec_mw", "meeting_days": [0, 2]}],
            "topics": topics(3),
            "exam_rules": {"groups": [{
                "name": "Exam 1",
                "through_topic": "t3",
                "require_before_break": require
            }]}
        }))
        .unwrap()
    };

    let (_, preferred) = place(&break_term(false));
    assert!(preferred.warnings.is_empty());
    assert_eq!(preferred.exam_dates["Exam 1"]["sec_mw"], date("2026-01-28"));

    let (_, required) = place(&break_term(true));
    assert_eq!(required.exam_dates["Exam 1"]["sec_mw"], date("2026-01-28"));
    assert_eq!(
        required.warnings,
        vec![ScheduleWarning::BreakRequirementUnmet {
            exam: "Exam 1".into(),
            break_start: date("2026-01-19")
        }]
    );
    assert!(required.warnings[0]
        .to_string()
        .contains("before break starting 2026-01-19"));
}

/// Mon/Tue and Fri sections on a union timeline. The first slot of week 2
/// pairs Mon Jan 12 with Fri Jan 16, which falls inside the Jan 15 break; the
/// second slot (Tue Jan 13) lies entirely before it.
fn straddling_break_plan(prefer: bool, require: bool) -> CoursePlan {
    serde_json::from_value(json!({
        "term": {
            "start_date": "2026-01-05",
            "end_date": "2026-01-30",
            "breaks": [{
                "name": "Retreat",
                "start_date": "2026-01-15",
                "end_date": "2026-01-16",
                "applies_to": ["sec_mt"]
            }]
        },
        "sections": [
            {"id": "sec_mt", "meeting_days": [0, 1]},
            {"id": "sec_f", "meeting_days": [4]}
        ],
        "sync": {"skip_for_all_if_any_section_skips": false},
        "topics": topics(2),
        "exam_rules": {"groups": [{
            "name": "Exam 1",
            "through_topic": "t2",
            "min_class_meetings_after_last_new_material": 0,
            "class_meeting_index_in_week": 3,
            "prefer_before_break": prefer,
            "require_before_break": require
        }]}
    }))
    .unwrap()
}

#[test]
fn earliest_slot_wins_without_break_preference() {
    let (_, placement) = place(&straddling_break_plan(false, false));

    assert_eq!(placement.exam_slots["Exam 1"].iter().copied().collect::<Vec<_>>(), vec![2]);
    let dates = &placement.exam_dates["Exam 1"];
    assert_eq!(dates["sec_mt"], date("2026-01-12"));
    assert_eq!(dates["sec_f"], date("2026-01-16"));
}

#[test]
fn prefer_before_break_skips_slot_reaching_into_break() {
    let (timeline, placement) = place(&straddling_break_plan(true, false));

    assert_eq!(placement.exam_slots["Exam 1"].iter().copied().collect::<Vec<_>>(), vec![3]);
    assert_eq!(timeline.slot(3).latest_date(), Some(date("2026-01-13")));
    let dates = &placement.exam_dates["Exam 1"];
    assert_eq!(dates.len(), 1);
    assert_eq!(dates["sec_mt"], date("2026-01-13"));
    assert!(placement.warnings.is_empty());
}

#[test]
fn satisfiable_break_requirement_places_without_warning() {
    let (_, placement) = place(&straddling_break_plan(false, true));

    assert_eq!(placement.exam_dates["Exam 1"]["sec_mt"], date("2026-01-13"));
    assert!(placement.warnings.is_empty());
}

#[test]
fn groups_are_resolved_in_order_against_growing_blocked_set() {
    let plan = mw_plan(
        "2026-01-30",
        4,
        json!({
            "defaults": {"min_class_meetings_after_last_new_material": 0, "class_meeting_index_in_week": 1},
            "groups": [
                {"name": "Quiz 1", "through_topic": "t1"},
                {"name": "Quiz 2", "through_topic": "t2"}
            ]
        }),
    );
    let (_, placement) = place(&plan);

    // Quiz 1 takes Jan 12 and pushes t3 back; Quiz 2 gets the next first meeting.
    assert_eq!(placement.exam_dates["Quiz 1"]["sec_mw"], date("2026-01-12"));
    assert_eq!(placement.exam_dates["Quiz 2"]["sec_mw"], date("2026-01-19"));
    for slot in &placement.blocked {
        assert!(placement.allocation.slot(*slot).is_empty());
    }
    assert!(placement.allocation.warnings.is_empty());
}

#[test]
fn group_without_name_is_ignored() {
    let plan = mw_plan(
        "2026-01-16",
        2,
        json!({"groups": [
            {"fixed_date_overrides": {"sec_mw": "2026-01-05"}},
            {"name": "Quiz", "fixed_date_overrides": {"sec_mw": "2026-01-07"}}
        ]}),
    );
    let (_, placement) = place(&plan);

    assert_eq!(placement.exam_dates.len(), 1);
    assert_eq!(placement.exam_dates["Quiz"]["sec_mw"], date("2026-01-07"));
    assert_eq!(placement.blocked.iter().copied().collect::<Vec<_>>(), vec![1]);
}

#[test]
fn blank_group_names_are_ignored() {
    let plan = mw_plan(
        "2026-01-16",
        2,
        json!({"groups": [{"name": "  ", "fixed_date_overrides": {"sec_mw": "2026-01-05"}}]}),
    );
    let (_, placement) = place(&plan);
    assert!(placement.exam_dates.is_empty());
    assert!(placement.blocked.is_empty());
}

// ── Coverage sources ────────────────────────────────────────────────────────

#[test]
fn exam_coverage_creates_implicit_groups() {
    let mut plan = mw_plan("2026-01-16", 2, json!({}));
    plan.exam_coverage
        .insert("Midterm".into(), vec!["t1".into()]);
    let (_, placement) = place(&plan);

    assert_eq!(placement.exam_dates["Midterm"]["sec_mw"], date("2026-01-14"));
}

#[test]
fn implicit_groups_follow_declared_coverage_order() {
    let plan: CoursePlan = serde_json::from_value(json!({
        "term": {"start_date": "2026-01-05", "end_date": "2026-02-13"},
        "sections": [{"id": "sec_mw", "meeting_days": [0, 2]}],
        "topics": topics(6),
        "exam_rules": {"defaults": {
            "min_class_meetings_after_last_new_material": 0,
            "class_meeting_index_in_week": 1
        }},
        "exam_coverage": {"Midterm": ["t1"], "Final": ["t4"]}
    }))
    .unwrap();
    let (timeline, placement) = place(&plan);

    let names: Vec<&String> = placement.exam_dates.keys().collect();
    assert_eq!(names, ["Midterm", "Final"]);
    assert_eq!(placement.exam_dates["Midterm"]["sec_mw"], date("2026-01-12"));
    assert_eq!(placement.exam_dates["Final"]["sec_mw"], date("2026-01-26"));

    // The final comes after the last meeting that teaches its coverage.
    let t4_slot = placement.allocation.topic_spans["t4"].last;
    let t4_date = timeline.slot(t4_slot).date_for("sec_mw").unwrap();
    assert_eq!(t4_date, date("2026-01-19"));
    assert!(t4_date < placement.exam_dates["Final"]["sec_mw"]);
}

#[test]
fn appears_on_extends_group_coverage() {
    let rules = json!({
        "defaults": {"min_class_meetings_after_last_new_material": 0},
        "groups": [{"name": "Midterm", "included_topics": ["t1"]}]
    });

    let (_, without) = place(&mw_plan("2026-01-16", 2, rules.clone()));
    assert_eq!(without.exam_dates["Midterm"]["sec_mw"], date("2026-01-07"));

    let mut plan = mw_plan("2026-01-16", 2, rules);
    plan.topics[1].appears_on = vec!["Midterm".into()];
    let (_, with) = place(&plan);
    assert_eq!(with.exam_dates["Midterm"]["sec_mw"], date("2026-01-14"));
}
