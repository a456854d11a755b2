//! Exam coverage resolution.
//!
//! Coverage can be declared in two places: the plan-level `exam_coverage` map
//! and each topic's `appears_on` list. Both are merged once, up front, into a
//! single [`Coverage`] used by exam placement and row building. Exams keep
//! their declaration order: `exam_coverage` first, then exams named only by
//! `appears_on`, in topic order.

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;

use crate::plan::{CoursePlan, ExamGroup};

/// Canonical exam <-> topic coverage for one plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Coverage {
    by_exam: IndexMap<String, Vec<String>>,
    by_topic: BTreeMap<String, BTreeSet<String>>,
}

impl Coverage {
    pub fn resolve(plan: &CoursePlan) -> Self {
        let mut by_exam = plan.exam_coverage.clone();
        for topic in &plan.topics {
            for exam in &topic.appears_on {
                let topics = by_exam.entry(exam.clone()).or_default();
                if !topics.contains(&topic.id) {
                    topics.push(topic.id.clone());
                }
            }
        }

        let mut by_topic: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (exam, topic_ids) in &by_exam {
            for topic_id in topic_ids {
                by_topic
                    .entry(topic_id.clone())
                    .or_default()
                    .insert(exam.clone());
            }
        }

        Self { by_exam, by_topic }
    }

    /// Topic ids covered by `exam`, in declaration order.
    pub fn topics_for_exam(&self, exam: &str) -> &[String] {
        self.by_exam.get(exam).map(Vec::as_slice).unwrap_or_default()
    }

    /// Exams covering `topic_id`, sorted by name.
    pub fn exams_for_topic(&self, topic_id: &str) -> impl Iterator<Item = &str> {
        self.by_topic
            .get(topic_id)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// One implicit group per exam with a non-empty coverage list, in
    /// declaration order, used when the plan declares no exam groups.
    pub fn implicit_groups(&self) -> Vec<ExamGroup> {
        self.by_exam
            .iter()
            .filter(|(_, topics)| !topics.is_empty())
            .map(|(name, topics)| ExamGroup {
                name: name.clone(),
                included_topics: topics.clone(),
                ..ExamGroup::default()
            })
            .collect()
    }
}
