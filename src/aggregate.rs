//! Aggregate module: student-grouped evaluation.
//!
//! In grouped mode the unit of evaluation is the student rather than the record. Results
//! are every record of each matching student, annotated with whether the record matched
//! on its own. Records without a student identifier cannot be grouped and are dropped.

use crate::config::EngineConfig;
use crate::evaluator::{evaluate_view, Target};
use crate::filter::FilterEngine;
use crate::types::Record;
use crate::view::ViewDefinition;
use std::collections::{BTreeSet, HashMap, HashSet};

/// One student's records and the distinct real course codes across them.
#[derive(Debug)]
pub struct StudentRecords<'a> {
    pub student_id: String,
    pub records: Vec<&'a Record>,
    pub courses: BTreeSet<String>,
}

impl<'a> StudentRecords<'a> {
    /// The record non-course conditions are evaluated against.
    pub fn representative(&self) -> &'a Record {
        self.records[0]
    }
}

/// Records partitioned by student, in order of first appearance.
#[derive(Debug, Default)]
pub struct StudentPartition<'a> {
    pub students: Vec<StudentRecords<'a>>,
    /// Records skipped for lacking a student identifier.
    pub ungrouped: usize,
}

impl<'a> StudentPartition<'a> {
    pub fn build(records: &'a [Record], config: &EngineConfig, course_field: &str) -> Self {
        let mut partition = StudentPartition::default();
        let mut index: HashMap<String, usize> = HashMap::new();
        for record in records {
            let Some(student_id) = record.key_text(&config.student_key) else {
                partition.ungrouped += 1;
                continue;
            };
            let slot = *index.entry(student_id.clone()).or_insert_with(|| {
                partition.students.push(StudentRecords {
                    student_id,
                    records: Vec::new(),
                    courses: BTreeSet::new(),
                });
                partition.students.len() - 1
            });
            let student = &mut partition.students[slot];
            student.records.push(record);
            if let Some(code) = record.key_text(course_field) {
                if !config.is_placeholder_course(&code) {
                    student.courses.insert(code);
                }
            }
        }
        partition
    }
}

/// Identity used to recognise a direct match among a student's records.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RecordIdentity {
    student: Option<String>,
    course: Option<String>,
    reference: Option<String>,
}

impl FilterEngine {
    /// Student-grouped filtering. Views using `student_*` course operators are evaluated
    /// once per student; other views expand record-level matches to whole students.
    /// Output keeps input order and every record carries `_isDirectMatch`.
    pub fn filter_grouped(&self, records: &[Record], view: &ViewDefinition) -> Vec<Record> {
        if view.uses_course_aggregates() {
            log::debug!("grouped view uses course operators; evaluating per student");
            self.filter_course_aggregate(records, view)
        } else {
            log::debug!("grouped view without course operators; expanding record matches");
            self.filter_expanded(records, view)
        }
    }

    fn filter_course_aggregate(&self, records: &[Record], view: &ViewDefinition) -> Vec<Record> {
        let course_field = self.catalog().course_field();
        let partition = StudentPartition::build(records, self.config(), course_field);
        warn_ungrouped(partition.ungrouped);

        let ctx = self.context();
        let matched: HashSet<&str> = partition
            .students
            .iter()
            .filter(|student| {
                let target = Target::student(student.representative(), &student.courses);
                evaluate_view(&target, view, &ctx)
            })
            .map(|student| student.student_id.as_str())
            .collect();
        log::debug!(
            "{} of {} students matched",
            matched.len(),
            partition.students.len()
        );

        records
            .iter()
            .filter_map(|record| {
                let student_id = record.key_text(&self.config().student_key)?;
                if !matched.contains(student_id.as_str()) {
                    return None;
                }
                let own_course = record.key_text(course_field).unwrap_or_default();
                let direct = evaluate_view(&Target::own_course(record, &own_course), view, &ctx);
                Some(record.annotated(direct))
            })
            .collect()
    }

    fn filter_expanded(&self, records: &[Record], view: &ViewDefinition) -> Vec<Record> {
        let direct: HashSet<RecordIdentity> = self
            .filter_records(records, view)
            .iter()
            .map(|record| self.identity(record))
            .collect();
        let students: HashSet<&str> = direct
            .iter()
            .filter_map(|identity| identity.student.as_deref())
            .collect();

        let mut ungrouped = 0;
        let expanded: Vec<Record> = records
            .iter()
            .filter_map(|record| {
                let identity = self.identity(record);
                let Some(student_id) = identity.student.as_deref() else {
                    ungrouped += 1;
                    return None;
                };
                if !students.contains(student_id) {
                    return None;
                }
                Some(record.annotated(direct.contains(&identity)))
            })
            .collect();
        warn_ungrouped(ungrouped);
        expanded
    }

    fn identity(&self, record: &Record) -> RecordIdentity {
        let config = self.config();
        RecordIdentity {
            student: record.key_text(&config.student_key),
            course: record.key_text(self.catalog().course_field()),
            reference: config
                .reference_keys
                .iter()
                .find_map(|key| record.key_text(key)),
        }
    }
}

fn warn_ungrouped(count: usize) {
    if count > 0 {
        log::warn!(
            "{count} records have no student identifier and were left out of the grouped view"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::FixedClock;
    use crate::operator::Operator;
    use crate::schema::COURSE_CODE_FIELD;
    use crate::types::LogicOp;
    use crate::view::{Condition, ConditionGroup};

    fn engine() -> FilterEngine {
        FilterEngine::builder()
            .clock(FixedClock::on(2024, 7, 15).unwrap())
            .build()
    }

    fn course(asn: &str, code: &str, status: &str) -> Record {
        Record::new()
            .with("asn", asn)
            .with(COURSE_CODE_FIELD, code)
            .with("Status_Value", status)
            .with("referenceNumber", format!("{asn}-{code}"))
    }

    fn grouped(condition: Condition) -> ViewDefinition {
        ViewDefinition::single(condition).grouped_by_student(true)
    }

    #[test]
    fn test_partition_collects_real_courses() {
        let records = vec![
            course("A001", "MAT10", "Active"),
            course("A002", "ENG10", "Active"),
            course("A001", "N/A", "Active"),
            course("A001", "MAT10", "Archived"),
            Record::new().with(COURSE_CODE_FIELD, "SCI10"),
        ];
        let config = EngineConfig::default();
        let partition = StudentPartition::build(&records, &config, COURSE_CODE_FIELD);
        assert_eq!(partition.students.len(), 2);
        assert_eq!(partition.ungrouped, 1);
        let first = &partition.students[0];
        assert_eq!(first.student_id, "A001");
        assert_eq!(first.records.len(), 3);
        assert_eq!(first.courses.iter().collect::<Vec<_>>(), vec!["MAT10"]);
        assert_eq!(first.representative(), &records[0]);
    }

    #[test]
    fn test_course_aggregate_expands_and_tags() {
        let records = vec![course("A001", "MAT10", "Active"), course("A001", "ENG10", "Active")];
        let view = grouped(Condition::new(COURSE_CODE_FIELD, Operator::StudentHasCourse, "MAT10"));
        let result = engine().filter_grouped(&records, &view);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].get(COURSE_CODE_FIELD), records[0].get(COURSE_CODE_FIELD));
        assert_eq!(result[0].is_direct_match(), Some(true));
        assert_eq!(result[1].is_direct_match(), Some(false));
    }

    #[test]
    fn test_course_aggregate_all_courses() {
        let records = vec![
            course("A001", "MAT10", "Active"),
            course("A001", "ENG10", "Active"),
            course("A002", "MAT10", "Active"),
            course("A003", "SCI10", "Active"),
        ];
        let view = grouped(Condition::new(
            COURSE_CODE_FIELD,
            Operator::StudentHasAllCourses,
            "MAT10, ENG10",
        ));
        let result = engine().filter_grouped(&records, &view);
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|r| r.key_text("asn").as_deref() == Some("A001")));
        assert!(result.iter().all(|r| r.is_direct_match() == Some(true)));
    }

    #[test]
    fn test_course_aggregate_none_of() {
        let records = vec![
            course("A001", "MAT10", "Active"),
            course("A002", "ENG10", "Active"),
            course("A002", "SCI10", "Active"),
        ];
        let view = grouped(Condition::new(
            COURSE_CODE_FIELD,
            Operator::StudentHasNoneOfCourses,
            "MAT10,PHY20",
        ));
        let result = engine().filter_grouped(&records, &view);
        let asns: Vec<_> = result.iter().filter_map(|r| r.key_text("asn")).collect();
        assert_eq!(asns, vec!["A002", "A002"]);
    }

    #[test]
    fn test_course_aggregate_other_conditions_use_first_record() {
        let records = vec![
            course("A001", "MAT10", "Archived"),
            course("A001", "ENG10", "Active"),
            course("A002", "MAT10", "Active"),
        ];
        let view = ViewDefinition::new(LogicOp::And).grouped_by_student(true).with_group(
            ConditionGroup::new("g", LogicOp::And)
                .with_condition(Condition::new(
                    COURSE_CODE_FIELD,
                    Operator::StudentHasCourse,
                    "MAT10",
                ))
                .with_condition(Condition::new("Status_Value", Operator::Equals, "Active")),
        );
        let result = engine().filter_grouped(&records, &view);
        let asns: Vec<_> = result.iter().filter_map(|r| r.key_text("asn")).collect();
        assert_eq!(asns, vec!["A002"]);
    }

    #[test]
    fn test_direct_match_rechecks_every_condition_on_the_record() {
        // The student matches through the first record's status and the MAT10 course, but
        // neither record satisfies both conditions on its own.
        let records = vec![course("A001", "ENG10", "Active"), course("A001", "MAT10", "Archived")];
        let view = ViewDefinition::new(LogicOp::And).grouped_by_student(true).with_group(
            ConditionGroup::new("g", LogicOp::And)
                .with_condition(Condition::new(
                    COURSE_CODE_FIELD,
                    Operator::StudentHasCourse,
                    "MAT10",
                ))
                .with_condition(Condition::new("Status_Value", Operator::Equals, "Active")),
        );
        let result = engine().filter_grouped(&records, &view);
        let tagged: Vec<_> = result
            .iter()
            .map(|r| (r.key_text(COURSE_CODE_FIELD), r.is_direct_match()))
            .collect();
        assert_eq!(
            tagged,
            vec![
                (Some("ENG10".to_string()), Some(false)),
                (Some("MAT10".to_string()), Some(false)),
            ]
        );
    }

    #[test]
    fn test_placeholder_course_is_not_held() {
        let records = vec![course("A001", "N/A", "Active")];
        let view = grouped(Condition::new(COURSE_CODE_FIELD, Operator::StudentHasCourse, "N/A"));
        assert!(engine().filter_grouped(&records, &view).is_empty());
    }

    #[test]
    fn test_plain_grouped_expands_direct_matches() {
        let records = vec![
            course("A001", "MAT10", "Active"),
            course("A001", "ENG10", "Archived"),
            course("A002", "SCI10", "Archived"),
        ];
        let view = grouped(Condition::new("Status_Value", Operator::Equals, "Active"));
        let result = engine().filter_grouped(&records, &view);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].is_direct_match(), Some(true));
        assert_eq!(result[1].is_direct_match(), Some(false));
        assert_eq!(result[1].key_text(COURSE_CODE_FIELD).as_deref(), Some("ENG10"));
    }

    #[test]
    fn test_records_without_student_are_dropped() {
        let records = vec![
            Record::new().with(COURSE_CODE_FIELD, "MAT10").with("Status_Value", "Active"),
            course("A001", "MAT10", "Active"),
            Record::new()
                .with("asn", "  ")
                .with(COURSE_CODE_FIELD, "MAT10")
                .with("Status_Value", "Active"),
        ];
        let plain = grouped(Condition::new("Status_Value", Operator::Equals, "Active"));
        assert_eq!(engine().filter_grouped(&records, &plain).len(), 1);
        let aggregate = grouped(Condition::new(
            COURSE_CODE_FIELD,
            Operator::StudentHasCourse,
            "MAT10",
        ));
        assert_eq!(engine().filter_grouped(&records, &aggregate).len(), 1);
    }

    #[test]
    fn test_grouped_output_keeps_input_order() {
        let records = vec![
            course("A002", "ENG10", "Archived"),
            course("A001", "MAT10", "Active"),
            course("A002", "MAT10", "Active"),
            course("A001", "SCI10", "Archived"),
        ];
        let view = grouped(Condition::new("Status_Value", Operator::Equals, "Active"));
        let result = engine().filter_grouped(&records, &view);
        let refs: Vec<_> = result.iter().filter_map(|r| r.key_text("referenceNumber")).collect();
        assert_eq!(refs, vec!["A002-ENG10", "A001-MAT10", "A002-MAT10", "A001-SCI10"]);
    }

    #[test]
    fn test_grouped_view_without_groups_keeps_every_student() {
        let records = vec![course("A001", "MAT10", "Active"), course("A002", "ENG10", "Active")];
        let view = ViewDefinition::default().grouped_by_student(true);
        let result = engine().filter_grouped(&records, &view);
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|r| r.is_direct_match() == Some(true)));
    }
}
