//! Evaluator module: condition, group and view evaluation against one target.
//!
//! A target is a record plus the course codes a course-aggregate condition may look at.
//! Every path ends in a `bool`; nothing here can fail.

use crate::config::EngineConfig;
use crate::context::EvalContext;
use crate::dispatch::{CourseScope, Operand};
use crate::operator::Operator;
use crate::schema::FieldCatalog;
use crate::types::{FieldType, Record};
use crate::view::{Condition, ConditionGroup, ViewDefinition};
use serde_json::Value;
use std::collections::BTreeSet;

/// What a view is evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct Target<'a> {
    pub record: &'a Record,
    pub courses: CourseScope<'a>,
}

impl<'a> Target<'a> {
    /// A single record in record-level mode.
    pub fn record(record: &'a Record) -> Self {
        Self {
            record,
            courses: CourseScope::Unavailable,
        }
    }

    /// A student: a representative record plus every course the student holds.
    pub fn student(representative: &'a Record, courses: &'a BTreeSet<String>) -> Self {
        Self {
            record: representative,
            courses: CourseScope::Student(courses),
        }
    }

    /// One record of a student, with course conditions read against its own course.
    pub fn own_course(record: &'a Record, course: &'a str) -> Self {
        Self {
            record,
            courses: CourseScope::Record(course),
        }
    }
}

/// Type used to dispatch `operator` on `field`. Course operators on the course field
/// always dispatch as aggregate text; everything else follows the catalog.
pub fn dispatch_type(catalog: &FieldCatalog, field: &str, operator: Operator) -> Option<FieldType> {
    if operator.is_course_aggregate() && field == catalog.course_field() {
        Some(FieldType::AggregateText)
    } else {
        catalog.field_type(field)
    }
}

fn field_value<'a>(
    record: &'a Record,
    field: &str,
    ty: FieldType,
    config: &EngineConfig,
) -> Option<&'a Value> {
    match ty {
        FieldType::Categories => record.get(&config.categories_key),
        _ if ty.is_virtual() => None,
        _ => record.get(field),
    }
}

/// Evaluates one condition. Unknown operators, unknown fields and operators that do not
/// apply to the field's type all evaluate to `false`.
pub fn evaluate_condition(
    target: &Target<'_>,
    condition: &Condition,
    ctx: &EvalContext<'_>,
) -> bool {
    let Some(operator) = condition.operator() else {
        log::trace!("unknown operator '{}' on '{}'", condition.operator, condition.field);
        return false;
    };
    let Some(ty) = dispatch_type(ctx.catalog, &condition.field, operator) else {
        log::trace!("unknown field '{}'", condition.field);
        return false;
    };
    let operand = Operand {
        field: field_value(target.record, &condition.field, ty, ctx.config),
        value: &condition.value,
        courses: target.courses,
        now: ctx.now,
    };
    ctx.table.apply(ty, operator, &operand)
}

/// Left fold of a group's complete conditions. A group with none is vacuously true.
///
/// Every condition is evaluated in authored order; the fold does not short-circuit.
pub fn evaluate_group(target: &Target<'_>, group: &ConditionGroup, ctx: &EvalContext<'_>) -> bool {
    let mut conditions = group.complete_conditions();
    let Some(first) = conditions.next() else {
        return true;
    };
    let mut result = evaluate_condition(target, first, ctx);
    for condition in conditions {
        let matched = evaluate_condition(target, condition, ctx);
        result = group.logic_for(condition).combine(result, matched);
    }
    result
}

/// Left fold of every group with the view's group logic. No groups means every target passes.
pub fn evaluate_view(target: &Target<'_>, view: &ViewDefinition, ctx: &EvalContext<'_>) -> bool {
    let mut groups = view.groups.iter();
    let Some(first) = groups.next() else {
        return true;
    };
    let mut result = evaluate_group(target, first, ctx);
    for group in groups {
        let matched = evaluate_group(target, group, ctx);
        result = view.group_logic.combine(result, matched);
    }
    result
}
