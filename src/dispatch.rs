//! Dispatch module: the operator table mapping `(FieldType, Operator)` to a predicate.
//!
//! Every built-in operator is a plain function over an [`Operand`]. Combinations missing
//! from the table fail closed at evaluation time.

use crate::operator::Operator;
use crate::types::{
    date_of, is_truthy, number_of, parse_date, parse_number, text_of, FieldType, NOT_AVAILABLE,
};
use chrono::NaiveDateTime;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};

/// Course codes visible to a course-aggregate condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseScope<'a> {
    /// Record-level evaluation: course-aggregate conditions cannot hold.
    Unavailable,
    /// Every distinct course the student holds.
    Student(&'a BTreeSet<String>),
    /// One record's own course, used to decide whether that record is a direct match.
    Record(&'a str),
}

/// Inputs of a single operator call.
#[derive(Debug, Clone, Copy)]
pub struct Operand<'a> {
    /// Stored value of the field, or the category map for category fields.
    pub field: Option<&'a Value>,
    /// Raw condition value as authored.
    pub value: &'a str,
    pub courses: CourseScope<'a>,
    pub now: NaiveDateTime,
}

pub type OperatorFn = fn(&Operand<'_>) -> bool;

#[derive(Clone, Default)]
pub struct OperatorTable {
    entries: HashMap<(FieldType, Operator), OperatorFn>,
}

impl OperatorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table holding every built-in operator.
    pub fn with_builtins() -> Self {
        let mut table = Self::new();
        register_builtins(&mut table);
        table
    }

    pub fn register(&mut self, ty: FieldType, op: Operator, func: OperatorFn) {
        self.entries.insert((ty, op), func);
    }

    pub fn get(&self, ty: FieldType, op: Operator) -> Option<OperatorFn> {
        self.entries.get(&(ty, op)).copied()
    }

    /// Runs the registered predicate; unregistered pairs evaluate to `false`.
    pub fn apply(&self, ty: FieldType, op: Operator, operand: &Operand<'_>) -> bool {
        match self.get(ty, op) {
            Some(func) => func(operand),
            None => {
                log::trace!("no predicate registered for {ty}/{op}");
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for OperatorTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<_> = self.entries.keys().collect();
        keys.sort();
        f.debug_struct("OperatorTable").field("entries", &keys).finish()
    }
}

macro_rules! builtin_operators {
    ($( ($ty:ident, $op:ident) => $func:path ),* $(,)?) => {
        pub fn register_builtins(table: &mut OperatorTable) {
            $(table.register(FieldType::$ty, Operator::$op, $func);)*
        }
    };
}

builtin_operators! {
    (Text, Equals) => text::equals,
    (Text, NotEquals) => text::not_equals,
    (Text, Contains) => text::contains,
    (Text, NotContains) => text::not_contains,
    (Text, StartsWith) => text::starts_with,
    (Text, EndsWith) => text::ends_with,
    (Text, IsEmpty) => text::is_empty,
    (Text, IsNotEmpty) => text::is_not_empty,

    (Number, Equals) => number::equals,
    (Number, NotEquals) => number::not_equals,
    (Number, GreaterThan) => number::greater_than,
    (Number, LessThan) => number::less_than,
    (Number, GreaterThanEqual) => number::greater_than_equal,
    (Number, LessThanEqual) => number::less_than_equal,

    (Date, Equals) => date::equals,
    (Date, NotEquals) => date::not_equals,
    (Date, Before) => date::before,
    (Date, After) => date::after,

    (Boolean, IsTrue) => boolean::is_true,
    (Boolean, IsFalse) => boolean::is_false,
    (Boolean, Exists) => boolean::exists,
    (Boolean, NotExists) => boolean::not_exists,

    (Categories, HasCategory) => categories::has_category,
    (Categories, DoesNotHaveCategory) => categories::does_not_have_category,
    (Categories, HasAnyOfCategories) => categories::has_any_of,
    (Categories, HasAllCategories) => categories::has_all,
    (Categories, HasNoneOfCategories) => categories::has_none_of,
    (Categories, IsEmpty) => categories::is_empty,
    (Categories, IsNotEmpty) => categories::is_not_empty,

    (CurrentDate, MonthEquals) => calendar::month_equals,
    (CurrentDate, MonthNotEquals) => calendar::month_not_equals,
    (CurrentDate, MonthIsOneOf) => calendar::month_is_one_of,
    (CurrentDate, MonthIsNotOneOf) => calendar::month_is_not_one_of,
    (CurrentDate, WeekdayIsOneOf) => calendar::weekday_is_one_of,
    (CurrentDate, DayOfMonthEquals) => calendar::day_of_month_equals,
    (CurrentDate, DayOfMonthGreaterThan) => calendar::day_of_month_greater_than,
    (CurrentDate, DayOfMonthLessThan) => calendar::day_of_month_less_than,
    (CurrentDate, YearEquals) => calendar::year_equals,

    (AggregateText, StudentHasCourse) => courses::has_course,
    (AggregateText, StudentDoesNotHaveCourse) => courses::does_not_have_course,
    (AggregateText, StudentHasAnyOfCourses) => courses::has_any_of,
    (AggregateText, StudentHasAllCourses) => courses::has_all,
    (AggregateText, StudentHasNoneOfCourses) => courses::has_none_of,
}

/// Comma-separated condition values, trimmed. Blank input yields one blank token.
pub fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim)
}

mod text {
    use super::*;

    fn lowered(o: &Operand<'_>) -> (String, String) {
        (text_of(o.field).to_lowercase(), o.value.to_lowercase())
    }

    pub fn equals(o: &Operand<'_>) -> bool {
        let (field, value) = lowered(o);
        field == value
    }

    pub fn not_equals(o: &Operand<'_>) -> bool {
        !equals(o)
    }

    pub fn contains(o: &Operand<'_>) -> bool {
        let (field, value) = lowered(o);
        field.contains(&value)
    }

    pub fn not_contains(o: &Operand<'_>) -> bool {
        !contains(o)
    }

    pub fn starts_with(o: &Operand<'_>) -> bool {
        let (field, value) = lowered(o);
        field.starts_with(&value)
    }

    pub fn ends_with(o: &Operand<'_>) -> bool {
        let (field, value) = lowered(o);
        field.ends_with(&value)
    }

    pub fn is_empty(o: &Operand<'_>) -> bool {
        let text = text_of(o.field);
        text.is_empty() || text == NOT_AVAILABLE
    }

    pub fn is_not_empty(o: &Operand<'_>) -> bool {
        !is_empty(o)
    }
}

// NaN never compares equal or ordered, so unreadable numbers only satisfy `not_equals`.
mod number {
    use super::*;

    fn operands(o: &Operand<'_>) -> (f64, f64) {
        (number_of(o.field), parse_number(o.value))
    }

    pub fn equals(o: &Operand<'_>) -> bool {
        let (a, b) = operands(o);
        a == b
    }

    pub fn not_equals(o: &Operand<'_>) -> bool {
        !equals(o)
    }

    pub fn greater_than(o: &Operand<'_>) -> bool {
        let (a, b) = operands(o);
        a > b
    }

    pub fn less_than(o: &Operand<'_>) -> bool {
        let (a, b) = operands(o);
        a < b
    }

    pub fn greater_than_equal(o: &Operand<'_>) -> bool {
        let (a, b) = operands(o);
        a >= b
    }

    pub fn less_than_equal(o: &Operand<'_>) -> bool {
        let (a, b) = operands(o);
        a <= b
    }
}

// An invalid date on either side makes every comparison false except `not_equals`.
mod date {
    use super::*;

    pub fn equals(o: &Operand<'_>) -> bool {
        match (date_of(o.field), parse_date(o.value)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    pub fn not_equals(o: &Operand<'_>) -> bool {
        !equals(o)
    }

    pub fn before(o: &Operand<'_>) -> bool {
        match (date_of(o.field), parse_date(o.value)) {
            (Some(a), Some(b)) => a < b,
            _ => false,
        }
    }

    pub fn after(o: &Operand<'_>) -> bool {
        match (date_of(o.field), parse_date(o.value)) {
            (Some(a), Some(b)) => a > b,
            _ => false,
        }
    }
}

mod boolean {
    use super::*;

    pub fn is_true(o: &Operand<'_>) -> bool {
        match o.field {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s == "true" || s == "Yes",
            _ => false,
        }
    }

    pub fn is_false(o: &Operand<'_>) -> bool {
        match o.field {
            Some(Value::Bool(b)) => !*b,
            Some(Value::String(s)) => s == "false" || s == "No",
            _ => false,
        }
    }

    pub fn exists(o: &Operand<'_>) -> bool {
        !matches!(o.field, None | Some(Value::Null))
    }

    pub fn not_exists(o: &Operand<'_>) -> bool {
        !exists(o)
    }
}

/// Category references are either a bare legacy id looked up at the top level of the
/// category map, or `owner.categoryId` split at the first dot. Owner keys are sanitized
/// emails that use commas in place of dots, so the first dot always ends the owner.
mod categories {
    use super::*;
    use serde_json::Map;

    fn map<'a>(o: &Operand<'a>) -> Option<&'a Map<String, Value>> {
        o.field.and_then(Value::as_object)
    }

    pub(super) fn holds(categories: Option<&Map<String, Value>>, reference: &str) -> bool {
        let Some(categories) = categories else {
            return false;
        };
        let reference = reference.trim();
        if reference.is_empty() {
            return false;
        }
        match reference.split_once('.') {
            Some((owner, id)) => categories
                .get(owner)
                .and_then(Value::as_object)
                .map(|owned| is_truthy(owned.get(id)))
                .unwrap_or(false),
            None => is_truthy(categories.get(reference)),
        }
    }

    pub fn has_category(o: &Operand<'_>) -> bool {
        holds(map(o), o.value)
    }

    pub fn does_not_have_category(o: &Operand<'_>) -> bool {
        !has_category(o)
    }

    pub fn has_any_of(o: &Operand<'_>) -> bool {
        let categories = map(o);
        split_list(o.value).any(|reference| holds(categories, reference))
    }

    pub fn has_all(o: &Operand<'_>) -> bool {
        let categories = map(o);
        split_list(o.value).all(|reference| holds(categories, reference))
    }

    pub fn has_none_of(o: &Operand<'_>) -> bool {
        !has_any_of(o)
    }

    pub fn is_empty(o: &Operand<'_>) -> bool {
        map(o).map(|m| m.is_empty()).unwrap_or(true)
    }

    pub fn is_not_empty(o: &Operand<'_>) -> bool {
        !is_empty(o)
    }
}

mod calendar {
    use super::*;
    use chrono::Datelike;

    const MONTHS: [&str; 12] = [
        "january",
        "february",
        "march",
        "april",
        "may",
        "june",
        "july",
        "august",
        "september",
        "october",
        "november",
        "december",
    ];

    const WEEKDAYS: [&str; 7] = [
        "sunday",
        "monday",
        "tuesday",
        "wednesday",
        "thursday",
        "friday",
        "saturday",
    ];

    /// `January`..`December` or `1`..`12`.
    pub(super) fn month_number(token: &str) -> Option<u32> {
        let token = token.trim();
        if let Some(n) = numeric(token) {
            return Some(n);
        }
        let lowered = token.to_lowercase();
        MONTHS
            .iter()
            .position(|name| *name == lowered)
            .map(|i| i as u32 + 1)
    }

    /// `Sunday`..`Saturday` or `0`..`6`.
    pub(super) fn weekday_number(token: &str) -> Option<u32> {
        let token = token.trim();
        if let Some(n) = numeric(token) {
            return Some(n);
        }
        let lowered = token.to_lowercase();
        WEEKDAYS
            .iter()
            .position(|name| *name == lowered)
            .map(|i| i as u32)
    }

    /// Leading integer of `text`, ignoring trailing garbage such as `15th`.
    pub(super) fn leading_int(text: &str) -> Option<i64> {
        let text = text.trim();
        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };
        let end = digits
            .char_indices()
            .find(|(_, c)| !c.is_ascii_digit())
            .map(|(i, _)| i)
            .unwrap_or(digits.len());
        let n = digits[..end].parse::<i64>().ok()?;
        Some(if negative { -n } else { n })
    }

    /// Numeric current-date values are all read by leading integer, so `7th` is `7`.
    fn numeric(token: &str) -> Option<u32> {
        leading_int(token).and_then(|n| u32::try_from(n).ok())
    }

    pub fn month_equals(o: &Operand<'_>) -> bool {
        month_number(o.value) == Some(o.now.month())
    }

    pub fn month_not_equals(o: &Operand<'_>) -> bool {
        !month_equals(o)
    }

    pub fn month_is_one_of(o: &Operand<'_>) -> bool {
        let month = o.now.month();
        split_list(o.value).any(|token| month_number(token) == Some(month))
    }

    pub fn month_is_not_one_of(o: &Operand<'_>) -> bool {
        !month_is_one_of(o)
    }

    pub fn weekday_is_one_of(o: &Operand<'_>) -> bool {
        let weekday = o.now.weekday().num_days_from_sunday();
        split_list(o.value).any(|token| weekday_number(token) == Some(weekday))
    }

    pub fn day_of_month_equals(o: &Operand<'_>) -> bool {
        leading_int(o.value) == Some(i64::from(o.now.day()))
    }

    pub fn day_of_month_greater_than(o: &Operand<'_>) -> bool {
        leading_int(o.value).is_some_and(|day| i64::from(o.now.day()) > day)
    }

    pub fn day_of_month_less_than(o: &Operand<'_>) -> bool {
        leading_int(o.value).is_some_and(|day| i64::from(o.now.day()) < day)
    }

    pub fn year_equals(o: &Operand<'_>) -> bool {
        leading_int(o.value) == Some(i64::from(o.now.year()))
    }
}

/// Course-set operators. Against a single record, a listed course counts when it is the
/// record's own course, which is how direct matches are told apart inside a student.
mod courses {
    use super::*;

    fn holds(scope: CourseScope<'_>, code: &str) -> bool {
        match scope {
            CourseScope::Unavailable => false,
            CourseScope::Student(set) => set.contains(code),
            CourseScope::Record(own) => own == code,
        }
    }

    fn available(o: &Operand<'_>) -> bool {
        !matches!(o.courses, CourseScope::Unavailable)
    }

    pub fn has_course(o: &Operand<'_>) -> bool {
        holds(o.courses, o.value.trim())
    }

    pub fn does_not_have_course(o: &Operand<'_>) -> bool {
        available(o) && !has_course(o)
    }

    pub fn has_any_of(o: &Operand<'_>) -> bool {
        split_list(o.value).any(|code| holds(o.courses, code))
    }

    pub fn has_all(o: &Operand<'_>) -> bool {
        match o.courses {
            CourseScope::Unavailable => false,
            CourseScope::Student(_) => split_list(o.value).all(|code| holds(o.courses, code)),
            CourseScope::Record(_) => has_any_of(o),
        }
    }

    pub fn has_none_of(o: &Operand<'_>) -> bool {
        available(o) && !has_any_of(o)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn monday() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 7, 15)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn run(ty: FieldType, op: Operator, field: Option<&Value>, value: &str) -> bool {
        let operand = Operand {
            field,
            value,
            courses: CourseScope::Unavailable,
            now: monday(),
        };
        OperatorTable::with_builtins().apply(ty, op, &operand)
    }

    fn run_courses(op: Operator, courses: CourseScope<'_>, value: &str) -> bool {
        let operand = Operand {
            field: None,
            value,
            courses,
            now: monday(),
        };
        OperatorTable::with_builtins().apply(FieldType::AggregateText, op, &operand)
    }

    #[test]
    fn test_builtins_cover_catalog() {
        let table = OperatorTable::with_builtins();
        for ty in [
            FieldType::Text,
            FieldType::Number,
            FieldType::Date,
            FieldType::Boolean,
            FieldType::Categories,
            FieldType::CurrentDate,
            FieldType::AggregateText,
        ] {
            for op in crate::operator::operators_for_type(ty) {
                assert!(table.get(ty, *op).is_some(), "missing {ty}/{op}");
            }
        }
        assert_eq!(table.len(), 43);
    }

    #[test]
    fn test_unregistered_pair_fails_closed() {
        assert!(!run(FieldType::Number, Operator::Contains, Some(&json!(5)), "5"));
        assert!(!OperatorTable::new().apply(
            FieldType::Text,
            Operator::IsEmpty,
            &Operand {
                field: None,
                value: "",
                courses: CourseScope::Unavailable,
                now: monday()
            }
        ));
    }

    #[test]
    fn test_text_is_case_insensitive() {
        let active = json!("Active");
        assert!(run(FieldType::Text, Operator::Equals, Some(&active), "active"));
        assert!(run(FieldType::Text, Operator::NotEquals, Some(&active), "archived"));
        assert!(run(FieldType::Text, Operator::Contains, Some(&active), "TIV"));
        assert!(run(FieldType::Text, Operator::NotContains, Some(&active), "xyz"));
        assert!(run(FieldType::Text, Operator::StartsWith, Some(&active), "AC"));
        assert!(run(FieldType::Text, Operator::EndsWith, Some(&active), "VE"));
        assert!(!run(FieldType::Text, Operator::StartsWith, Some(&active), "ive"));
    }

    #[test]
    fn test_text_reads_numbers_as_text() {
        assert!(run(FieldType::Text, Operator::Equals, Some(&json!(30)), "30"));
    }

    #[test]
    fn test_text_emptiness() {
        for empty in [json!(""), json!("N/A"), Value::Null] {
            assert!(run(FieldType::Text, Operator::IsEmpty, Some(&empty), ""));
        }
        assert!(run(FieldType::Text, Operator::IsEmpty, None, ""));
        assert!(run(FieldType::Text, Operator::IsNotEmpty, Some(&json!("n/a")), ""));
        assert!(run(FieldType::Text, Operator::IsNotEmpty, Some(&json!(" ")), ""));
    }

    #[test]
    fn test_number_comparisons() {
        let grade = json!("75");
        assert!(run(FieldType::Number, Operator::Equals, Some(&grade), "75.0"));
        assert!(run(FieldType::Number, Operator::GreaterThan, Some(&grade), "50"));
        assert!(run(FieldType::Number, Operator::LessThan, Some(&grade), "80"));
        assert!(run(FieldType::Number, Operator::GreaterThanEqual, Some(&grade), "75"));
        assert!(run(FieldType::Number, Operator::LessThanEqual, Some(&json!(75)), "75"));
        assert!(!run(FieldType::Number, Operator::GreaterThan, Some(&grade), "75"));
    }

    #[test]
    fn test_number_nan_only_satisfies_not_equals() {
        let junk = json!("pending");
        assert!(!run(FieldType::Number, Operator::Equals, Some(&junk), "0"));
        assert!(!run(FieldType::Number, Operator::GreaterThan, Some(&junk), "0"));
        assert!(!run(FieldType::Number, Operator::LessThanEqual, Some(&junk), "0"));
        assert!(run(FieldType::Number, Operator::NotEquals, Some(&junk), "0"));
        assert!(!run(FieldType::Number, Operator::LessThan, None, "10"));
    }

    #[test]
    fn test_date_comparisons() {
        let start = json!("2024-09-01");
        assert!(run(FieldType::Date, Operator::Equals, Some(&start), "2024-09-01"));
        assert!(run(FieldType::Date, Operator::Before, Some(&start), "2024-12-31"));
        assert!(run(FieldType::Date, Operator::After, Some(&start), "2024-01-01"));
        assert!(run(FieldType::Date, Operator::NotEquals, Some(&start), "2024-09-02"));
    }

    // Invalid dates compare false in every direction; this is kept as observed.
    #[test]
    fn test_invalid_dates_are_never_ordered() {
        let start = json!("2024-09-01");
        assert!(!run(FieldType::Date, Operator::Before, Some(&start), "someday"));
        assert!(!run(FieldType::Date, Operator::After, Some(&start), "someday"));
        assert!(!run(FieldType::Date, Operator::Equals, Some(&json!("TBD")), "TBD"));
        assert!(!run(FieldType::Date, Operator::Before, None, "2024-12-31"));
        assert!(run(FieldType::Date, Operator::NotEquals, Some(&json!("TBD")), "TBD"));
    }

    #[test]
    fn test_null_date_reads_as_epoch() {
        let null = Value::Null;
        assert!(run(FieldType::Date, Operator::Before, Some(&null), "2024-01-01"));
        assert!(!run(FieldType::Date, Operator::After, Some(&null), "2024-01-01"));
        assert!(run(FieldType::Date, Operator::Equals, Some(&null), "1970-01-01"));
        assert!(!run(FieldType::Date, Operator::NotEquals, Some(&null), "1970-01-01"));
        assert!(run(FieldType::Date, Operator::After, Some(&json!(true)), "1970-01-01"));
    }

    #[test]
    fn test_boolean_readings() {
        for truthy in [json!(true), json!("true"), json!("Yes")] {
            assert!(run(FieldType::Boolean, Operator::IsTrue, Some(&truthy), ""));
        }
        for falsy in [json!(false), json!("false"), json!("No")] {
            assert!(run(FieldType::Boolean, Operator::IsFalse, Some(&falsy), ""));
        }
        assert!(!run(FieldType::Boolean, Operator::IsTrue, Some(&json!("yes")), ""));
        assert!(!run(FieldType::Boolean, Operator::IsFalse, None, ""));
    }

    #[test]
    fn test_exists_ignores_empty_string() {
        assert!(run(FieldType::Boolean, Operator::Exists, Some(&json!("")), ""));
        assert!(run(FieldType::Boolean, Operator::NotExists, Some(&Value::Null), ""));
        assert!(run(FieldType::Boolean, Operator::NotExists, None, ""));
    }

    #[test]
    fn test_category_reference_paths_are_distinct() {
        let nested = json!({"teacherA": {"cat1": true}});
        assert!(run(FieldType::Categories, Operator::HasCategory, Some(&nested), "teacherA.cat1"));
        assert!(!run(FieldType::Categories, Operator::HasCategory, Some(&nested), "cat1"));

        let legacy = json!({"cat1": true});
        assert!(run(FieldType::Categories, Operator::HasCategory, Some(&legacy), "cat1"));
        assert!(!run(FieldType::Categories, Operator::HasCategory, Some(&legacy), "teacherA.cat1"));
    }

    #[test]
    fn test_category_owner_keys_with_commas() {
        let categories = json!({"jane,doe@school,ca": {"42": true, "43": false}});
        let field = Some(&categories);
        assert!(run(FieldType::Categories, Operator::HasCategory, field, "jane,doe@school,ca.42"));
        assert!(!run(FieldType::Categories, Operator::HasCategory, field, "jane,doe@school,ca.43"));
        assert!(run(
            FieldType::Categories,
            Operator::DoesNotHaveCategory,
            field,
            "jane,doe@school,ca.43"
        ));
    }

    #[test]
    fn test_category_lists() {
        let categories = json!({"t1": {"a": true, "b": true}, "legacy": true});
        let field = Some(&categories);
        assert!(run(FieldType::Categories, Operator::HasAnyOfCategories, field, "t1.z, t1.a"));
        assert!(run(FieldType::Categories, Operator::HasAllCategories, field, "t1.a, t1.b,legacy"));
        assert!(!run(FieldType::Categories, Operator::HasAllCategories, field, "t1.a,t1.z"));
        assert!(run(FieldType::Categories, Operator::HasNoneOfCategories, field, "t1.x,t2.a"));
        assert!(!run(FieldType::Categories, Operator::HasNoneOfCategories, field, "t1.x,t1.b"));
    }

    #[test]
    fn test_category_emptiness() {
        assert!(run(FieldType::Categories, Operator::IsEmpty, Some(&json!({})), ""));
        assert!(run(FieldType::Categories, Operator::IsEmpty, None, ""));
        assert!(run(FieldType::Categories, Operator::IsNotEmpty, Some(&json!({"t": {}})), ""));
    }

    #[test]
    fn test_current_date_months() {
        assert!(run(FieldType::CurrentDate, Operator::MonthEquals, None, "July"));
        assert!(run(FieldType::CurrentDate, Operator::MonthEquals, None, "7"));
        assert!(run(FieldType::CurrentDate, Operator::MonthNotEquals, None, "June"));
        assert!(run(FieldType::CurrentDate, Operator::MonthIsOneOf, None, "June, July"));
        assert!(run(FieldType::CurrentDate, Operator::MonthIsNotOneOf, None, "January,2"));
        assert!(!run(FieldType::CurrentDate, Operator::MonthIsOneOf, None, "Juli"));
        assert!(run(FieldType::CurrentDate, Operator::MonthEquals, None, "7th"));
        assert!(run(FieldType::CurrentDate, Operator::MonthIsOneOf, None, "6th, 07"));
    }

    #[test]
    fn test_current_date_weekday_and_day() {
        assert!(run(FieldType::CurrentDate, Operator::WeekdayIsOneOf, None, "Monday,Tuesday"));
        assert!(run(FieldType::CurrentDate, Operator::WeekdayIsOneOf, None, "1"));
        assert!(run(FieldType::CurrentDate, Operator::WeekdayIsOneOf, None, "1st"));
        assert!(!run(FieldType::CurrentDate, Operator::WeekdayIsOneOf, None, "Sunday"));
        assert!(run(FieldType::CurrentDate, Operator::DayOfMonthEquals, None, "15"));
        assert!(run(FieldType::CurrentDate, Operator::DayOfMonthGreaterThan, None, "14"));
        assert!(run(FieldType::CurrentDate, Operator::DayOfMonthLessThan, None, "16th"));
        assert!(!run(FieldType::CurrentDate, Operator::DayOfMonthLessThan, None, "soon"));
        assert!(run(FieldType::CurrentDate, Operator::YearEquals, None, "2024"));
    }

    #[test]
    fn test_calendar_normalization() {
        assert_eq!(calendar::month_number("December"), Some(12));
        assert_eq!(calendar::month_number(" march "), Some(3));
        assert_eq!(calendar::weekday_number("Saturday"), Some(6));
        assert_eq!(calendar::weekday_number("Funday"), None);
        assert_eq!(calendar::month_number("12th"), Some(12));
        assert_eq!(calendar::month_number("-1"), None);
        assert_eq!(calendar::leading_int("-3x"), Some(-3));
        assert_eq!(calendar::leading_int("x3"), None);
    }

    #[test]
    fn test_course_set_operators() {
        let set: BTreeSet<String> = ["MAT10", "ENG10"].iter().map(|s| s.to_string()).collect();
        let student = CourseScope::Student(&set);
        assert!(run_courses(Operator::StudentHasCourse, student, "MAT10"));
        assert!(run_courses(Operator::StudentDoesNotHaveCourse, student, "SCI10"));
        assert!(run_courses(Operator::StudentHasAnyOfCourses, student, "SCI10, ENG10"));
        assert!(run_courses(Operator::StudentHasAllCourses, student, "ENG10,MAT10"));
        assert!(!run_courses(Operator::StudentHasAllCourses, student, "ENG10,SCI10"));
        assert!(run_courses(Operator::StudentHasNoneOfCourses, student, "SCI10,PHY20"));
    }

    #[test]
    fn test_course_operators_against_one_record() {
        let own = CourseScope::Record("MAT10");
        assert!(run_courses(Operator::StudentHasCourse, own, "MAT10"));
        assert!(!run_courses(Operator::StudentHasCourse, own, "ENG10"));
        assert!(run_courses(Operator::StudentHasAllCourses, own, "ENG10,MAT10"));
        assert!(run_courses(Operator::StudentHasNoneOfCourses, own, "ENG10"));
    }

    #[test]
    fn test_course_operators_without_courses_fail_closed() {
        for op in crate::operator::COURSE_AGGREGATE_OPERATORS {
            assert!(!run_courses(*op, CourseScope::Unavailable, "MAT10"), "{op}");
        }
    }
}
