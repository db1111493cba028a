//! Operator module: the closed operator vocabulary and the per-type operator catalog.
//!
//! Each field type owns an ordered operator list; that list is what the authoring UI offers
//! and what decides whether a condition is legal for a field.

use crate::types::FieldType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! operators {
    ($( $variant:ident => $name:literal ),* $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[non_exhaustive]
        pub enum Operator {
            $($variant,)*
        }

        impl Operator {
            /// Every operator, in declaration order.
            pub const ALL: &'static [Operator] = &[$(Operator::$variant,)*];

            /// Persisted name of the operator.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Operator::$variant => $name,)*
                }
            }
        }

        impl FromStr for Operator {
            type Err = UnknownOperator;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(Operator::$variant),)*
                    other => Err(UnknownOperator(other.to_string())),
                }
            }
        }
    };
}

operators! {
    Equals => "equals",
    NotEquals => "not_equals",
    Contains => "contains",
    NotContains => "not_contains",
    StartsWith => "starts_with",
    EndsWith => "ends_with",
    IsEmpty => "is_empty",
    IsNotEmpty => "is_not_empty",
    GreaterThan => "greater_than",
    LessThan => "less_than",
    GreaterThanEqual => "greater_than_equal",
    LessThanEqual => "less_than_equal",
    Before => "before",
    After => "after",
    IsTrue => "is_true",
    IsFalse => "is_false",
    Exists => "exists",
    NotExists => "not_exists",
    HasCategory => "has_category",
    DoesNotHaveCategory => "does_not_have_category",
    HasAnyOfCategories => "has_any_of_categories",
    HasAllCategories => "has_all_categories",
    HasNoneOfCategories => "has_none_of_categories",
    MonthEquals => "month_equals",
    MonthNotEquals => "month_not_equals",
    MonthIsOneOf => "month_is_one_of",
    MonthIsNotOneOf => "month_is_not_one_of",
    WeekdayIsOneOf => "weekday_is_one_of",
    DayOfMonthEquals => "day_of_month_equals",
    DayOfMonthGreaterThan => "day_of_month_greater_than",
    DayOfMonthLessThan => "day_of_month_less_than",
    YearEquals => "year_equals",
    StudentHasCourse => "student_has_course",
    StudentDoesNotHaveCourse => "student_does_not_have_course",
    StudentHasAnyOfCourses => "student_has_any_of_courses",
    StudentHasAllCourses => "student_has_all_courses",
    StudentHasNoneOfCourses => "student_has_none_of_courses",
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownOperator(pub String);

impl fmt::Display for UnknownOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown operator '{}'", self.0)
    }
}

impl std::error::Error for UnknownOperator {}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Operator {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Operator {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

impl Operator {
    /// Whether a condition using this operator needs a non-empty value.
    pub fn requires_value(&self) -> bool {
        !matches!(
            self,
            Operator::IsEmpty
                | Operator::IsNotEmpty
                | Operator::Exists
                | Operator::NotExists
                | Operator::IsTrue
                | Operator::IsFalse
        )
    }

    /// The `student_*` operators that switch a grouped view into aggregate evaluation.
    pub fn is_course_aggregate(&self) -> bool {
        COURSE_AGGREGATE_OPERATORS.contains(self)
    }
}

pub const TEXT_OPERATORS: &[Operator] = &[
    Operator::Equals,
    Operator::NotEquals,
    Operator::Contains,
    Operator::NotContains,
    Operator::StartsWith,
    Operator::EndsWith,
    Operator::IsEmpty,
    Operator::IsNotEmpty,
];

pub const NUMBER_OPERATORS: &[Operator] = &[
    Operator::Equals,
    Operator::NotEquals,
    Operator::GreaterThan,
    Operator::LessThan,
    Operator::GreaterThanEqual,
    Operator::LessThanEqual,
];

pub const DATE_OPERATORS: &[Operator] = &[
    Operator::Equals,
    Operator::NotEquals,
    Operator::Before,
    Operator::After,
];

pub const BOOLEAN_OPERATORS: &[Operator] = &[
    Operator::IsTrue,
    Operator::IsFalse,
    Operator::Exists,
    Operator::NotExists,
];

pub const CATEGORY_OPERATORS: &[Operator] = &[
    Operator::HasCategory,
    Operator::DoesNotHaveCategory,
    Operator::HasAnyOfCategories,
    Operator::HasAllCategories,
    Operator::HasNoneOfCategories,
    Operator::IsEmpty,
    Operator::IsNotEmpty,
];

pub const CURRENT_DATE_OPERATORS: &[Operator] = &[
    Operator::MonthEquals,
    Operator::MonthNotEquals,
    Operator::MonthIsOneOf,
    Operator::MonthIsNotOneOf,
    Operator::WeekdayIsOneOf,
    Operator::DayOfMonthEquals,
    Operator::DayOfMonthGreaterThan,
    Operator::DayOfMonthLessThan,
    Operator::YearEquals,
];

pub const COURSE_AGGREGATE_OPERATORS: &[Operator] = &[
    Operator::StudentHasCourse,
    Operator::StudentDoesNotHaveCourse,
    Operator::StudentHasAnyOfCourses,
    Operator::StudentHasAllCourses,
    Operator::StudentHasNoneOfCourses,
];

/// Legal operators for a field type.
pub fn operators_for_type(ty: FieldType) -> &'static [Operator] {
    match ty {
        FieldType::Text => TEXT_OPERATORS,
        FieldType::Number => NUMBER_OPERATORS,
        FieldType::Date => DATE_OPERATORS,
        FieldType::Boolean => BOOLEAN_OPERATORS,
        FieldType::Categories => CATEGORY_OPERATORS,
        FieldType::CurrentDate => CURRENT_DATE_OPERATORS,
        FieldType::AggregateText => COURSE_AGGREGATE_OPERATORS,
    }
}
