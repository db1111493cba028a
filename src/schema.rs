//! Schema module: the field catalog that views are authored against.
//!
//! This module provides the FieldCatalog type and builder for declaring known fields and
//! their types, and answers which operators a field offers in a given evaluation mode.

use crate::operator::{operators_for_type, Operator};
use crate::types::FieldType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Virtual field addressing a record's nested category map.
pub const CATEGORIES_FIELD: &str = "student.categories";
/// Virtual field evaluated against the clock rather than the record.
pub const CURRENT_DATE_FIELD: &str = "current_date";
/// Default course-code field.
pub const COURSE_CODE_FIELD: &str = "courseCode";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct FieldCatalog {
    fields: HashMap<String, FieldType>,
    field_names: Vec<String>,
    course_field: String,
}

impl FieldCatalog {
    pub fn builder() -> FieldCatalogBuilder {
        FieldCatalogBuilder::new()
    }

    /// Catalog of the fields found on student course records.
    pub fn student_records() -> Self {
        FieldCatalogBuilder::new()
            .field("asn", FieldType::Text)
            .field("firstName", FieldType::Text)
            .field("lastName", FieldType::Text)
            .field("preferredFirstName", FieldType::Text)
            .field("StudentEmail", FieldType::Text)
            .field("ParentEmail", FieldType::Text)
            .field(COURSE_CODE_FIELD, FieldType::Text)
            .field("courseDescription", FieldType::Text)
            .field("Course_Value", FieldType::Text)
            .field("Status_Value", FieldType::Text)
            .field("ActiveFutureArchived_Value", FieldType::Text)
            .field("StudentType_Value", FieldType::Text)
            .field("School_x0020_Year_Value", FieldType::Text)
            .field("DiplomaMonthChoices_Value", FieldType::Text)
            .field("PASI_Status", FieldType::Text)
            .field("referenceNumber", FieldType::Text)
            .field("term", FieldType::Text)
            .field("primarySchoolName", FieldType::Text)
            .field("grade", FieldType::Number)
            .field("value", FieldType::Number)
            .field("creditsAttempted", FieldType::Number)
            .field("age", FieldType::Number)
            .field("Created", FieldType::Date)
            .field("ScheduleStartDate", FieldType::Date)
            .field("ScheduleEndDate", FieldType::Date)
            .field("exitDate", FieldType::Date)
            .field("birthday", FieldType::Date)
            .field("hasSchedule", FieldType::Boolean)
            .field("inPASI", FieldType::Boolean)
            .field("needsPASIUpdate", FieldType::Boolean)
            .field(CATEGORIES_FIELD, FieldType::Categories)
            .field(CURRENT_DATE_FIELD, FieldType::CurrentDate)
            .build()
    }

    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.fields.get(name).copied()
    }

    /// The type a field presents in the given mode. The course-code field becomes
    /// aggregate text while a view groups by student.
    pub fn effective_type(&self, name: &str, aggregate_mode: bool) -> Option<FieldType> {
        if aggregate_mode && name == self.course_field {
            return Some(FieldType::AggregateText);
        }
        self.field_type(name)
    }

    /// Operators offered for `name`; empty for unknown fields.
    pub fn operators_for(&self, name: &str, aggregate_mode: bool) -> &'static [Operator] {
        self.effective_type(name, aggregate_mode)
            .map(operators_for_type)
            .unwrap_or(&[])
    }

    pub fn course_field(&self) -> &str {
        &self.course_field
    }

    pub fn fields(&self) -> &HashMap<String, FieldType> {
        &self.fields
    }

    /// Field names in sorted order.
    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    pub fn num_fields(&self) -> usize {
        self.field_names.len()
    }
}

impl Default for FieldCatalog {
    fn default() -> Self {
        FieldCatalog::student_records()
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct FieldCatalogBuilder {
    fields: HashMap<String, FieldType>,
    course_field: Option<String>,
}

impl FieldCatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.fields.insert(name.into(), ty);
        self
    }

    /// Overrides the field that switches to course operators in aggregate mode.
    pub fn course_field(mut self, name: impl Into<String>) -> Self {
        self.course_field = Some(name.into());
        self
    }

    pub fn build(self) -> FieldCatalog {
        let mut field_names: Vec<_> = self.fields.keys().cloned().collect();
        field_names.sort();
        FieldCatalog {
            fields: self.fields,
            field_names,
            course_field: self
                .course_field
                .unwrap_or_else(|| COURSE_CODE_FIELD.to_string()),
        }
    }
}
