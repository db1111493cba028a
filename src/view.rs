//! View module: the persisted shape of custom views and its canonical form.
//!
//! Views reach the engine as JSON blobs in one of two shapes. Older views store a flat
//! condition list where every condition carries its own `logicOperator`; newer views
//! store `{groups, groupLogic}`. Both are normalized here into a [`ViewDefinition`]
//! before evaluation ever sees them.

use crate::operator::Operator;
use crate::schema::FieldCatalog;
use crate::types::{json_kind, text_of, LogicOp};
use crate::RosterviewError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Group id given to the implicit group of a legacy condition list.
pub const LEGACY_GROUP_ID: &str = "legacy";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(default, deserialize_with = "lenient_text")]
    pub field: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub operator: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub value: String,
    /// Combinator joining this condition to the ones before it; legacy lists only.
    #[serde(
        default,
        deserialize_with = "lenient_logic",
        skip_serializing_if = "Option::is_none"
    )]
    pub logic_operator: Option<LogicOp>,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator: operator.as_str().to_string(),
            value: value.into(),
            logic_operator: None,
        }
    }

    /// Sets the legacy per-condition combinator.
    pub fn joined_by(mut self, logic: LogicOp) -> Self {
        self.logic_operator = Some(logic);
        self
    }

    /// The parsed operator, or `None` when the stored name is unknown.
    pub fn operator(&self) -> Option<Operator> {
        self.operator.parse().ok()
    }

    /// Field and operator are both filled in. Only complete conditions take part in a group.
    pub fn is_complete(&self) -> bool {
        !self.field.is_empty() && !self.operator.is_empty()
    }

    pub fn is_valid(&self, catalog: &FieldCatalog, aggregate_mode: bool) -> bool {
        self.issue(catalog, aggregate_mode).is_none()
    }

    fn issue(&self, catalog: &FieldCatalog, aggregate_mode: bool) -> Option<IssueKind> {
        if self.field.is_empty() {
            return Some(IssueKind::MissingField);
        }
        if self.operator.is_empty() {
            return Some(IssueKind::MissingOperator);
        }
        let Some(operator) = self.operator() else {
            return Some(IssueKind::UnknownOperator(self.operator.clone()));
        };
        if catalog.field_type(&self.field).is_none() {
            return Some(IssueKind::UnknownField(self.field.clone()));
        }
        if !catalog.operators_for(&self.field, aggregate_mode).contains(&operator) {
            return Some(IssueKind::OperatorNotAllowed {
                field: self.field.clone(),
                operator,
            });
        }
        if operator.requires_value() && self.value.trim().is_empty() {
            return Some(IssueKind::MissingValue(operator));
        }
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionGroup {
    #[serde(default, deserialize_with = "lenient_text")]
    pub id: String,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default, deserialize_with = "lenient_logic_or_default")]
    pub internal_logic: LogicOp,
    /// Fold with each condition's own `logicOperator` instead of `internal_logic`.
    /// Only produced when normalizing a legacy list with mixed combinators.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub sequential: bool,
}

impl ConditionGroup {
    pub fn new(id: impl Into<String>, internal_logic: LogicOp) -> Self {
        Self {
            id: id.into(),
            conditions: Vec::new(),
            internal_logic,
            sequential: false,
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Conditions that take part in evaluation, in authored order.
    pub fn complete_conditions(&self) -> impl Iterator<Item = &Condition> {
        self.conditions.iter().filter(|c| c.is_complete())
    }

    /// Combinator joining `condition` to the running result.
    pub fn logic_for(&self, condition: &Condition) -> LogicOp {
        if self.sequential {
            condition.logic_operator.unwrap_or_default()
        } else {
            self.internal_logic
        }
    }
}

/// Which external record collection a view filters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BaseDataSource {
    #[default]
    PasiRecords,
    StudentSummaries,
    Custom(String),
}

impl From<String> for BaseDataSource {
    fn from(name: String) -> Self {
        match name.as_str() {
            "" | "pasiRecords" => BaseDataSource::PasiRecords,
            "studentSummaries" => BaseDataSource::StudentSummaries,
            _ => BaseDataSource::Custom(name),
        }
    }
}

impl From<BaseDataSource> for String {
    fn from(source: BaseDataSource) -> Self {
        match source {
            BaseDataSource::PasiRecords => "pasiRecords".to_string(),
            BaseDataSource::StudentSummaries => "studentSummaries".to_string(),
            BaseDataSource::Custom(name) => name,
        }
    }
}

/// Canonical view: ordered groups joined by one cross-group combinator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewDefinition {
    #[serde(default)]
    pub groups: Vec<ConditionGroup>,
    #[serde(default, deserialize_with = "lenient_logic_or_default")]
    pub group_logic: LogicOp,
    #[serde(default)]
    pub group_by_student: bool,
    #[serde(default)]
    pub base_data_source: BaseDataSource,
}

impl ViewDefinition {
    pub fn new(group_logic: LogicOp) -> Self {
        Self {
            group_logic,
            ..Self::default()
        }
    }

    pub fn with_group(mut self, group: ConditionGroup) -> Self {
        self.groups.push(group);
        self
    }

    pub fn grouped_by_student(mut self, group_by_student: bool) -> Self {
        self.group_by_student = group_by_student;
        self
    }

    /// A view with one group holding one condition.
    pub fn single(condition: Condition) -> Self {
        Self::new(LogicOp::And)
            .with_group(ConditionGroup::new("group-1", LogicOp::And).with_condition(condition))
    }

    /// Parses a view blob in either the canonical or the persisted shape.
    pub fn from_json(json: &str) -> Result<Self, RosterviewError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, RosterviewError> {
        let Value::Object(map) = &value else {
            return Err(RosterviewError::InvalidView(format!(
                "expected a view object, got {}",
                json_kind(&value)
            )));
        };
        if map.contains_key("conditions") {
            let persisted: PersistedView = serde_json::from_value(value)
                .map_err(|e| RosterviewError::InvalidView(e.to_string()))?;
            Ok(persisted.normalize())
        } else {
            serde_json::from_value(value).map_err(|e| RosterviewError::InvalidView(e.to_string()))
        }
    }

    pub fn conditions(&self) -> impl Iterator<Item = &Condition> {
        self.groups.iter().flat_map(|g| g.conditions.iter())
    }

    /// Whether any complete condition uses a `student_*` course operator.
    pub fn uses_course_aggregates(&self) -> bool {
        self.conditions()
            .filter(|c| c.is_complete())
            .filter_map(Condition::operator)
            .any(|op| op.is_course_aggregate())
    }

    /// Authoring problems, for display next to the view editor. Evaluation never rejects
    /// a view for these; incomplete conditions are skipped and unknown ones fail closed.
    pub fn validate(&self, catalog: &FieldCatalog) -> Vec<ConditionIssue> {
        let mut issues = Vec::new();
        for group in &self.groups {
            for (index, condition) in group.conditions.iter().enumerate() {
                if let Some(kind) = condition.issue(catalog, self.group_by_student) {
                    issues.push(ConditionIssue {
                        group_id: group.id.clone(),
                        index,
                        kind,
                    });
                }
            }
        }
        issues
    }
}

/// Conditions as stored: a legacy flat list or the grouped form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ViewConditions {
    Legacy(Vec<Condition>),
    Grouped(GroupedConditions),
}

impl Default for ViewConditions {
    fn default() -> Self {
        ViewConditions::Grouped(GroupedConditions::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedConditions {
    #[serde(default)]
    pub groups: Vec<ConditionGroup>,
    #[serde(default, deserialize_with = "lenient_logic_or_default")]
    pub group_logic: LogicOp,
}

/// A view blob as read from the preference store.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedView {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub conditions: ViewConditions,
    #[serde(default)]
    pub group_by_student: bool,
    #[serde(default)]
    pub base_data_source: BaseDataSource,
}

impl PersistedView {
    pub fn from_json(json: &str) -> Result<Self, RosterviewError> {
        serde_json::from_str(json).map_err(|e| RosterviewError::InvalidView(e.to_string()))
    }

    pub fn normalize(self) -> ViewDefinition {
        let (groups, group_logic) = match self.conditions {
            ViewConditions::Grouped(grouped) => (grouped.groups, grouped.group_logic),
            ViewConditions::Legacy(conditions) => (legacy_groups(conditions), LogicOp::And),
        };
        ViewDefinition {
            groups,
            group_logic,
            group_by_student: self.group_by_student,
            base_data_source: self.base_data_source,
        }
    }
}

impl From<PersistedView> for ViewDefinition {
    fn from(view: PersistedView) -> Self {
        view.normalize()
    }
}

/// One implicit group. A list whose combinators agree becomes an ordinary group with that
/// combinator; a mixed list keeps its per-condition combinators and folds sequentially.
fn legacy_groups(conditions: Vec<Condition>) -> Vec<ConditionGroup> {
    if conditions.is_empty() {
        return Vec::new();
    }
    let mut joins = conditions
        .iter()
        .filter(|c| c.is_complete())
        .skip(1)
        .map(|c| c.logic_operator.unwrap_or_default());
    let first = joins.next();
    let uniform = joins.all(|op| Some(op) == first);
    let group = ConditionGroup {
        id: LEGACY_GROUP_ID.to_string(),
        conditions,
        internal_logic: first.unwrap_or_default(),
        sequential: !uniform,
    };
    log::debug!(
        "normalized legacy condition list into one {} group",
        if group.sequential { "sequential" } else { "uniform" }
    );
    vec![group]
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IssueKind {
    #[error("field is not set")]
    MissingField,
    #[error("operator is not set")]
    MissingOperator,
    #[error("unknown operator '{0}'")]
    UnknownOperator(String),
    #[error("unknown field '{0}'")]
    UnknownField(String),
    #[error("operator '{operator}' is not available for field '{field}'")]
    OperatorNotAllowed { field: String, operator: Operator },
    #[error("operator '{0}' needs a value")]
    MissingValue(Operator),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionIssue {
    pub group_id: String,
    pub index: usize,
    pub kind: IssueKind,
}

impl fmt::Display for ConditionIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group '{}' condition {}: {}", self.group_id, self.index + 1, self.kind)
    }
}

// Persisted blobs were written by a loosely typed editor: values may be numbers or null.
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(text_of(Some(&value)))
}

fn lenient_logic<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<LogicOp>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) if s.eq_ignore_ascii_case("and") => Some(LogicOp::And),
        Value::String(s) if s.eq_ignore_ascii_case("or") => Some(LogicOp::Or),
        _ => None,
    })
}

fn lenient_logic_or_default<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<LogicOp, D::Error> {
    Ok(lenient_logic(deserializer)?.unwrap_or_default())
}
