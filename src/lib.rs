//! Rosterview: a rule engine for custom views over student course records.
//!
//! A custom view is a user-authored filter: ordered groups of `(field, operator, value)`
//! conditions, AND/OR within each group and AND/OR across groups. The engine evaluates a
//! view against a collection of flat records, either record by record or per student.
//!
//! # Architecture
//! - Field catalog (field names and types) and per-type operator catalog
//! - Operator dispatch table keyed by `(FieldType, Operator)`
//! - Condition, group and view folds over a record or a student
//! - Student-aggregate resolution with direct-match annotation
//! - View normalization for the legacy flat-list and grouped persisted shapes
//!
//! Evaluation is pure: no I/O, no mutation of input records, and the only ambient input
//! is the clock handed to the engine.

mod aggregate;
mod config;
mod context;
mod dispatch;
mod evaluator;
mod filter;
mod operator;
mod schema;
mod types;
mod view;

pub use aggregate::*;
pub use config::*;
pub use context::*;
pub use dispatch::*;
pub use evaluator::*;
pub use filter::*;
pub use operator::*;
pub use schema::*;
pub use types::*;
pub use view::*;

use serde_json::Value;

/// Unified error type for Rosterview operations.
///
/// Only the JSON edge produces errors; evaluation itself always yields a boolean.
#[derive(Debug, thiserror::Error)]
pub enum RosterviewError {
    #[error("Invalid view: {0}")]
    InvalidView(String),
    #[error("Invalid records: {0}")]
    InvalidRecords(String),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parses a record collection. The top level must be an array of objects.
pub fn records_from_json(json: &str) -> Result<Vec<Record>, RosterviewError> {
    let value: Value = serde_json::from_str(json)?;
    let Value::Array(items) = value else {
        return Err(RosterviewError::InvalidRecords(format!(
            "expected an array of records, got {}",
            types::json_kind(&value)
        )));
    };
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            Record::try_from(item).map_err(|e| match e {
                RosterviewError::InvalidRecords(msg) => {
                    RosterviewError::InvalidRecords(format!("record {i}: {msg}"))
                }
                other => other,
            })
        })
        .collect()
}
