//! Config module: record-layout settings the engine needs beyond the field catalog.

use crate::RosterviewError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Record key holding the student identifier used for grouping.
    pub student_key: String,
    /// Keys tried in order for a record's own reference id when matching identity.
    pub reference_keys: Vec<String>,
    /// Record key holding the nested `owner -> category -> flag` map.
    pub categories_key: String,
    /// Course codes that do not count as a real course for a student.
    pub placeholder_course_codes: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            student_key: "asn".to_string(),
            reference_keys: vec!["referenceNumber".to_string(), "id".to_string()],
            categories_key: "categories".to_string(),
            placeholder_course_codes: vec![String::new(), "N/A".to_string(), "-".to_string()],
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, RosterviewError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), RosterviewError> {
        if self.student_key.trim().is_empty() {
            return Err(RosterviewError::InvalidConfig(
                "studentKey must not be empty".to_string(),
            ));
        }
        if self.categories_key.trim().is_empty() {
            return Err(RosterviewError::InvalidConfig(
                "categoriesKey must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn is_placeholder_course(&self, code: &str) -> bool {
        let code = code.trim();
        self.placeholder_course_codes
            .iter()
            .any(|placeholder| placeholder.eq_ignore_ascii_case(code))
    }
}
