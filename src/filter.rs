//! Filter module: the engine and its record-level evaluation path.
//!
//! This module provides the FilterEngine type, the main entry point for running a view
//! over a record collection.

use crate::config::EngineConfig;
use crate::context::{Clock, EvalContext, SystemClock};
use crate::dispatch::OperatorTable;
use crate::evaluator::{evaluate_view, Target};
use crate::schema::FieldCatalog;
use crate::types::Record;
use crate::view::ViewDefinition;
use crate::{records_from_json, RosterviewError};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Evaluates views over record collections. Holds no per-call state, so one engine can
/// serve any number of callers.
#[derive(Clone)]
pub struct FilterEngine {
    catalog: Arc<FieldCatalog>,
    table: Arc<OperatorTable>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl FilterEngine {
    /// Engine over the student record catalog with the built-in operators and system clock.
    pub fn new() -> Self {
        FilterEngineBuilder::new().build()
    }

    pub fn builder() -> FilterEngineBuilder {
        FilterEngineBuilder::new()
    }

    pub fn catalog(&self) -> &FieldCatalog {
        &self.catalog
    }

    pub fn table(&self) -> &OperatorTable {
        &self.table
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Context for one evaluation call; reads the clock.
    pub(crate) fn context(&self) -> EvalContext<'_> {
        EvalContext::new(&self.catalog, &self.table, &self.config, self.clock.as_ref())
    }

    /// Whether a single record satisfies the view at record level.
    pub fn matches(&self, record: &Record, view: &ViewDefinition) -> bool {
        evaluate_view(&Target::record(record), view, &self.context())
    }

    /// Runs the view in the mode it asks for.
    pub fn filter(&self, records: &[Record], view: &ViewDefinition) -> Vec<Record> {
        if view.group_by_student {
            self.filter_grouped(records, view)
        } else {
            self.filter_records(records, view)
        }
    }

    /// Record-level filtering: keeps each record the view holds for, in input order.
    /// A view without groups keeps everything.
    pub fn filter_records(&self, records: &[Record], view: &ViewDefinition) -> Vec<Record> {
        if view.groups.is_empty() {
            return records.to_vec();
        }
        let ctx = self.context();
        let kept: Vec<Record> = records
            .iter()
            .filter(|record| evaluate_view(&Target::record(record), view, &ctx))
            .cloned()
            .collect();
        log::debug!("record-level view kept {} of {} records", kept.len(), records.len());
        kept
    }

    /// Badge count for a view: matching records, or distinct matching students when the
    /// view groups by student.
    pub fn count(&self, records: &[Record], view: &ViewDefinition) -> usize {
        let matches = self.filter(records, view);
        if !view.group_by_student {
            return matches.len();
        }
        matches
            .iter()
            .filter_map(|record| record.key_text(&self.config.student_key))
            .collect::<HashSet<_>>()
            .len()
    }

    /// Parses both blobs at the edge, then filters.
    pub fn filter_json(&self, records: &str, view: &str) -> Result<Vec<Record>, RosterviewError> {
        let records = records_from_json(records)?;
        let view = ViewDefinition::from_json(view)?;
        Ok(self.filter(&records, &view))
    }
}

impl Default for FilterEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FilterEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterEngine")
            .field("catalog", &self.catalog)
            .field("operators", &self.table.len())
            .field("config", &self.config)
            .finish()
    }
}

#[derive(Default)]
pub struct FilterEngineBuilder {
    catalog: Option<FieldCatalog>,
    table: Option<OperatorTable>,
    clock: Option<Arc<dyn Clock>>,
    config: Option<EngineConfig>,
}

impl FilterEngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn catalog(mut self, catalog: FieldCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Replaces the built-in operator table.
    pub fn operators(mut self, table: OperatorTable) -> Self {
        self.table = Some(table);
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(self) -> FilterEngine {
        FilterEngine {
            catalog: Arc::new(self.catalog.unwrap_or_default()),
            table: Arc::new(self.table.unwrap_or_else(OperatorTable::with_builtins)),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            config: self.config.unwrap_or_default(),
        }
    }
}
