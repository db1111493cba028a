//! Context module: per-evaluation runtime state.
//!
//! This module provides the Clock capability read by `current_date` conditions and the
//! EvalContext threaded through condition and group evaluation.

use crate::config::EngineConfig;
use crate::dispatch::OperatorTable;
use crate::schema::FieldCatalog;
use chrono::{Local, NaiveDate, NaiveDateTime};
use std::fmt;

/// Source of the wall-clock instant used by `current_date` conditions.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Host local time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock pinned to one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDateTime);

impl FixedClock {
    /// Midnight on the given date, or `None` if the date does not exist.
    pub fn on(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(FixedClock)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

impl<F> Clock for F
where
    F: Fn() -> NaiveDateTime + Send + Sync,
{
    fn now(&self) -> NaiveDateTime {
        self()
    }
}

/// Everything a condition needs besides the record itself.
///
/// `now` is read once when the context is created so every condition in one call sees
/// the same instant.
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    pub catalog: &'a FieldCatalog,
    pub table: &'a OperatorTable,
    pub config: &'a EngineConfig,
    pub now: NaiveDateTime,
}

impl<'a> EvalContext<'a> {
    pub fn new(
        catalog: &'a FieldCatalog,
        table: &'a OperatorTable,
        config: &'a EngineConfig,
        clock: &dyn Clock,
    ) -> Self {
        Self {
            catalog,
            table,
            config,
            now: clock.now(),
        }
    }
}

impl fmt::Debug for EvalContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvalContext")
            .field("fields", &self.catalog.num_fields())
            .field("operators", &self.table.len())
            .field("now", &self.now)
            .finish()
    }
}
