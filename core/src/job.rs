//! Recompute job trait.
//!
//! RULE: Every derived table is written by exactly one RecomputeJob.
//! The batch engine runs registered jobs in registration order against a
//! single snapshot. Execution order is fixed and documented in engine.rs.

use chrono::NaiveDate;

use crate::{
    error::AnalyticsResult,
    model::{ForecastSeries, Transaction},
    store::AnalyticsStore,
    types::RunId,
};

/// Everything a job may read. Taken once per batch inside one read
/// transaction; jobs never query the transaction table themselves.
#[derive(Debug, Clone)]
pub struct BatchInput {
    pub run_id:        RunId,
    pub analysis_date: NaiveDate,
    pub transactions:  Vec<Transaction>,
    pub forecast:      ForecastSeries,
}

/// Row count committed to one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableWrite {
    pub table: &'static str,
    pub rows:  usize,
}

/// The contract every recompute job must fulfil.
pub trait RecomputeJob: Send {
    /// Unique stable name for this job.
    fn name(&self) -> &'static str;

    /// Tables this job replaces. The engine holds a lock on each of them
    /// for the duration of `recompute`.
    fn tables(&self) -> &'static [&'static str];

    /// Compute from `input` and atomically replace the job's tables.
    /// On error nothing has been committed.
    fn recompute(&mut self, input: &BatchInput, store: &AnalyticsStore)
        -> AnalyticsResult<Vec<TableWrite>>;
}
