//! Batch events: the audit trail of every recomputation run.
//!
//! RULE: Every state change a run makes is recorded as a BatchEvent in
//! recompute_log, in emission order.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::RunId;

/// Variants are only ever appended; stored payloads must keep parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BatchEvent {
    RunStarted {
        run_id:        RunId,
        analysis_date: NaiveDate,
        transactions:  usize,
        forecast_days: usize,
    },
    JobStarted {
        job: String,
    },
    TableReplaced {
        job:   String,
        table: String,
        rows:  usize,
    },
    /// Another run holds the lock on `table`.
    JobRejected {
        job:   String,
        table: String,
    },
    /// The job's transaction rolled back; the previous table is intact.
    JobFailed {
        job:   String,
        error: String,
    },
    JobCompleted {
        job:    String,
        tables: usize,
    },
    RunCompleted {
        run_id:    RunId,
        succeeded: usize,
        failed:    usize,
        rejected:  usize,
    },
}

impl BatchEvent {
    /// Stable name for the event_type column.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::RunStarted { .. }    => "run_started",
            Self::JobStarted { .. }    => "job_started",
            Self::TableReplaced { .. } => "table_replaced",
            Self::JobRejected { .. }   => "job_rejected",
            Self::JobFailed { .. }     => "job_failed",
            Self::JobCompleted { .. }  => "job_completed",
            Self::RunCompleted { .. }  => "run_completed",
        }
    }
}

/// One persisted row of recompute_log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchLogEntry {
    pub id:         Option<i64>,
    pub run_id:     RunId,
    pub seq:        i64,
    pub job:        String,
    pub event_type: String,
    pub payload:    String, // JSON-serialized BatchEvent
    pub created_at: String,
}

impl BatchLogEntry {
    pub fn event(&self) -> serde_json::Result<BatchEvent> {
        serde_json::from_str(&self.payload)
    }
}
