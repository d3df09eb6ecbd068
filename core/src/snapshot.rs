//! Table versions: which run last committed each derived table.
//!
//! A version row is written in the same transaction as the table contents,
//! so a reader that sees the version also sees exactly those rows.

use serde::{Deserialize, Serialize};

use crate::types::RunId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableVersion {
    pub table_name:   String,
    pub run_id:       RunId,
    pub row_count:    i64,
    /// RFC 3339 commit time.
    pub committed_at: String,
}

/// Whether a table can answer queries.
#[derive(Debug, Clone, PartialEq)]
pub enum TableState {
    /// No such table in the schema.
    Absent,
    /// Table exists but nothing has ever been committed to it.
    Unpopulated,
    /// Committed at least once (possibly with zero rows).
    Populated { as_of: Option<String> },
}
