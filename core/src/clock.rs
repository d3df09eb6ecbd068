//! Analysis date resolution.
//!
//! RULE: A batch resolves its analysis date exactly once, before any job
//! runs. Every job in the batch sees the same date, so recency and the
//! historical comparison window stay consistent within one run.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::Transaction;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisDatePolicy {
    /// Latest invoice date in the snapshot. Reproducible for a fixed export.
    #[default]
    LatestInvoice,
    /// The caller-supplied "today".
    Today,
    /// A pinned date.
    Fixed(NaiveDate),
}

impl AnalysisDatePolicy {
    /// Resolve to a concrete date. An empty snapshot under `LatestInvoice`
    /// falls back to `today`.
    pub fn resolve(&self, transactions: &[Transaction], today: NaiveDate) -> NaiveDate {
        match self {
            Self::Fixed(date) => *date,
            Self::Today => today,
            Self::LatestInvoice => transactions
                .iter()
                .map(|t| t.invoice_date)
                .max()
                .unwrap_or(today),
        }
    }
}

/// Today's date in local time. Binaries call this, and so does the query
/// service when no date is pinned; the engines take the date as an argument.
pub fn local_today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
