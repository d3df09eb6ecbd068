//! Tagged read outcomes and the served payload envelope.
//!
//! RULE: The fallback decision is made from a `DataOutcome`, never from a
//! caught error of unknown origin. `Missing` and `Failed` degrade to sample
//! data; `Empty` is a legitimate answer.

use serde::{Deserialize, Serialize};

use crate::{error::AnalyticsError, types::SAMPLE_DATA_LABEL};

/// Result of reading one derived table.
#[derive(Debug)]
pub enum DataOutcome<T> {
    /// The table is populated and the query matched rows.
    Rows(T),
    /// The table is populated but the query matched nothing.
    Empty,
    /// The table does not exist or has never been populated.
    Missing { table: &'static str },
    /// The store could not answer.
    Failed(AnalyticsError),
}

impl<T> DataOutcome<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> DataOutcome<U> {
        match self {
            Self::Rows(rows) => DataOutcome::Rows(f(rows)),
            Self::Empty => DataOutcome::Empty,
            Self::Missing { table } => DataOutcome::Missing { table },
            Self::Failed(e) => DataOutcome::Failed(e),
        }
    }
}

/// Rows read from one committed table version.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveRows<T> {
    pub data:  T,
    /// `committed_at` of the table version, when one was recorded.
    pub as_of: Option<String>,
}

impl<T> LiveRows<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> LiveRows<U> {
        LiveRows {
            data:  f(self.data),
            as_of: self.as_of,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Live,
    Sample,
}

/// Envelope around every payload that leaves the core.
/// A payload is built from exactly one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Served<T> {
    pub source: DataSource,
    /// `"Sample Data"` for synthetic payloads.
    pub period: Option<String>,
    /// Commit time of the snapshot the live payload was read from.
    pub as_of:  Option<String>,
    pub data:   T,
}

impl<T> Served<T> {
    pub fn live(data: T, as_of: Option<String>) -> Self {
        Self {
            source: DataSource::Live,
            period: None,
            as_of,
            data,
        }
    }

    pub fn sample(data: T) -> Self {
        Self {
            source: DataSource::Sample,
            period: Some(SAMPLE_DATA_LABEL.to_string()),
            as_of:  None,
            data,
        }
    }

    pub fn is_sample(&self) -> bool {
        self.source == DataSource::Sample
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Served<U> {
        Served {
            source: self.source,
            period: self.period,
            as_of:  self.as_of,
            data:   f(self.data),
        }
    }
}

/// Boundary rounding: money to 2 dp, percentages to 1 dp.
pub trait RoundForDisplay {
    fn rounded(self) -> Self;
}

impl<T: RoundForDisplay> RoundForDisplay for Vec<T> {
    fn rounded(self) -> Self {
        self.into_iter().map(RoundForDisplay::rounded).collect()
    }
}

impl<T: RoundForDisplay> RoundForDisplay for Option<T> {
    fn rounded(self) -> Self {
        self.map(RoundForDisplay::rounded)
    }
}
