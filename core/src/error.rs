use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid {param}: {value} (expected {min}..={max})")]
    InvalidInput {
        param: &'static str,
        value: i64,
        min:   i64,
        max:   i64,
    },

    #[error("Invalid date '{value}'")]
    InvalidDate { value: String },

    #[error("Customer '{customer_id}' not found")]
    NotFound { customer_id: String },

    #[error("Recomputation of '{table}' already in flight")]
    RecomputeInFlight { table: String },

    #[error("Forecast series is empty")]
    EmptyForecast,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type AnalyticsResult<T> = Result<T, AnalyticsError>;
