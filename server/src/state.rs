use std::sync::Arc;
use std::time::Duration;

use analytics_core::{
    config::AnalyticsConfig,
    outcome::Served,
    service::{AnalyticsService, Query, QueryResponse},
};

use crate::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    service:       Arc<AnalyticsService>,
    query_timeout: Duration,
}

impl AppState {
    pub fn new(config: &AnalyticsConfig) -> Self {
        Self::with_service(AnalyticsService::new(config), config.server.query_timeout())
    }

    pub fn with_service(service: AnalyticsService, query_timeout: Duration) -> Self {
        Self {
            service: Arc::new(service),
            query_timeout,
        }
    }

    /// Answer `query` on the blocking pool. A query that panics or does not
    /// finish within the timeout is answered with sample data instead.
    pub async fn run(&self, query: Query) -> Result<Served<QueryResponse>, ApiError> {
        query.validate()?;

        let service = Arc::clone(&self.service);
        let task_query = query.clone();
        let task = tokio::task::spawn_blocking(move || service.execute(&task_query));

        match tokio::time::timeout(self.query_timeout, task).await {
            Ok(Ok(result)) => Ok(result?),
            Ok(Err(e)) => {
                log::warn!("{}: query task failed ({e}), serving sample data", query.name());
                Ok(self.service.sample(&query)?)
            }
            Err(_) => {
                log::warn!(
                    "{}: no answer within {:?}, serving sample data",
                    query.name(),
                    self.query_timeout
                );
                Ok(self.service.sample(&query)?)
            }
        }
    }
}
