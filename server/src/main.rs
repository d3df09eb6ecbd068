//! analytics-server: read-only HTTP API over the analytics store.
//!
//! Usage:
//!   analytics-server
//!   analytics-server --config analytics.json
//!   ANALYTICS_DB=run.db API_PORT=9000 analytics-server

use analytics_core::config::AnalyticsConfig;
use std::env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let config = match args.windows(2).find(|w| w[0] == "--config") {
        Some(w) => AnalyticsConfig::load(&w[1])?,
        None => AnalyticsConfig::from_env()?,
    };

    analytics_server::serve(config).await
}
