//! Runtime configuration.
//!
//! One `AnalyticsConfig` value is built at startup (JSON file, then
//! environment overrides) and passed explicitly into the batch engine and
//! the query service. Every field has a default, so a partial file is valid.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::clock::AnalysisDatePolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path:            String,
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path:            "analytics.db".to_string(),
            busy_timeout_ms: 2000,
        }
    }
}

impl DatabaseConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host:             String,
    pub port:             u16,
    pub query_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host:             "0.0.0.0".to_string(),
            port:             8000,
            query_timeout_ms: 5000,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub database:              DatabaseConfig,
    /// How the batch resolves its fixed analysis date T.
    pub analysis_date:         AnalysisDatePolicy,
    /// Trailing days of daily revenue the forecast is compared against.
    pub history_window_days:   i64,
    /// Character limit for product display names.
    pub product_display_limit: usize,
    /// Recompute locks older than this are treated as abandoned.
    pub lock_stale_after_secs: i64,
    pub server:                ServerConfig,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            database:              DatabaseConfig::default(),
            analysis_date:         AnalysisDatePolicy::LatestInvoice,
            history_window_days:   90,
            product_display_limit: 50,
            lock_stale_after_secs: 3600,
            server:                ServerConfig::default(),
        }
    }
}

impl AnalyticsConfig {
    /// Load from a JSON file, then apply environment overrides.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let mut config: AnalyticsConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.apply_env()?;
        Ok(config)
    }

    /// Defaults plus environment overrides. Used when no file is given.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// `ANALYTICS_DB`, `API_HOST` and `API_PORT` win over file values.
    pub fn apply_env(&mut self) -> anyhow::Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("ANALYTICS_DB") {
            self.database.path = path;
        }
        if let Some(host) = lookup("API_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("API_PORT") {
            self.server.port = port
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid API_PORT '{port}': {e}"))?;
        }
        Ok(())
    }

    /// Hardcoded config for tests, no file or environment access.
    pub fn default_test() -> Self {
        Self {
            database: DatabaseConfig {
                path:            ":memory:".to_string(),
                busy_timeout_ms: 500,
            },
            server: ServerConfig {
                host:             "127.0.0.1".to_string(),
                port:             0,
                query_timeout_ms: 2000,
            },
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::HashMap;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: AnalyticsConfig =
            serde_json::from_str(r#"{ "history_window_days": 30 }"#).unwrap();
        assert_eq!(config.history_window_days, 30);
        assert_eq!(config.product_display_limit, 50);
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.analysis_date, AnalysisDatePolicy::LatestInvoice);
    }

    #[test]
    fn fixed_analysis_date_parses() {
        let config: AnalyticsConfig =
            serde_json::from_str(r#"{ "analysis_date": { "fixed": "2011-12-10" } }"#).unwrap();
        assert_eq!(
            config.analysis_date,
            AnalysisDatePolicy::Fixed(NaiveDate::from_ymd_opt(2011, 12, 10).unwrap())
        );
    }

    #[test]
    fn env_overrides_win() {
        let env: HashMap<&str, &str> =
            HashMap::from([("ANALYTICS_DB", "/tmp/x.db"), ("API_PORT", "9001")]);
        let mut config = AnalyticsConfig::default();
        config
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.database.path, "/tmp/x.db");
        assert_eq!(config.server.port, 9001);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn bad_port_is_rejected() {
        let mut config = AnalyticsConfig::default();
        let result = config.apply_overrides(|k| (k == "API_PORT").then(|| "eighty".to_string()));
        assert!(result.is_err());
    }
}
