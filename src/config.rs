//! Process configuration.
//!
//! Environment variables are the single source of configuration; a missing
//! provider key disables that provider rather than aborting startup.

use std::time::Duration;

use crate::poll::DEFAULT_POLL_INTERVAL;
use crate::providers::{runware, runway};

const DEFAULT_PORT: u16 = 3001;

#[derive(Debug, Clone)]
pub struct Config {
    /// Port the HTTP API binds on.
    pub port: u16,
    /// API key for the job-based provider; `None` disables it.
    pub runway_api_key: Option<String>,
    pub runway_base_url: String,
    /// API key for the immediate-result provider; `None` disables it.
    pub runware_api_key: Option<String>,
    pub runware_base_url: String,
    /// Refresh cadence for job-based task polling.
    pub poll_interval: Duration,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// - `PORT` - HTTP port (default 3001)
    /// - `RUNWAYML_API_SECRET` - job-based provider API key
    /// - `RUNWAY_BASE_URL` - override for the job-based provider endpoint
    /// - `RUNWARE_API_KEY` - immediate-result provider API key
    /// - `RUNWARE_BASE_URL` - override for the immediate-result endpoint
    /// - `POLL_INTERVAL_MS` - polling cadence in milliseconds (default 2000)
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            runway_api_key: non_empty_env("RUNWAYML_API_SECRET"),
            runway_base_url: non_empty_env("RUNWAY_BASE_URL")
                .unwrap_or_else(|| runway::DEFAULT_BASE_URL.to_string()),
            runware_api_key: non_empty_env("RUNWARE_API_KEY"),
            runware_base_url: non_empty_env("RUNWARE_BASE_URL")
                .unwrap_or_else(|| runware::DEFAULT_BASE_URL.to_string()),
            poll_interval: non_empty_env("POLL_INTERVAL_MS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_POLL_INTERVAL),
        }
    }

    /// Log a startup warning for each provider left unconfigured.
    pub fn warn_missing_keys(&self) {
        if self.runway_api_key.is_none() {
            tracing::warn!(
                "RUNWAYML_API_SECRET is not set; runway submissions will be rejected"
            );
        }
        if self.runware_api_key.is_none() {
            tracing::warn!("RUNWARE_API_KEY is not set; runware submissions will be rejected");
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
