//! Engine configuration.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const ENV_PREFIX: &str = "ORDER_ENGINE_";

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration for the execution substrate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of workers. One worker processes jobs strictly in submission order.
    pub workers: u32,
    /// Maximum number of jobs waiting for a worker. `None` means unbounded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_pending: Option<usize>,
    /// Time limit for processing a single job (seconds).
    pub process_timeout_secs: u64,
    /// Drop finished jobs older than this (seconds). `None` keeps them forever.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention_secs: Option<u64>,
    /// Keep at most this many finished jobs. `None` keeps them all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retained_jobs: Option<usize>,
    /// Period of the housekeeping tick (seconds).
    pub housekeeping_interval_secs: u64,
    /// Capacity of the event broadcast channel.
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            max_pending: None,
            process_timeout_secs: 30,
            retention_secs: None,
            max_retained_jobs: None,
            housekeeping_interval_secs: 30,
            event_capacity: 1024,
        }
    }
}

impl EngineConfig {
    /// Load configuration from `ORDER_ENGINE_*` environment variables.
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |name: &str| {
            let key = format!("{ENV_PREFIX}{name}");
            lookup(&key).map(|value| (key, value))
        };

        if let Some(entry) = get("WORKERS") {
            config.workers = parse(entry)?;
        }
        if let Some(entry) = get("MAX_PENDING") {
            config.max_pending = Some(parse(entry)?);
        }
        if let Some(entry) = get("PROCESS_TIMEOUT_SECS") {
            config.process_timeout_secs = parse(entry)?;
        }
        if let Some(entry) = get("RETENTION_SECS") {
            config.retention_secs = Some(parse(entry)?);
        }
        if let Some(entry) = get("MAX_RETAINED_JOBS") {
            config.max_retained_jobs = Some(parse(entry)?);
        }
        if let Some(entry) = get("HOUSEKEEPING_INTERVAL_SECS") {
            config.housekeeping_interval_secs = parse(entry)?;
        }
        if let Some(entry) = get("EVENT_CAPACITY") {
            config.event_capacity = parse(entry)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".into()));
        }
        if self.max_pending == Some(0) {
            return Err(ConfigError::Invalid("max_pending must be at least 1".into()));
        }
        if self.process_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "process_timeout_secs must be at least 1".into(),
            ));
        }
        if self.housekeeping_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "housekeeping_interval_secs must be at least 1".into(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::Invalid("event_capacity must be at least 1".into()));
        }
        Ok(())
    }

    /// Set the number of workers.
    pub fn with_workers(mut self, workers: u32) -> Self {
        self.workers = workers;
        self
    }

    /// Bound the number of jobs waiting for a worker.
    pub fn with_max_pending(mut self, max_pending: usize) -> Self {
        self.max_pending = Some(max_pending);
        self
    }

    /// Set the per-job processing timeout.
    pub fn with_process_timeout(mut self, timeout_secs: u64) -> Self {
        self.process_timeout_secs = timeout_secs;
        self
    }

    /// Drop finished jobs after `retention_secs`.
    pub fn with_retention(mut self, retention_secs: u64) -> Self {
        self.retention_secs = Some(retention_secs);
        self
    }

    /// Keep at most `max` finished jobs.
    pub fn with_max_retained_jobs(mut self, max: usize) -> Self {
        self.max_retained_jobs = Some(max);
        self
    }

    /// Set the housekeeping period.
    pub fn with_housekeeping_interval(mut self, interval_secs: u64) -> Self {
        self.housekeeping_interval_secs = interval_secs;
        self
    }

    pub fn process_timeout(&self) -> Duration {
        Duration::from_secs(self.process_timeout_secs)
    }

    pub fn housekeeping_interval(&self) -> Duration {
        Duration::from_secs(self.housekeeping_interval_secs)
    }

    pub fn retention(&self) -> Option<Duration> {
        self.retention_secs.map(Duration::from_secs)
    }
}

fn parse<T: FromStr>((key, value): (String, String)) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { key, value })
}
