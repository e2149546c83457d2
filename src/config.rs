//! Top-level configuration for the watcher.
//!
//! This module aggregates configuration for:
//!
//! - the explorer API client (base URL + timeout),
//! - the poll scheduler (tick interval),
//! - the metrics exporter (enable flag, listen address, namespace),
//! - the set of tracked validators.
//!
//! The goal is to have a single `WatcherConfig` struct that higher-level
//! binaries (e.g. `main.rs`) can construct from defaults, config files,
//! or environment variables as needed, and validate once at startup.

use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use crate::types::TrackedValidator;

/// Configuration for the explorer API client.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Base URL of the explorer API, e.g. `"https://api.testnet.storyscan.app"`.
    pub base_url: String,
    /// Request timeout for API calls.
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.testnet.storyscan.app".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Configuration for the poll scheduler.
#[derive(Clone, Debug)]
pub struct PollConfig {
    /// Interval between poll rounds over the full validator set.
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
        }
    }
}

/// Configuration for the Prometheus metrics exporter.
#[derive(Clone, Debug)]
pub struct MetricsConfig {
    /// Whether to run a `/metrics` HTTP exporter.
    pub enabled: bool,
    /// Address to bind the metrics HTTP server to.
    pub listen_addr: SocketAddr,
    /// Optional prefix prepended to every metric name.
    pub namespace: Option<String>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        // Safe to unwrap: this is a fixed, valid address literal.
        let addr: SocketAddr = "127.0.0.1:9898"
            .parse()
            .expect("hard-coded metrics listen address should parse");
        Self {
            enabled: true,
            listen_addr: addr,
            namespace: None,
        }
    }
}

/// Top-level configuration for the watcher.
///
/// This aggregates all the sub-configs needed to wire up the binary:
///
/// - explorer API client (`api`),
/// - poll scheduler (`poll`),
/// - Prometheus metrics exporter (`metrics`),
/// - the tracked validator set (`validators`).
#[derive(Clone, Debug, Default)]
pub struct WatcherConfig {
    pub api: ApiConfig,
    pub poll: PollConfig,
    pub metrics: MetricsConfig,
    pub validators: Vec<TrackedValidator>,
}

/// Error type returned when a configuration fails validation.
#[derive(Debug)]
pub enum ConfigError {
    /// No validators configured; the watcher would have nothing to poll.
    EmptyValidatorSet,
    /// Two entries share the same account address.
    DuplicateValidator(String),
    /// The poll interval is zero, which would spin the scheduler.
    ZeroPollInterval,
    /// The API base URL is empty or not an absolute `http(s)` URL.
    InvalidBaseUrl(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EmptyValidatorSet => write!(f, "no validators configured"),
            ConfigError::DuplicateValidator(account) => {
                write!(f, "validator {account} is configured more than once")
            }
            ConfigError::ZeroPollInterval => write!(f, "poll interval must be non-zero"),
            ConfigError::InvalidBaseUrl(url) => {
                write!(f, "invalid API base URL: {url:?}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl WatcherConfig {
    /// Checks the configuration for mistakes that would make the watcher
    /// useless or ambiguous at runtime. Intended to run once at startup;
    /// any error is fatal.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.validators.is_empty() {
            return Err(ConfigError::EmptyValidatorSet);
        }

        let mut seen = HashSet::new();
        for validator in &self.validators {
            if !seen.insert(validator.account.as_str()) {
                return Err(ConfigError::DuplicateValidator(validator.account.clone()));
            }
        }

        if self.poll.interval.is_zero() {
            return Err(ConfigError::ZeroPollInterval);
        }

        let host = self
            .api
            .base_url
            .strip_prefix("https://")
            .or_else(|| self.api.base_url.strip_prefix("http://"));
        match host {
            Some(rest) if !rest.is_empty() => Ok(()),
            _ => Err(ConfigError::InvalidBaseUrl(self.api.base_url.clone())),
        }
    }
}
