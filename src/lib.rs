//! Validator watcher library crate.
//!
//! This crate provides the building blocks for a telemetry collector
//! that polls a blockchain explorer API for tracked validators and
//! republishes the decoded values as Prometheus metrics:
//!
//! - strongly-typed domain types (`types`),
//! - the explorer HTTP client and response shapes (`api`),
//! - Prometheus-based metrics and the scrape endpoint (`metrics`),
//! - polling watchers that feed the registry (`watcher`),
//! - and a top-level watcher configuration (`config`).
//!
//! Higher-level binaries can compose these pieces to build collectors
//! for different validator sets and explorer deployments.

pub mod api;
pub mod config;
pub mod metrics;
pub mod types;
pub mod watcher;

// Re-export top-level configuration types.
pub use config::{ApiConfig, ConfigError, MetricsConfig, PollConfig, WatcherConfig};

// Re-export the explorer API client.
pub use api::{ApiClient, ApiError};

// Re-export metrics registry and the scrape endpoint server.
pub use metrics::{MetricsRegistry, bool_to_f64, run_metrics_http_server};

// Re-export the polling watcher.
pub use watcher::{PollError, ValidatorsApiWatcher};

// Re-export domain types at the crate root for convenience.
pub use types::*;
