//! Metrics and instrumentation for the watcher.
//!
//! This module defines Prometheus-compatible metrics for the whole
//! exporter surface and a small HTTP server that serves `/metrics` in
//! Prometheus text format.
//!
//! Typical usage in a binary:
//!
//! ```ignore
//! use std::net::SocketAddr;
//! use std::sync::Arc;
//! use validator_watcher::metrics::{MetricsRegistry, run_metrics_http_server};
//!
//! let registry = Arc::new(MetricsRegistry::new(None)?);
//! let addr: SocketAddr = "127.0.0.1:9898".parse()?;
//!
//! // Spawn the HTTP exporter in the background:
//! tokio::spawn(run_metrics_http_server(registry.clone(), addr));
//!
//! // Elsewhere in the code:
//! registry
//!     .validator_api
//!     .delegators
//!     .with_label_values(&["storyvaloper1...", "kiln"])
//!     .set(42.0);
//! ```

pub mod exporter;
pub mod prometheus;

pub use exporter::run_metrics_http_server;
pub use self::prometheus::{
    ChainMetrics, MetricsRegistry, NodeMetrics, ValidatorApiMetrics, bool_to_f64,
};
