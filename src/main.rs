// src/main.rs

//! Validator watcher binary.
//!
//! Minimal demo collector that wires up the watcher library:
//!
//! - a built-in tracked validator set,
//! - the explorer API client,
//! - the validators API poll loop,
//! - a Prometheus metrics exporter on `/metrics`,
//! - and Ctrl-C driven graceful shutdown.

use std::sync::Arc;

use tokio::signal;
use tokio_util::sync::CancellationToken;

use validator_watcher::{
    ApiClient, MetricsRegistry, TrackedValidator, ValidatorsApiWatcher, WatcherConfig,
    run_metrics_http_server,
};

#[tokio::main]
async fn main() {
    // Basic tracing setup.
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "validator_watcher=info".to_string()),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    // For now the validator set is built in. This can be externalised later.
    let cfg = WatcherConfig {
        validators: vec![TrackedValidator::new(
            "story1q8qkrgqpf76exvz3vd8qgnm3rkhshfg6hcg05u",
            "storyvaloper1q8qkrgqpf76exvz3vd8qgnm3rkhshfg6jemsgw",
            "kiln",
        )],
        ..WatcherConfig::default()
    };
    cfg.validate()
        .map_err(|e| format!("invalid configuration: {e}"))?;

    // ---------------------------
    // Metrics registry + exporter
    // ---------------------------

    let metrics = Arc::new(
        MetricsRegistry::new(cfg.metrics.namespace.clone())
            .map_err(|e| format!("failed to initialise metrics registry: {e}"))?,
    );

    if cfg.metrics.enabled {
        let metrics_clone = metrics.clone();
        let addr = cfg.metrics.listen_addr;
        tokio::spawn(async move {
            if let Err(e) = run_metrics_http_server(metrics_clone, addr).await {
                eprintln!("metrics HTTP server error: {e}");
            }
        });
        tracing::info!("metrics exporter listening on http://{}/metrics", addr);
    }

    // ---------------------------
    // Explorer API client
    // ---------------------------

    let api =
        ApiClient::new(&cfg.api).map_err(|e| format!("failed to create explorer client: {e}"))?;

    // ---------------------------
    // Validators API watcher
    // ---------------------------

    let watcher =
        ValidatorsApiWatcher::new(metrics, cfg.validators.clone(), api, cfg.poll.interval);

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            shutdown.cancel();
        });
    }

    watcher.run(shutdown).await;

    Ok(())
}

/// Waits for Ctrl-C and returns, used for graceful shutdown.
async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
