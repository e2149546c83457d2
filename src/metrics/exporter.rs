//! HTTP exporter for the metric registry.
//!
//! Serves `GET /metrics` in the Prometheus text exposition format, with
//! `/ready` and `/live` probe endpoints next to it. Everything else
//! returns 404.

use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use bytes::Bytes;
use http_body_util::Full;
use hyper::{
    Method, Request, Response, StatusCode, body::Incoming, header, server::conn::http1,
    service::service_fn,
};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use crate::metrics::prometheus::MetricsRegistry;

/// Runs an HTTP server that exposes Prometheus metrics.
///
/// The server listens on `addr` and serves `GET /metrics` with the
/// Prometheus text exposition format, plus `GET /ready` and `GET /live`
/// probes. All other paths return 404.
///
/// This function is `async` and is intended to be spawned onto a Tokio
/// runtime, e.g.:
///
/// ```ignore
/// let registry = Arc::new(MetricsRegistry::new(None)?);
/// let addr: SocketAddr = "127.0.0.1:9898".parse()?;
/// tokio::spawn(run_metrics_http_server(registry.clone(), addr));
/// ```
pub async fn run_metrics_http_server(
    metrics: Arc<MetricsRegistry>,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let svc = service_fn(move |req: Request<Incoming>| {
                let metrics = metrics.clone();
                async move {
                    Ok::<_, Infallible>(route(req.method(), req.uri().path(), &metrics))
                }
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, svc).await {
                tracing::error!(error = %err, "metrics HTTP connection error");
            }
        });
    }
}

/// Maps one request onto a response.
///
/// Split out from the connection loop so routing is testable without
/// sockets.
fn route(method: &Method, path: &str, metrics: &MetricsRegistry) -> Response<Full<Bytes>> {
    match (method, path) {
        (&Method::GET, "/metrics") => {
            let body = metrics.gather_text();
            response(
                StatusCode::OK,
                "text/plain; version=0.0.4",
                Bytes::from(body),
            )
        }
        (&Method::GET, "/ready") | (&Method::GET, "/live") => {
            response(StatusCode::OK, "text/plain", Bytes::from_static(b"ok"))
        }
        _ => response(
            StatusCode::NOT_FOUND,
            "text/plain",
            Bytes::from_static(b"not found"),
        ),
    }
}

fn response(status: StatusCode, content_type: &str, body: Bytes) -> Response<Full<Bytes>> {
    // Safe to unwrap: status and header values are fixed and valid.
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, content_type)
        .body(Full::new(body))
        .unwrap()
}
