//! HTTP client for the explorer API.
//!
//! A thin typed wrapper over `reqwest` for the three endpoints the watcher
//! polls. Each getter builds the request URL, performs a GET, requires a
//! 200, and decodes the body into its typed record. A shutdown token is
//! raced against every request so in-flight calls resolve promptly when
//! the process stops.

use std::fmt;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::api::types::{AccountInfo, DelegatorCount, ValidatorInfo};
use crate::config::ApiConfig;

/// Errors that can occur while fetching from the explorer API.
#[derive(Debug)]
pub enum ApiError {
    /// The underlying HTTP client could not be constructed.
    Build(reqwest::Error),
    /// Transport-level failure (refused connection, timeout, TLS).
    Transport { url: String, source: reqwest::Error },
    /// The API answered with a status other than 200.
    Status { url: String, status: StatusCode },
    /// The body was not valid JSON for the expected shape.
    Decode {
        url: String,
        source: serde_json::Error,
    },
    /// Shutdown was signalled while the request was in flight.
    Cancelled { url: String },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Build(e) => write!(f, "failed to build HTTP client: {e}"),
            ApiError::Transport { url, source } => write!(f, "GET {url} failed: {source}"),
            ApiError::Status { url, status } => {
                write!(f, "GET {url} returned unexpected status code {status}")
            }
            ApiError::Decode { url, source } => {
                write!(f, "GET {url} returned a malformed body: {source}")
            }
            ApiError::Cancelled { url } => write!(f, "GET {url} cancelled by shutdown"),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Build(e) | ApiError::Transport { source: e, .. } => Some(e),
            ApiError::Decode { source, .. } => Some(source),
            ApiError::Status { .. } | ApiError::Cancelled { .. } => None,
        }
    }
}

/// Typed client for the explorer API endpoints the watcher polls.
///
/// Cheap to clone: the underlying `reqwest::Client` shares one connection
/// pool across clones.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    /// Constructs a client from the API configuration.
    pub fn new(cfg: &ApiConfig) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(ApiError::Build)?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        // Avoid accidental double slashes.
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Fetches the account info of `account`.
    pub async fn account(
        &self,
        shutdown: &CancellationToken,
        account: &str,
    ) -> Result<AccountInfo, ApiError> {
        self.get_json(shutdown, self.endpoint(&format!("accounts/{account}")))
            .await
    }

    /// Fetches the validator state of `operator_address`.
    pub async fn validator(
        &self,
        shutdown: &CancellationToken,
        operator_address: &str,
    ) -> Result<ValidatorInfo, ApiError> {
        self.get_json(
            shutdown,
            self.endpoint(&format!("validators/{operator_address}")),
        )
        .await
    }

    /// Fetches the delegator count of `operator_address`.
    pub async fn delegators(
        &self,
        shutdown: &CancellationToken,
        operator_address: &str,
    ) -> Result<DelegatorCount, ApiError> {
        self.get_json(
            shutdown,
            self.endpoint(&format!("validators/{operator_address}/delegators")),
        )
        .await
    }

    /// Performs one GET and decodes the body, racing the shutdown token.
    ///
    /// An already-cancelled token wins before the request is issued at
    /// all; cancellation mid-flight drops the request and reports
    /// [`ApiError::Cancelled`].
    async fn get_json<T: DeserializeOwned>(
        &self,
        shutdown: &CancellationToken,
        url: String,
    ) -> Result<T, ApiError> {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => Err(ApiError::Cancelled { url: url.clone() }),
            result = self.request(&url) => result,
        }
    }

    async fn request<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ApiError::Transport {
                url: url.to_string(),
                source: e,
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(ApiError::Status {
                url: url.to_string(),
                status,
            });
        }

        let body = response.bytes().await.map_err(|e| ApiError::Transport {
            url: url.to_string(),
            source: e,
        })?;

        serde_json::from_slice(&body).map_err(|e| ApiError::Decode {
            url: url.to_string(),
            source: e,
        })
    }
}
