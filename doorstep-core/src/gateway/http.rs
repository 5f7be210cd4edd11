//! Shared upstream HTTP plumbing: timeout, retry, and backoff.
//!
//! Both upstream clients (geocoding and road/path queries) funnel their
//! requests through [`UpstreamClient`], which retries transient failures
//! with exponential backoff and converts everything else into
//! [`DoorstepError::Upstream`]. Every request carries a bounded timeout
//! so a resolution can never hang on a dependency.

use std::time::{Duration, Instant};

use backoff::{future::retry_notify, ExponentialBackoff};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::error::{DoorstepError, Result};

/// Default per-request timeout; also forwarded to the road/path service
/// as its server-side timeout hint.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const DEFAULT_MAX_RETRIES: u32 = 2;
const INITIAL_INTERVAL: Duration = Duration::from_millis(100);
const MAX_INTERVAL: Duration = Duration::from_secs(2);

/// Configuration for an upstream HTTP client.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Request timeout.
    pub timeout: Duration,
    /// Maximum retry attempts for transient errors.
    pub max_retries: u32,
    /// Identifying User-Agent; the public geocoding service requires one.
    pub user_agent: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            user_agent: format!("doorstep/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// HTTP client shared by the upstream gateways.
pub struct UpstreamClient {
    client: Client,
    config: UpstreamConfig,
}

impl UpstreamClient {
    pub fn new(config: UpstreamConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;
        Ok(Self { client, config })
    }

    /// GET `url` and parse the JSON response.
    pub async fn get_json<R>(&self, service: &'static str, url: Url) -> Result<R>
    where
        R: DeserializeOwned,
    {
        self.request_json(service, || self.client.get(url.clone()))
            .await
    }

    /// POST a form body to `url` and parse the JSON response.
    pub async fn post_form_json<R>(
        &self,
        service: &'static str,
        url: Url,
        form: &[(&str, String)],
    ) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let form: Vec<(String, String)> = form
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect();
        self.request_json(service, || self.client.post(url.clone()).form(&form))
            .await
    }

    async fn request_json<R, F>(&self, service: &'static str, build: F) -> Result<R>
    where
        R: DeserializeOwned,
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        let backoff = self.build_backoff();

        retry_notify(
            backoff,
            || {
                let build = &build;
                async move { self.request_once(service, build()).await }
            },
            |err: DoorstepError, duration: Duration| {
                warn!(
                    service = service,
                    error = %err,
                    retry_after_ms = duration.as_millis() as u64,
                    "Retry scheduled"
                );
            },
        )
        .await
    }

    async fn request_once<R>(
        &self,
        service: &'static str,
        request: RequestBuilder,
    ) -> std::result::Result<R, backoff::Error<DoorstepError>>
    where
        R: DeserializeOwned,
    {
        let start = Instant::now();

        let response = request.send().await.map_err(|e| {
            let latency_ms = start.elapsed().as_millis() as u64;
            let err = DoorstepError::Upstream {
                service,
                reason: e.to_string(),
            };
            if is_transient_error(&e) {
                warn!(service, error = %e, latency_ms, "Transient error, will retry");
                backoff::Error::transient(err)
            } else {
                warn!(service, error = %e, latency_ms, "Permanent error, aborting");
                backoff::Error::permanent(err)
            }
        })?;

        let status = response.status();
        debug!(service, status = %status, "Received HTTP response");

        if !status.is_success() {
            let latency_ms = start.elapsed().as_millis() as u64;
            let err = DoorstepError::Upstream {
                service,
                reason: format!("returned status {status}"),
            };
            return if is_transient_status(status) {
                warn!(service, status = %status, latency_ms, "Transient HTTP status, will retry");
                Err(backoff::Error::transient(err))
            } else {
                warn!(service, status = %status, latency_ms, "Permanent HTTP error");
                Err(backoff::Error::permanent(err))
            };
        }

        let parsed: R = response.json().await.map_err(|e| {
            warn!(service, error = %e, "Failed to parse JSON response");
            backoff::Error::permanent(DoorstepError::Upstream {
                service,
                reason: format!("unparseable response: {e}"),
            })
        })?;

        debug!(
            service,
            latency_ms = start.elapsed().as_millis() as u64,
            "Request completed successfully"
        );

        Ok(parsed)
    }

    fn build_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: INITIAL_INTERVAL,
            max_interval: MAX_INTERVAL,
            max_elapsed_time: Some(self.config.timeout * self.config.max_retries),
            ..Default::default()
        }
    }
}

/// Check if a reqwest error is transient and should be retried.
pub fn is_transient_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_request()
}

/// Check if an HTTP status code indicates a transient error.
pub fn is_transient_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
            | StatusCode::BAD_GATEWAY
    )
}
