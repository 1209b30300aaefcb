//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests made against the catalogue API:
//! - Building the HTTP client with a proper user agent string
//! - Building request URLs from pre-encoded query parameters
//! - Retrying transient failures with a short wait and a long cooldown
//! - Classifying failures

use crate::config::{ApiConfig, Config, RetryConfig, UserAgentConfig};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Failure of a single request, or of a whole retried call
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    #[error("Empty response body")]
    EmptyBody,

    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Gave up on {url} after {attempts} attempts (last error: {last})")]
    Exhausted {
        url: String,
        attempts: u32,
        last: String,
    },
}

/// Backoff schedule for one logical request
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | Transport error, non-2xx, empty body, bad JSON | wait `retry_wait`, retry |
/// | `cooldown_after` consecutive failures reached | also wait `cooldown` before each retry |
/// | `max_attempts` requests made | give up with `FetchError::Exhausted` |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub retry_wait: Duration,
    pub cooldown_after: u32,
    pub cooldown: Duration,
}

impl RetryPolicy {
    /// Total time to wait after the given number of consecutive failures
    pub fn delay_after(&self, failures: u32) -> Duration {
        if failures >= self.cooldown_after {
            self.retry_wait + self.cooldown
        } else {
            self.retry_wait
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            retry_wait: Duration::from_millis(config.retry_wait),
            cooldown_after: config.cooldown_after,
            cooldown: Duration::from_secs(config.cooldown),
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// The user agent has the form `CrawlerName/Version (+ContactURL; ContactEmail)`.
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    api: &ApiConfig,
) -> Result<Client, reqwest::Error> {
    let user_agent = format!(
        "{}/{} (+{}; {})",
        user_agent.crawler_name,
        user_agent.crawler_version,
        user_agent.contact_url,
        user_agent.contact_email
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(api.request_timeout))
        .connect_timeout(Duration::from_secs(api.connect_timeout))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Appends `params` to `endpoint` as a query string
///
/// Values are inserted verbatim. They are expected to be query-safe already
/// (numbers, letters, or percent-encoded tokens such as `%23`), which keeps
/// pre-encoded tokens from being encoded a second time.
pub fn build_request_url(endpoint: &str, params: &[(&str, String)]) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(endpoint)?;

    if !params.is_empty() {
        let mut pairs: Vec<String> = url
            .query()
            .filter(|q| !q.is_empty())
            .map(|q| vec![q.to_string()])
            .unwrap_or_default();
        pairs.extend(params.iter().map(|(key, value)| format!("{}={}", key, value)));
        url.set_query(Some(&pairs.join("&")));
    }

    Ok(url)
}

/// Client for the catalogue API endpoints
#[derive(Debug, Clone)]
pub struct CatalogueClient {
    http: Client,
    summary_url: String,
    items_url: String,
    page_size: u32,
    retry: RetryPolicy,
}

impl CatalogueClient {
    pub fn new(http: Client, api: &ApiConfig, retry: RetryPolicy) -> Self {
        Self {
            http,
            summary_url: api.summary_url.clone(),
            items_url: api.items_url.clone(),
            page_size: api.page_size,
            retry,
        }
    }

    /// Builds the client described by a loaded configuration
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        let http = build_http_client(&config.user_agent, &config.api)?;
        Ok(Self::new(
            http,
            &config.api,
            RetryPolicy::from(&config.retry),
        ))
    }

    pub fn summary_url(&self) -> &str {
        &self.summary_url
    }

    pub fn items_url(&self) -> &str {
        &self.items_url
    }

    /// Number of items the server puts on a full page
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Performs one logical GET and decodes the JSON body
    ///
    /// Transient failures are retried according to the client's
    /// [`RetryPolicy`]. Only an invalid URL or an exhausted retry budget is
    /// returned as an error.
    pub async fn fetch_json(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<Value, FetchError> {
        let url = build_request_url(endpoint, params)?;
        let mut failures: u32 = 0;

        loop {
            let attempt = failures + 1;

            match self.fetch_once(&url).await {
                Ok(value) => {
                    if failures > 0 {
                        tracing::info!(url = %url, attempt, "Request succeeded after retrying");
                    } else {
                        tracing::debug!(url = %url, "Request succeeded");
                    }
                    return Ok(value);
                }
                Err(e) => {
                    failures += 1;
                    tracing::warn!(url = %url, attempt, error = %e, "Request failed");

                    if failures >= self.retry.max_attempts {
                        tracing::error!(url = %url, attempts = failures, "Giving up on request");
                        return Err(FetchError::Exhausted {
                            url: url.to_string(),
                            attempts: failures,
                            last: e.to_string(),
                        });
                    }

                    if failures >= self.retry.cooldown_after {
                        tracing::warn!(
                            url = %url,
                            failures,
                            cooldown_secs = self.retry.cooldown.as_secs(),
                            "Repeated failures, possibly rate limited; cooling down"
                        );
                    }
                    tokio::time::sleep(self.retry.delay_after(failures)).await;

                    tracing::info!(url = %url, attempt = attempt + 1, "Retrying request");
                }
            }
        }
    }

    async fn fetch_once(&self, url: &Url) -> Result<Value, FetchError> {
        let response = self.http.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Err(FetchError::EmptyBody);
        }

        Ok(serde_json::from_str(&body)?)
    }
}
