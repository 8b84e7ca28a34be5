//! HTTP client for registry and archive downloads.
//!
//! This module provides a wrapper around `reqwest` with a few package-manager
//! specific features:
//! - Automatic retry logic with exponential backoff on 5xx and 429 responses
//! - Structured error bodies: a response with status >= 400 is decoded as
//!   `{"message": "..."}` and the upstream message is surfaced to the caller
//! - Progress tracking for downloads
//! - Per-host bearer tokens (e.g. a GitHub token to lift API rate limits)
//!
//! # Examples
//!
//! ```no_run
//! use qpx_pm::http::{HttpClient, HttpClientConfig};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = HttpClientConfig::new()
//!     .with_timeout(Duration::from_secs(60))
//!     .with_max_retries(5);
//! let client = HttpClient::with_config(config)?;
//!
//! client.download(
//!     "https://api.github.com/repos/owner/repo/tarball/abc123",
//!     "/tmp/repo.tar.gz".as_ref(),
//!     Some(|downloaded, total| println!("{}/{} bytes", downloaded, total)),
//! ).await?;
//! # Ok(())
//! # }
//! ```

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

const DEFAULT_USER_AGENT: &str = concat!("qpx/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status} for {url}: {message}")]
    HttpStatus {
        status: u16,
        url: String,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Max retries exceeded for {url}")]
    MaxRetries { url: String },

    #[error("Invalid JSON from {url}: {message}")]
    JsonParse { url: String, message: String },
}

/// Extract the upstream error message from a failed response body.
///
/// Servers answer errors with `{"message": "..."}`; anything else falls back
/// to the canonical status text.
pub fn error_message(status: StatusCode, body: &str) -> String {
    let parsed: Option<HashMap<String, serde_json::Value>> = serde_json::from_str(body).ok();

    parsed
        .and_then(|map| map.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .map(|reason| format!("{} {}", status.as_u16(), reason))
                .unwrap_or_else(|| status.as_u16().to_string())
        })
}

/// Exponential backoff (1s, 2s, 4s, ...) capped at one minute
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2_u32.saturating_pow(attempt)).min(MAX_RETRY_DELAY)
}

pub struct HttpClient {
    client: Client,
    max_retries: u32,
    retry_delay: Duration,
    bearer_tokens: HashMap<String, String>,
}

impl HttpClient {
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_config(HttpClientConfig::default())
    }

    pub fn with_config(config: HttpClientConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .gzip(true)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            client,
            max_retries: config.max_retries,
            retry_delay: config.retry_delay,
            bearer_tokens: config.bearer_tokens,
        })
    }

    /// Perform GET request with automatic retries
    pub async fn get(&self, url: &str) -> Result<Response, HttpError> {
        self.send_with_retries(url, || self.authorize(self.client.get(url), url))
            .await
    }

    /// POST a JSON body with automatic retries
    pub async fn post_json<B: Serialize + ?Sized>(&self, url: &str, body: &B) -> Result<Response, HttpError> {
        self.send_with_retries(url, || self.authorize(self.client.post(url).json(body), url))
            .await
    }

    async fn send_with_retries<F>(&self, url: &str, build: F) -> Result<Response, HttpError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            match build().send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }

                    let retryable = status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS;
                    let body = response.text().await.unwrap_or_default();
                    let error = HttpError::HttpStatus {
                        status: status.as_u16(),
                        url: url.to_string(),
                        message: error_message(status, &body),
                    };

                    // Don't retry on client errors (4xx except 429)
                    if !retryable {
                        return Err(error);
                    }
                    log::debug!("{} answered {}, retrying", url, status);
                    last_error = Some(error);
                }
                Err(e) => {
                    log::debug!("Request to {} failed: {}", url, e);
                    last_error = Some(HttpError::Request(e));
                }
            }

            if attempt < self.max_retries {
                tokio::time::sleep(backoff_delay(self.retry_delay, attempt)).await;
            }
        }

        match last_error {
            Some(e) => Err(e),
            None => Err(HttpError::MaxRetries {
                url: url.to_string(),
            }),
        }
    }

    fn authorize(&self, request: RequestBuilder, url: &str) -> RequestBuilder {
        let host = url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string));

        match host.and_then(|h| self.token_for_host(&h)) {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn token_for_host(&self, host: &str) -> Option<&str> {
        self.bearer_tokens
            .iter()
            .find(|(domain, _)| host == domain.as_str() || host.ends_with(&format!(".{}", domain)))
            .map(|(_, token)| token.as_str())
    }

    /// GET JSON and deserialize
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, HttpError> {
        let response = self.get(url).await?;
        Self::decode_json(url, response).await
    }

    /// POST JSON and deserialize the JSON answer
    pub async fn post_json_for<B, T>(&self, url: &str, body: &B) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.post_json(url, body).await?;
        Self::decode_json(url, response).await
    }

    async fn decode_json<T: DeserializeOwned>(url: &str, response: Response) -> Result<T, HttpError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| HttpError::JsonParse {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    /// Download file with progress callback
    pub async fn download<F>(
        &self,
        url: &str,
        dest: &Path,
        progress: Option<F>,
    ) -> Result<u64, HttpError>
    where
        F: Fn(u64, u64),
    {
        let response = self.get(url).await?;

        // Get total size from Content-Length header
        let total_size = response.content_length().unwrap_or(0);

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = File::create(dest).await?;
        let mut downloaded: u64 = 0;

        let mut stream = response.bytes_stream();

        use futures_util::StreamExt;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;

            if let Some(ref callback) = progress {
                callback(downloaded, total_size);
            }
        }

        file.flush().await?;

        Ok(downloaded)
    }
}

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub user_agent: String,
    pub bearer_tokens: HashMap<String, String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            bearer_tokens: HashMap::new(),
        }
    }
}

impl HttpClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }

    /// Send `token` as a bearer token to `domain` and its subdomains
    pub fn with_bearer_token(mut self, domain: impl Into<String>, token: impl Into<String>) -> Self {
        self.bearer_tokens.insert(domain.into(), token.into());
        self
    }
}
