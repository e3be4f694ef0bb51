//! Authenticated HTTP transport for the Nuki Web API.
//!
//! [`NukiTransport`] sends one JSON request with the bearer token and
//! `Accept: application/json`, applying a per-attempt timeout. Timeouts and
//! connection-level failures are retried with a fixed delay; HTTP error
//! statuses are returned immediately.

use std::time::Duration;

use nuki_otp_core::OtpConfig;
use reqwest::{header, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{NukiError, NukiResult};

/// Upper bound on pages followed for a single listing.
const MAX_PAGES: usize = 100;

// ---------------------------------------------------------------------------
// RetryPolicy
// ---------------------------------------------------------------------------

/// Timeout and retry tuning for the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Overall timeout of a single attempt.
    pub timeout: Duration,
    /// Additional attempts after the first one fails to connect or times out.
    pub max_retries: u32,
    /// Fixed pause between attempts.
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn total_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

// ---------------------------------------------------------------------------
// Paging
// ---------------------------------------------------------------------------

/// One page of a listing.
///
/// The documented endpoints answer with a bare array. An envelope with a
/// `next` link is followed as well in case the API starts paginating; the
/// link may be a path relative to the base URL or an absolute URL.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Page<T> {
    Bare(Vec<T>),
    Envelope {
        items: Vec<T>,
        #[serde(default)]
        next: Option<String>,
    },
}

impl<T> Page<T> {
    fn into_parts(self) -> (Vec<T>, Option<String>) {
        match self {
            Page::Bare(items) => (items, None),
            Page::Envelope { items, next } => (items, next.filter(|n| !n.is_empty())),
        }
    }
}

// ---------------------------------------------------------------------------
// NukiTransport
// ---------------------------------------------------------------------------

/// Outcome of a single attempt.
enum AttemptError {
    /// Timeout or connection failure; worth another attempt.
    Retryable(reqwest::Error),
    /// Final answer from the server or a request that can never succeed.
    Fatal(NukiError),
}

/// HTTP client bound to one API base URL and token.
#[derive(Clone)]
pub struct NukiTransport {
    client: reqwest::Client,
    base_url: String,
    token: String,
    policy: RetryPolicy,
}

impl NukiTransport {
    /// Build a transport with its own [`reqwest::Client`].
    pub fn new(config: &OtpConfig, policy: RetryPolicy) -> NukiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(policy.timeout)
            .build()
            .map_err(|source| NukiError::Transport {
                attempts: 0,
                source,
            })?;
        Ok(Self::with_client(client, config, policy))
    }

    /// Reuse an existing [`reqwest::Client`] (connection pooling across
    /// instances). The per-attempt timeout is still applied per request.
    pub fn with_client(client: reqwest::Client, config: &OtpConfig, policy: RetryPolicy) -> Self {
        Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.api_token.clone(),
            policy,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Execute a request and return the parsed JSON body.
    ///
    /// HTTP 200 yields the body, HTTP 204 an empty object. Any other status
    /// fails without retry; 401/403 map to [`NukiError::Authentication`].
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> NukiResult<Value> {
        let url = self.url(path);
        let attempts = self.policy.total_attempts();

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.attempt_once(method.clone(), &url, body).await {
                Ok(value) => return Ok(value),
                Err(AttemptError::Fatal(e)) => return Err(e),
                Err(AttemptError::Retryable(e)) if attempt < attempts => {
                    tracing::warn!(
                        attempt,
                        %method,
                        path,
                        error = %e,
                        "Request to lock cloud failed, retrying"
                    );
                    tokio::time::sleep(self.policy.retry_delay).await;
                }
                Err(AttemptError::Retryable(e)) => {
                    tracing::error!(%method, path, error = %e, "Request failed after all retries");
                    return Err(if e.is_timeout() {
                        NukiError::Timeout { attempts }
                    } else {
                        NukiError::Transport {
                            attempts,
                            source: e,
                        }
                    });
                }
            }
        }
    }

    /// Fetch a listing, following `next` links until none is given.
    pub async fn fetch_all<T: DeserializeOwned>(&self, path: &str) -> NukiResult<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(path.to_string());
        let mut pages = 0;

        while let Some(current) = next.take() {
            let value = self.execute(Method::GET, &current, None).await?;
            let (page, following) = serde_json::from_value::<Page<T>>(value)?.into_parts();
            items.extend(page);
            pages += 1;

            if pages >= MAX_PAGES {
                if following.is_some() {
                    tracing::warn!(path, pages, "Page limit reached, listing truncated");
                }
                break;
            }
            next = following;
        }

        Ok(items)
    }

    /// Fetch only the first page of a listing.
    pub async fn fetch_first_page<T: DeserializeOwned>(&self, path: &str) -> NukiResult<Vec<T>> {
        let value = self.execute(Method::GET, path, None).await?;
        let (items, _) = serde_json::from_value::<Page<T>>(value)?.into_parts();
        Ok(items)
    }

    async fn attempt_once(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<Value, AttemptError> {
        let mut request = self
            .client
            .request(method, url)
            .timeout(self.policy.timeout)
            .bearer_auth(&self.token)
            .header(header::ACCEPT, "application/json");

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(classify_send_error)?;
        let status = response.status();
        let text = response.text().await.map_err(classify_send_error)?;

        interpret_response(status, &text).map_err(AttemptError::Fatal)
    }
}

/// Requests that cannot be built will never succeed; everything else is
/// a delivery problem worth retrying.
fn classify_send_error(e: reqwest::Error) -> AttemptError {
    if e.is_builder() {
        AttemptError::Fatal(NukiError::Transport {
            attempts: 1,
            source: e,
        })
    } else {
        AttemptError::Retryable(e)
    }
}

/// Map a received status and body to the call result.
fn interpret_response(status: StatusCode, body: &str) -> NukiResult<Value> {
    match status {
        StatusCode::OK if body.trim().is_empty() => Ok(empty_object()),
        StatusCode::OK => Ok(serde_json::from_str(body)?),
        StatusCode::NO_CONTENT => Ok(empty_object()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(NukiError::Authentication {
            status: status.as_u16(),
            body: body.to_string(),
        }),
        _ => Err(NukiError::Api {
            status: status.as_u16(),
            body: body.to_string(),
        }),
    }
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
