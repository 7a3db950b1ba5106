//! Dashboard HTTP client
//!
//! Resource bindings talk to the API through [`HttpTransport`], a JSON
//! request/response seam keyed by API path. [`DashboardClient`] is the
//! reqwest implementation used against the real service.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use tfmeraki_core::provider::{BoxFuture, ErrorKind, ProviderError, ProviderResult};

use crate::config::{ConfigError, ProviderConfig};

const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// JSON calls against the Dashboard API
pub trait HttpTransport: Send + Sync {
    /// `None` on 404
    fn get(&self, path: String) -> BoxFuture<'_, ProviderResult<Option<serde_json::Value>>>;

    fn post(
        &self,
        path: String,
        body: serde_json::Value,
    ) -> BoxFuture<'_, ProviderResult<serde_json::Value>>;

    fn put(
        &self,
        path: String,
        body: serde_json::Value,
    ) -> BoxFuture<'_, ProviderResult<serde_json::Value>>;

    /// Deleting something already gone succeeds
    fn delete(&self, path: String) -> BoxFuture<'_, ProviderResult<()>>;
}

impl<T: HttpTransport + ?Sized> HttpTransport for Arc<T> {
    fn get(&self, path: String) -> BoxFuture<'_, ProviderResult<Option<serde_json::Value>>> {
        (**self).get(path)
    }

    fn post(
        &self,
        path: String,
        body: serde_json::Value,
    ) -> BoxFuture<'_, ProviderResult<serde_json::Value>> {
        (**self).post(path, body)
    }

    fn put(
        &self,
        path: String,
        body: serde_json::Value,
    ) -> BoxFuture<'_, ProviderResult<serde_json::Value>> {
        (**self).put(path, body)
    }

    fn delete(&self, path: String) -> BoxFuture<'_, ProviderResult<()>> {
        (**self).delete(path)
    }
}

impl From<ConfigError> for ProviderError {
    fn from(e: ConfigError) -> Self {
        ProviderError::configuration(e.to_string()).with_cause(e)
    }
}

/// Dashboard API client
pub struct DashboardClient {
    client: Client,
    config: ProviderConfig,
    backoff: Duration,
}

impl DashboardClient {
    pub fn new(config: ProviderConfig) -> ProviderResult<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(Duration::from_secs(10))
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                ProviderError::configuration("failed to build HTTP client").with_cause(e)
            })?;

        Ok(Self {
            client,
            config,
            backoff: DEFAULT_BACKOFF,
        })
    }

    /// Base delay between retries when the server does not say how long to wait
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.config.endpoint(path))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Accept", "application/json")
    }

    /// Send a request, retrying rate-limited and server-side failures
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> ProviderResult<reqwest::Response> {
        let mut attempt = 0;
        loop {
            let mut builder = self.request(method.clone(), path);
            if let Some(body) = body {
                builder = builder.json(body);
            }

            debug!("{} {} (attempt {})", method, path, attempt + 1);
            let result = builder.send().await;

            let retry_after = match &result {
                Ok(response) if is_retryable(&method, response.status()) => {
                    Some(retry_delay(response, self.backoff, attempt))
                }
                Err(e) if is_idempotent(&method) && (e.is_timeout() || e.is_connect()) => {
                    Some(backoff_delay(self.backoff, attempt))
                }
                _ => None,
            };

            match retry_after {
                Some(delay) if attempt < self.config.retries => {
                    warn!(
                        "{} {} failed, retrying in {}ms",
                        method,
                        path,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                _ => {
                    return result.map_err(|e| {
                        ProviderError::new(format!("{} {} failed", method, path)).with_cause(e)
                    });
                }
            }
        }
    }

    async fn json_or_error(
        method: &Method,
        path: &str,
        response: reqwest::Response,
    ) -> ProviderResult<serde_json::Value> {
        let status = response.status();
        if !status.is_success() {
            return Err(api_error(method, path, response).await);
        }

        let bytes = response.bytes().await.map_err(|e| {
            ProviderError::new(format!("failed to read response of {} {}", method, path))
                .with_cause(e)
        })?;
        if bytes.is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| {
            ProviderError::new(format!("invalid JSON in response of {} {}", method, path))
                .with_cause(e)
        })
    }

    async fn write(
        &self,
        method: Method,
        path: String,
        body: serde_json::Value,
    ) -> ProviderResult<serde_json::Value> {
        let response = self.send(method.clone(), &path, Some(&body)).await?;
        Self::json_or_error(&method, &path, response).await
    }
}

impl HttpTransport for DashboardClient {
    fn get(&self, path: String) -> BoxFuture<'_, ProviderResult<Option<serde_json::Value>>> {
        Box::pin(async move {
            let response = self.send(Method::GET, &path, None).await?;
            if response.status() == StatusCode::NOT_FOUND {
                debug!("GET {} returned 404", path);
                return Ok(None);
            }
            Self::json_or_error(&Method::GET, &path, response)
                .await
                .map(Some)
        })
    }

    fn post(
        &self,
        path: String,
        body: serde_json::Value,
    ) -> BoxFuture<'_, ProviderResult<serde_json::Value>> {
        Box::pin(self.write(Method::POST, path, body))
    }

    fn put(
        &self,
        path: String,
        body: serde_json::Value,
    ) -> BoxFuture<'_, ProviderResult<serde_json::Value>> {
        Box::pin(self.write(Method::PUT, path, body))
    }

    fn delete(&self, path: String) -> BoxFuture<'_, ProviderResult<()>> {
        Box::pin(async move {
            let response = self.send(Method::DELETE, &path, None).await?;
            let status = response.status();
            if status == StatusCode::NOT_FOUND {
                debug!("DELETE {} returned 404, already gone", path);
                return Ok(());
            }
            if !status.is_success() {
                return Err(api_error(&Method::DELETE, &path, response).await);
            }
            Ok(())
        })
    }
}

/// POST creates are resent only after a 429
fn is_retryable(method: &Method, status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || (is_idempotent(method) && status.is_server_error())
}

fn is_idempotent(method: &Method) -> bool {
    *method != Method::POST
}

fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt)).min(MAX_BACKOFF)
}

/// Honour `Retry-After` (seconds) when present
fn retry_delay(response: &reqwest::Response, base: Duration, attempt: u32) -> Duration {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|secs| Duration::from_secs(secs).min(MAX_BACKOFF))
        .unwrap_or_else(|| backoff_delay(base, attempt))
}

/// Build an error from a failed response, including the API's `errors` list
async fn api_error(method: &Method, path: &str, response: reqwest::Response) -> ProviderError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let details = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|json| {
            json.get("errors").and_then(|errors| errors.as_array()).map(|errors| {
                errors
                    .iter()
                    .filter_map(|e| e.as_str())
                    .collect::<Vec<_>>()
                    .join("; ")
            })
        })
        .filter(|details| !details.is_empty())
        .unwrap_or(body);

    let kind = match status {
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ErrorKind::Configuration
        }
        _ => ErrorKind::Api,
    };

    let mut message = format!("{} {} returned {}", method, path, status);
    if !details.is_empty() {
        message.push_str(": ");
        message.push_str(&details);
    }
    ProviderError::new(message).with_kind(kind)
}
