//! Outbound HTTP client configuration.
//!
//! Both the management API gateway and the fleet resolver build their
//! `reqwest` clients from the same [`ClientConfig`], so proxy routing,
//! connection timeouts and transport retry behave identically for every
//! remote call the orchestrator makes.

use std::time::Duration;

use crate::error::{CoreError, Result};

/// Base delay for the first transport retry.
const RETRY_BASE_DELAY_MS: u64 = 100;

/// Upper bound on a single retry delay.
const RETRY_MAX_DELAY_MS: u64 = 20_000;

/// Configuration shared by every outbound HTTP client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Route requests through the configured proxy.
    pub use_proxy: bool,

    /// Proxy scheme (`http` or `https`).
    pub proxy_protocol: String,

    /// Proxy host name.
    pub proxy_host: String,

    /// Proxy port.
    pub proxy_port: u16,

    /// Connection timeout in milliseconds.
    pub connection_timeout_ms: u64,

    /// Overall request timeout in milliseconds.
    pub request_timeout_ms: u64,

    /// Maximum number of retries after a transport failure.
    pub max_error_retry: u32,
}

impl ClientConfig {
    /// Get the connection timeout as a `Duration`.
    #[must_use]
    pub const fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }

    /// Get the request timeout as a `Duration`.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// The proxy URL, if proxying is enabled.
    #[must_use]
    pub fn proxy_url(&self) -> Option<String> {
        self.use_proxy.then(|| {
            format!(
                "{}://{}:{}",
                self.proxy_protocol.to_ascii_lowercase(),
                self.proxy_host,
                self.proxy_port
            )
        })
    }

    /// Build a `reqwest` client honouring the proxy and timeout settings.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::HttpClient` if the proxy URL is invalid or the
    /// client cannot be constructed.
    pub fn build_client(&self) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(self.connection_timeout())
            .timeout(self.request_timeout());

        if let Some(proxy_url) = self.proxy_url() {
            let proxy = reqwest::Proxy::all(&proxy_url)
                .map_err(|e| CoreError::HttpClient(format!("invalid proxy {proxy_url}: {e}")))?;
            builder = builder.proxy(proxy);
            tracing::debug!(proxy = %proxy_url, "Routing outbound requests through proxy");
        }

        builder
            .build()
            .map_err(|e| CoreError::HttpClient(e.to_string()))
    }

    /// Delay before the given retry attempt (zero-based), doubling each time.
    #[must_use]
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.min(16);
        Duration::from_millis(
            RETRY_BASE_DELAY_MS
                .saturating_mul(factor)
                .min(RETRY_MAX_DELAY_MS),
        )
    }

    /// Send a request, retrying transport failures up to `max_error_retry`
    /// times.
    ///
    /// `make` is called once per attempt because a `RequestBuilder` is
    /// consumed by `send`. Any HTTP response, successful or not, is returned
    /// as-is: only connection and timeout failures are retried.
    ///
    /// # Errors
    ///
    /// Returns the last `reqwest::Error` once retries are exhausted, or the
    /// first error that is not a transport failure.
    pub async fn send_with_retry<F>(
        &self,
        mut make: F,
    ) -> std::result::Result<reqwest::Response, reqwest::Error>
    where
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            match make().send().await {
                Ok(response) => return Ok(response),
                Err(e) if attempt < self.max_error_retry && is_transport_error(&e) => {
                    let delay = self.retry_delay(attempt);
                    attempt += 1;
                    tracing::warn!(
                        attempt,
                        max_retries = self.max_error_retry,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "Transport failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            use_proxy: false,
            proxy_protocol: "http".to_string(),
            proxy_host: String::new(),
            proxy_port: 0,
            connection_timeout_ms: 10_000,
            request_timeout_ms: 30_000,
            max_error_retry: 3,
        }
    }
}

/// Returns true for failures that happened before a response was received.
#[must_use]
pub fn is_transport_error(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_timeout() || error.is_request()
}
