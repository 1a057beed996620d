//! HTTP page fetcher.
//!
//! Plain reqwest GET with a browser-like user agent. Transient failures
//! (transport errors, timeouts, 429 and 5xx) are retried a bounded number
//! of times with a linear backoff. JavaScript rendering is out of scope;
//! wrap a rendering backend in its own `PageFetcher` if a site needs it.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{FetchError, FetchResult};
use crate::traits::fetcher::{FetchedPage, PageFetcher};

/// Default user agent. Several storefront platforms reject bot-like agents.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/120.0 Safari/537.36";

/// HTTP fetcher with bounded retries.
///
/// # Example
///
/// ```rust,ignore
/// use inci_pipeline::fetchers::{HttpFetcher, RateLimitedFetcher};
///
/// let fetcher = RateLimitedFetcher::new(HttpFetcher::new()?.with_max_retries(3), 1);
/// ```
pub struct HttpFetcher {
    client: reqwest::Client,
    user_agent: String,
    max_retries: u32,
    retry_backoff: Duration,
}

impl HttpFetcher {
    /// Create a fetcher with a 30s request timeout and two retries.
    pub fn new() -> FetchResult<Self> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> FetchResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| FetchError::Http(Box::new(e)))?;
        Ok(Self::with_client(client))
    }

    /// Use a preconfigured client (proxies, TLS settings, ...).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_retries: 2,
            retry_backoff: Duration::from_millis(500),
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Retries after the first attempt. Zero disables retrying.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Base delay; attempt `n` waits `n * backoff`.
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    async fn fetch_once(&self, url: &str) -> FetchResult<FetchedPage> {
        let response = self
            .client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .header("Accept-Language", "pt-BR,pt;q=0.9,en;q=0.8")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout {
                        url: url.to_string(),
                    }
                } else {
                    FetchError::Http(Box::new(e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        // Final URL after redirects
        let final_url = response.url().to_string();
        let html = response
            .text()
            .await
            .map_err(|e| FetchError::Http(Box::new(e)))?;

        Ok(FetchedPage::from_html(final_url, html))
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<FetchedPage> {
        if url::Url::parse(url).is_err() {
            return Err(FetchError::InvalidUrl {
                url: url.to_string(),
            });
        }

        let mut attempt = 0;
        loop {
            debug!(url = %url, attempt, "HTTP fetch starting");
            match self.fetch_once(url).await {
                Ok(page) => return Ok(page),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(url = %url, attempt, error = %e, "Transient fetch failure, retrying");
                    tokio::time::sleep(self.retry_backoff * attempt).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn name(&self) -> &str {
        "http"
    }
}
