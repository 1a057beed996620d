//! Page fetch capability.
//!
//! The pipeline only needs "give me HTML and plain text for a URL".
//! Browser automation, proxies and retries live behind this trait.
//!
//! # Usage
//!
//! ```rust,ignore
//! use inci_pipeline::{HttpFetcher, RateLimitedFetcher, PageFetcher};
//!
//! let fetcher = RateLimitedFetcher::new(HttpFetcher::new()?, 1);
//! let page = fetcher.fetch("https://example.com/shampoo-x").await?;
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FetchResult;
use crate::pipeline::markup;

/// A fetched page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: String,

    /// Raw HTML
    pub html: String,

    /// Visible text (scripts/styles/navigation removed)
    pub text: String,

    /// When the content was fetched
    pub fetched_at: DateTime<Utc>,
}

impl FetchedPage {
    /// Build a page from HTML, deriving the visible text.
    pub fn from_html(url: impl Into<String>, html: impl Into<String>) -> Self {
        let html = html.into();
        let text = markup::page_text(&html);
        Self {
            url: url.into(),
            html,
            text,
            fetched_at: Utc::now(),
        }
    }

    /// Check if this page has any visible text.
    pub fn has_content(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// Fetch capability for a single URL.
///
/// Implementations:
/// - `HttpFetcher` - reqwest with bounded retries and timeout
/// - `RateLimitedFetcher` - politeness delay around any fetcher
/// - `MockFetcher` - canned pages for tests
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch one URL. Failures are per-page; the caller decides to skip.
    async fn fetch(&self, url: &str) -> FetchResult<FetchedPage>;

    /// Get the fetcher name (for logging/debugging).
    fn name(&self) -> &str {
        "unknown"
    }
}

#[async_trait]
impl<F: PageFetcher + ?Sized> PageFetcher for std::sync::Arc<F> {
    async fn fetch(&self, url: &str) -> FetchResult<FetchedPage> {
        (**self).fetch(url).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
