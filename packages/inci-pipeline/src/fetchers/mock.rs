//! Mock fetcher for testing.
//!
//! Serves canned HTML by URL and records every fetch so tests can assert
//! which pages were (and were not) requested.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::error::{FetchError, FetchResult};
use crate::traits::fetcher::{FetchedPage, PageFetcher};

/// Mock page fetcher.
///
/// # Example
///
/// ```rust
/// use inci_pipeline::fetchers::MockFetcher;
///
/// let fetcher = MockFetcher::new()
///     .with_page("https://amend.com.br/shampoo-gold", "<h1>Shampoo Gold</h1>")
///     .with_failure("https://amend.com.br/broken");
/// assert_eq!(fetcher.fetch_count(), 0);
/// ```
#[derive(Default, Clone)]
pub struct MockFetcher {
    /// Canned HTML indexed by URL
    pages: Arc<RwLock<HashMap<String, String>>>,
    /// URLs that fail with a transient error
    failing: Arc<RwLock<HashSet<String>>>,
    /// Every URL passed to fetch, in order
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `html` for `url`.
    pub fn add_page(&self, url: impl Into<String>, html: impl Into<String>) {
        self.pages.write().unwrap().insert(url.into(), html.into());
    }

    /// Make `url` fail with a timeout.
    pub fn add_failure(&self, url: impl Into<String>) {
        self.failing.write().unwrap().insert(url.into());
    }

    pub fn with_page(self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.add_page(url, html);
        self
    }

    pub fn with_failure(self, url: impl Into<String>) -> Self {
        self.add_failure(url);
        self
    }

    /// Number of fetch calls made.
    pub fn fetch_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }

    /// URLs requested, in call order.
    pub fn fetched_urls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }

    pub fn was_fetched(&self, url: &str) -> bool {
        self.calls.read().unwrap().iter().any(|u| u == url)
    }

    /// Clear recorded calls, keeping pages.
    pub fn reset_calls(&self) {
        self.calls.write().unwrap().clear();
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<FetchedPage> {
        self.calls.write().unwrap().push(url.to_string());

        if self.failing.read().unwrap().contains(url) {
            return Err(FetchError::Timeout {
                url: url.to_string(),
            });
        }

        let html = self.pages.read().unwrap().get(url).cloned();
        match html {
            Some(html) => Ok(FetchedPage::from_html(url, html)),
            None => Err(FetchError::NotFound {
                url: url.to_string(),
            }),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_serves_pages_and_records_calls() {
        let fetcher = MockFetcher::new()
            .with_page("https://x.com/a", "<p>A</p>")
            .with_failure("https://x.com/b");

        let page = fetcher.fetch("https://x.com/a").await.unwrap();
        assert_eq!(page.text, "A");

        let err = fetcher.fetch("https://x.com/b").await.unwrap_err();
        assert!(err.is_transient());

        let err = fetcher.fetch("https://x.com/c").await.unwrap_err();
        assert!(matches!(err, FetchError::NotFound { .. }));

        assert_eq!(fetcher.fetch_count(), 3);
        assert!(fetcher.was_fetched("https://x.com/b"));
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let fetcher = MockFetcher::new();
        let clone = fetcher.clone();
        clone.add_page("https://x.com/a", "<p>A</p>");
        fetcher.fetch("https://x.com/a").await.unwrap();
        assert_eq!(clone.fetch_count(), 1);
    }
}
