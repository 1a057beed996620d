//! Page fetcher implementations.
//!
//! # Available Fetchers
//!
//! - `HttpFetcher` - reqwest GET with bounded retries
//! - `RateLimitedFetcher` - politeness limit around any fetcher
//! - `MockFetcher` - canned pages, for testing
//!
//! # Example
//!
//! ```rust,ignore
//! use inci_pipeline::fetchers::{FetcherExt, HttpFetcher};
//!
//! let fetcher = HttpFetcher::new()?.rate_limited(1);
//! let page = fetcher.fetch("https://www.amend.com.br/shampoo-gold-black").await?;
//! ```

mod http;
mod mock;
mod rate_limited;

pub use http::{HttpFetcher, DEFAULT_USER_AGENT};
pub use mock::MockFetcher;
pub use rate_limited::{FetcherExt, RateLimitedFetcher};

pub use crate::traits::fetcher::{FetchedPage, PageFetcher};
