//! Typed errors for the pipeline library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can tell
//! a per-page degradation apart from a fatal per-site failure.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error for a site run.
///
/// Only configuration and storage failures reach this type; fetch and
/// model failures degrade a single page or field and are absorbed by the
/// orchestrator.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Site configuration missing or malformed (fatal for that site only)
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Persistence capability failed
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Page fetch failed outside of per-product isolation (e.g. discovery)
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Model-assisted extraction failed outside of per-field isolation
    #[error("model error: {0}")]
    Model(#[from] ModelError),
}

/// Errors raised by the page fetch capability.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Request exceeded its deadline
    #[error("timeout fetching: {url}")]
    Timeout { url: String },

    /// Non-success HTTP status
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// URL could not be parsed
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    /// URL host is not on the site's allow-list
    #[error("domain not allowed: {url}")]
    DomainNotAllowed { url: String },

    /// Fetcher has no content for this URL
    #[error("page not found: {url}")]
    NotFound { url: String },
}

impl FetchError {
    /// Whether a retry might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Http(_) | FetchError::Timeout { .. } => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Errors raised by the model-assisted extraction capability.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Backend unreachable, misconfigured, or returned an error status
    #[error("model unavailable: {0}")]
    Unavailable(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Call exceeded its deadline
    #[error("model call timed out")]
    Timeout,

    /// Output was not parseable as the expected structure
    #[error("malformed model output: {0}")]
    Malformed(String),

    /// The per-site call ceiling was reached
    #[error("model budget exhausted")]
    BudgetExhausted,
}

/// Errors loading site configuration or rule tables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File is not valid YAML for the expected shape
    #[error("malformed {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Content parsed but failed validation
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors from the persistence capability.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend operation failed
    #[error("backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Stored value could not be (de)serialized
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Referenced record does not exist
    #[error("record not found: {0}")]
    NotFound(String),
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for model operations.
pub type ModelResult<T> = std::result::Result<T, ModelError>;

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type alias for configuration loading.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(FetchError::Timeout { url: "u".into() }.is_transient());
        assert!(FetchError::Status { url: "u".into(), status: 503 }.is_transient());
        assert!(FetchError::Status { url: "u".into(), status: 429 }.is_transient());
        assert!(!FetchError::Status { url: "u".into(), status: 404 }.is_transient());
        assert!(!FetchError::InvalidUrl { url: "u".into() }.is_transient());
    }

    #[test]
    fn test_config_error_wraps_into_pipeline_error() {
        let err: PipelineError = ConfigError::Invalid("no domains".into()).into();
        assert!(err.to_string().contains("no domains"));
    }
}
