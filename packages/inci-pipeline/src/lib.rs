//! Hair Product INCI Pipeline
//!
//! Per-site product discovery and extraction with a quality gate that only
//! publishes ingredient lists it can trust, plus quality-seal detection and
//! inference from the verified lists.
//!
//! # Design Philosophy
//!
//! **"Evidence or nothing"**
//!
//! - Every extracted value carries a provenance record
//! - Deterministic extraction first, model-assisted only for gaps
//! - Model output must be grounded in the literal page text
//! - A bad product degrades to a tier, never aborts the site
//! - A bad site stops itself before burning the model budget
//!
//! # Usage
//!
//! ```rust,ignore
//! use inci_pipeline::{CoverageEngine, HttpFetcher, LabelEngine, MemoryStore, SiteConfig};
//! use inci_pipeline::fetchers::FetcherExt;
//!
//! let site = SiteConfig::load("config/sites".as_ref(), "amend")?;
//! let engine = CoverageEngine::new(
//!     HttpFetcher::new()?.rate_limited(1),
//!     MemoryStore::new(),
//!     LabelEngine::bundled()?,
//! );
//!
//! let coverage = engine.run_site(&site).await?;
//! println!("{} verified of {}", coverage.verified_inci_total, coverage.extracted_total);
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Capability seams (PageFetcher, ModelExtractor, ProductStore)
//! - [`types`] - Records, evidence, tiers, labels, coverage and config
//! - [`pipeline`] - Classifier, extractor, validator, gate, labels, orchestrator
//! - [`fetchers`] - Fetcher implementations (HttpFetcher, RateLimitedFetcher)
//! - [`stores`] - Storage implementations (MemoryStore, SqliteStore)
//! - [`testing`] - Mock implementations and fixture builders for tests

pub mod error;
pub mod fetchers;
pub mod pipeline;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

#[cfg(feature = "openai")]
pub mod ai;

// Re-export core types at crate root
pub use error::{ConfigError, FetchError, ModelError, PipelineError, Result, StoreError};
pub use traits::{
    fetcher::{FetchedPage, PageFetcher},
    model::{FieldSpec, ModelExtractor, ModelFields, ModelResponse, NoModel},
    store::ProductStore,
};
pub use types::{
    config::PipelineConfig,
    coverage::{BudgetSummary, CoverageReport, CoverageStatus, SiteCoverage},
    evidence::{Evidence, ExtractionMethod},
    labels::{LabelResult, LabelSource},
    product::{
        canonical_url, DiscoveredUrl, DiscoverySource, Field, GenderTarget, ProductRecord,
        RawExtraction, StoredProduct, UrlKind,
    },
    quality::{
        IngredientValidationResult, QaCheck, QaResult, QuarantineDetail, Rejection,
        ReviewStatus, Tier,
    },
    site::{DiscoveryConfig, SelectorConfig, Site, SiteConfig, SiteStatus},
};

// Re-export pipeline components
pub use pipeline::{
    classify_url, validate_ingredient_text, validate_ingredients, AuditReport, BudgetTracker,
    CoverageEngine, Discoverer, Extractor, GateInput, GateOutcome, IngredientValidator,
    LabelEngine, LabelInput, LabelRules, LabelUpdate, QualityGate, TierChange, UrlClassifier,
};

// Re-export fetchers and stores
pub use fetchers::{HttpFetcher, MockFetcher, RateLimitedFetcher};
pub use stores::MemoryStore;

#[cfg(feature = "sqlite")]
pub use stores::SqliteStore;

#[cfg(feature = "openai")]
pub use ai::OpenAiExtractor;
