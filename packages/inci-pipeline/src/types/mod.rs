//! Domain types shared by every pipeline stage.

pub mod config;
pub mod coverage;
pub mod evidence;
pub mod labels;
pub mod product;
pub mod quality;
pub mod site;

pub use config::PipelineConfig;
pub use coverage::{BudgetSummary, CoverageReport, CoverageStatus, SiteCoverage};
pub use evidence::{Evidence, ExtractionMethod};
pub use labels::{LabelResult, LabelSource};
pub use product::{
    canonical_url, DiscoveredUrl, DiscoverySource, Field, FieldValue, GenderTarget,
    ProductRecord, RawExtraction, StoredProduct, UrlKind,
};
pub use quality::{
    IngredientValidationResult, QaCheck, QaResult, QuarantineDetail, Rejection, ReviewStatus,
    Tier,
};
pub use site::{DiscoveryConfig, SelectorConfig, Site, SiteConfig, SiteStatus};
