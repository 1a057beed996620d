//! Product-level types: discovered URLs, raw extractions, persisted records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::evidence::{Evidence, ExtractionMethod};
use crate::types::labels::LabelResult;
use crate::types::quality::Tier;

/// Classification tag for a candidate URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlKind {
    Product,
    Category,
    Kit,
    NonHair,
    Other,
}

impl UrlKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Category => "category",
            Self::Kit => "kit",
            Self::NonHair => "non_hair",
            Self::Other => "other",
        }
    }
}

/// Where a candidate URL came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoverySource {
    Sitemap,
    Crawl,
    Provided,
}

/// A candidate URL for one run. Not persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredUrl {
    pub url: String,
    pub source: DiscoverySource,
    pub kind: UrlKind,
    pub is_kit: bool,
}

impl DiscoveredUrl {
    pub fn new(url: impl Into<String>, source: DiscoverySource, kind: UrlKind) -> Self {
        Self {
            url: url.into(),
            source,
            kind,
            is_kit: kind == UrlKind::Kit,
        }
    }
}

/// Fields the extractor knows how to fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    ProductName,
    Ingredients,
    ImageUrl,
    Description,
    Price,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::ProductName,
        Field::Ingredients,
        Field::ImageUrl,
        Field::Description,
        Field::Price,
    ];

    /// Name used in evidence rows and model field specs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProductName => "product_name",
            Self::Ingredients => "inci_ingredients",
            Self::ImageUrl => "image_url_main",
            Self::Description => "description",
            Self::Price => "price",
        }
    }
}

/// A filled field with how and where it was found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValue<T> {
    pub value: T,
    pub method: ExtractionMethod,
    pub locator: String,
}

impl<T> FieldValue<T> {
    pub fn new(value: T, method: ExtractionMethod, locator: impl Into<String>) -> Self {
        Self {
            value,
            method,
            locator: locator.into(),
        }
    }
}

/// Transient per-page output of the extractor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawExtraction {
    /// Canonical URL of the page
    pub url: String,
    pub name: Option<FieldValue<String>>,
    /// Raw ingredient text, before validation
    pub ingredients: Option<FieldValue<String>>,
    pub image_url: Option<FieldValue<String>>,
    pub description: Option<FieldValue<String>>,
    pub price: Option<FieldValue<f64>>,
    pub currency: Option<String>,
    pub brand: Option<String>,
    /// Secondary images (gallery)
    #[serde(default)]
    pub gallery: Vec<String>,
    /// Alt/title/filename texts of page images, for seal scanning
    #[serde(default)]
    pub image_texts: Vec<String>,
    /// Provenance for every populated field
    #[serde(default)]
    pub evidence: Vec<Evidence>,
    /// Tier 2 calls made for this page
    #[serde(default)]
    pub model_calls: u32,
    /// Fields left empty because the budget denied a Tier 2 call
    #[serde(default)]
    pub budget_denied: Vec<Field>,
}

impl RawExtraction {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn is_filled(&self, field: Field) -> bool {
        match field {
            Field::ProductName => self.name.is_some(),
            Field::Ingredients => self.ingredients.is_some(),
            Field::ImageUrl => self.image_url.is_some(),
            Field::Description => self.description.is_some(),
            Field::Price => self.price.is_some(),
        }
    }

    /// Fields still empty.
    pub fn missing_fields(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|f| !self.is_filled(*f))
            .collect()
    }

    pub fn method_of(&self, field: Field) -> Option<ExtractionMethod> {
        match field {
            Field::ProductName => self.name.as_ref().map(|v| v.method),
            Field::Ingredients => self.ingredients.as_ref().map(|v| v.method),
            Field::ImageUrl => self.image_url.as_ref().map(|v| v.method),
            Field::Description => self.description.as_ref().map(|v| v.method),
            Field::Price => self.price.as_ref().map(|v| v.method),
        }
    }

    /// Confidence of the extraction, driven by how the ingredients were found.
    pub fn confidence(&self) -> f64 {
        self.method_of(Field::Ingredients)
            .map(|m| m.confidence())
            .unwrap_or(0.0)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_ref().map(|v| v.value.as_str())
    }

    pub fn ingredients_text(&self) -> Option<&str> {
        self.ingredients.as_ref().map(|v| v.value.as_str())
    }

    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_ref().map(|v| v.value.as_str())
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_ref().map(|v| v.value.as_str())
    }
}

/// Audience a product targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenderTarget {
    Men,
    Women,
    Unisex,
    Kids,
    #[default]
    Unknown,
}

/// The persisted product. Identity is the canonical URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub site_slug: String,
    pub canonical_url: String,
    pub product_name: Option<String>,
    pub brand: Option<String>,
    pub image_url_main: Option<String>,
    #[serde(default)]
    pub image_urls_gallery: Vec<String>,
    pub description: Option<String>,
    /// Image alt/title/filename texts, kept for seal rescans
    #[serde(default)]
    pub image_texts: Vec<String>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub product_type: Option<String>,
    #[serde(default)]
    pub gender_target: GenderTarget,
    /// Why this product is considered hair-relevant
    pub hair_relevance_reason: Option<String>,
    /// Raw ingredient text as captured, kept so the gate can be replayed
    pub ingredients_raw: Option<String>,
    /// Cleaned ingredient list; only set when validation passed
    pub ingredients: Option<Vec<String>>,
    /// Method that produced the ingredient text
    pub ingredients_method: Option<ExtractionMethod>,
    pub tier: Tier,
    pub labels: LabelResult,
    pub confidence: f64,
    pub extracted_at: DateTime<Utc>,
}

impl ProductRecord {
    pub fn new(site_slug: impl Into<String>, canonical_url: impl Into<String>) -> Self {
        Self {
            site_slug: site_slug.into(),
            canonical_url: canonical_url.into(),
            product_name: None,
            brand: None,
            image_url_main: None,
            image_urls_gallery: Vec::new(),
            description: None,
            image_texts: Vec::new(),
            price: None,
            currency: None,
            product_type: None,
            gender_target: GenderTarget::Unknown,
            hair_relevance_reason: None,
            ingredients_raw: None,
            ingredients: None,
            ingredients_method: None,
            tier: Tier::CatalogOnly,
            labels: LabelResult::default(),
            confidence: 0.0,
            extracted_at: Utc::now(),
        }
    }
}

/// A record as returned by the store, with identity and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredProduct {
    pub id: String,
    pub record: ProductRecord,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Query parameters that never change which page a URL points to.
const TRACKING_PARAMS: &[&str] = &["gclid", "fbclid", "srsltid", "mc_cid", "mc_eid", "ref"];

fn is_tracking_param(name: &str) -> bool {
    let name = name.to_lowercase();
    name.starts_with("utm_") || TRACKING_PARAMS.contains(&name.as_str())
}

/// Normalize a product URL into its deduplication key.
///
/// Drops the fragment and tracking parameters (`utm_*`, click ids), keeps
/// every other query parameter in order, lowercases scheme/host and trims a
/// trailing slash on non-root paths. Unparseable input is returned trimmed.
pub fn canonical_url(raw: &str) -> String {
    let Ok(mut url) = url::Url::parse(raw.trim()) else {
        return raw.trim().to_string();
    };
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(name, _)| !is_tracking_param(name))
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();
    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(&kept);
    }
    url.set_fragment(None);
    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(path.trim_end_matches('/'));
    }
    url.to_string()
}
