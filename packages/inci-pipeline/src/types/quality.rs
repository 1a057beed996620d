//! Validation and quality-gate result types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Trust tier assigned by the quality gate. Recomputed every run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    CatalogOnly,
    VerifiedInci,
    Quarantined,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CatalogOnly => "catalog_only",
            Self::VerifiedInci => "verified_inci",
            Self::Quarantined => "quarantined",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "catalog_only" => Some(Self::CatalogOnly),
            "verified_inci" => Some(Self::VerifiedInci),
            "quarantined" => Some(Self::Quarantined),
            _ => None,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an ingredient list was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// Nothing was captured
    NoText,
    /// Cut and garbage stripping left nothing
    EmptyAfterCleaning,
    /// Two lists glued together from a multi-product page
    ConcatDetected,
    /// The same block scraped twice
    RepetitionDetected,
    /// Fewer surviving terms than required
    MinIngredients(usize),
}

impl Rejection {
    /// Machine-parseable reason, used verbatim in QA results and quarantine.
    pub fn reason(&self) -> String {
        match self {
            Self::NoText => "no_inci_text".to_string(),
            Self::EmptyAfterCleaning => "empty_after_cleaning".to_string(),
            Self::ConcatDetected => "concat_detected".to_string(),
            Self::RepetitionDetected => "repetition_detected".to_string(),
            Self::MinIngredients(n) => format!("min_ingredients:{}", n),
        }
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.reason())
    }
}

/// Output of the ingredient validator. Pure, not persisted directly.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IngredientValidationResult {
    pub valid: bool,
    pub cleaned: Vec<String>,
    pub removed: Vec<String>,
    pub rejection: Option<Rejection>,
}

impl IngredientValidationResult {
    pub fn accepted(cleaned: Vec<String>, removed: Vec<String>) -> Self {
        Self {
            valid: true,
            cleaned,
            removed,
            rejection: None,
        }
    }

    pub fn rejected(rejection: Rejection) -> Self {
        Self {
            valid: false,
            rejection: Some(rejection),
            ..Default::default()
        }
    }

    pub fn rejection_reason(&self) -> Option<String> {
        self.rejection.as_ref().map(Rejection::reason)
    }
}

/// Individual checks recorded by the quality gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QaCheck {
    NameValid,
    NameMissing,
    NameGarbage,
    DomainValid,
    DomainUnofficial,
    HasImage,
    NoImage,
    HairRelevant,
    NoHairRelevance,
    InciValid,
    InciInvalid,
    ConfidenceOk,
    LowConfidence,
}

impl QaCheck {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NameValid => "name_valid",
            Self::NameMissing => "name_missing",
            Self::NameGarbage => "name_garbage",
            Self::DomainValid => "domain_valid",
            Self::DomainUnofficial => "domain_unofficial",
            Self::HasImage => "has_image",
            Self::NoImage => "no_image",
            Self::HairRelevant => "hair_relevant",
            Self::NoHairRelevance => "no_hair_relevance",
            Self::InciValid => "inci_valid",
            Self::InciInvalid => "inci_invalid",
            Self::ConfidenceOk => "confidence_ok",
            Self::LowConfidence => "low_confidence",
        }
    }
}

/// Quality gate verdict for one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaResult {
    pub tier: Tier,
    pub passed: bool,
    pub checks_passed: Vec<QaCheck>,
    pub checks_failed: Vec<QaCheck>,
    pub rejection_reason: Option<String>,
}

impl QaResult {
    /// Code of the first failing check, if any.
    pub fn rejection_code(&self) -> Option<&'static str> {
        self.checks_failed.first().map(QaCheck::as_str)
    }
}

/// Manual review state of a quarantined product. Driven externally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

/// One-to-one with a quarantined product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarantineDetail {
    pub canonical_url: String,
    pub site_slug: String,
    pub rejection_code: String,
    pub rejection_reason: String,
    pub review_status: ReviewStatus,
    pub created_at: DateTime<Utc>,
}

impl QuarantineDetail {
    /// Build the initial (pending) detail from a failed QA result.
    pub fn from_qa(site_slug: &str, canonical_url: &str, qa: &QaResult) -> Self {
        Self {
            canonical_url: canonical_url.to_string(),
            site_slug: site_slug.to_string(),
            rejection_code: qa.rejection_code().unwrap_or("unknown").to_string(),
            rejection_reason: qa.rejection_reason.clone().unwrap_or_default(),
            review_status: ReviewStatus::Pending,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_reasons_are_machine_parseable() {
        assert_eq!(Rejection::ConcatDetected.reason(), "concat_detected");
        assert_eq!(Rejection::RepetitionDetected.reason(), "repetition_detected");
        assert_eq!(Rejection::MinIngredients(2).reason(), "min_ingredients:2");
    }

    #[test]
    fn test_tier_round_trip_str() {
        for tier in [Tier::CatalogOnly, Tier::VerifiedInci, Tier::Quarantined] {
            assert_eq!(Tier::parse(tier.as_str()), Some(tier));
        }
        assert_eq!(Tier::parse("bogus"), None);
    }

    #[test]
    fn test_quarantine_detail_from_qa() {
        let qa = QaResult {
            tier: Tier::Quarantined,
            passed: false,
            checks_passed: vec![QaCheck::NameValid],
            checks_failed: vec![QaCheck::InciInvalid],
            rejection_reason: Some("concat_detected".into()),
        };
        let detail = QuarantineDetail::from_qa("amend", "https://a.com/p", &qa);
        assert_eq!(detail.rejection_code, "inci_invalid");
        assert_eq!(detail.rejection_reason, "concat_detected");
        assert_eq!(detail.review_status, ReviewStatus::Pending);
    }
}
