//! Quality gate: assigns a trust tier to one product.
//!
//! A pure function of the product's fields, the site's allowed domains and
//! the pipeline config. It runs on fresh extractions and on stored records
//! (audit) alike, so it takes a borrowed [`GateInput`] view.

use crate::pipeline::inci::IngredientValidator;
use crate::types::config::PipelineConfig;
use crate::types::product::{ProductRecord, RawExtraction};
use crate::types::quality::{IngredientValidationResult, QaCheck, QaResult, Tier};
use crate::types::site::host_matches;

/// Names that indicate an error or placeholder page rather than a product.
const GARBAGE_NAMES: &[&str] = &[
    "404",
    "não encontrado",
    "não encontrada",
    "página não encontrada",
    "page not found",
    "produto indisponível",
    "product unavailable",
    "error",
    "erro",
];

/// Rejection reason for products below the confidence threshold.
pub const LOW_CONFIDENCE: &str = "low_confidence";

/// The fields the gate looks at.
#[derive(Debug, Clone, Copy, Default)]
pub struct GateInput<'a> {
    pub canonical_url: &'a str,
    pub product_name: Option<&'a str>,
    pub image_url: Option<&'a str>,
    pub hair_relevance_reason: Option<&'a str>,
    /// Raw ingredient text, before validation
    pub ingredients_text: Option<&'a str>,
    pub confidence: f64,
}

impl<'a> GateInput<'a> {
    /// View a fresh extraction. Hair relevance is computed by the caller.
    pub fn from_raw(raw: &'a RawExtraction, hair_relevance_reason: Option<&'a str>) -> Self {
        Self {
            canonical_url: &raw.url,
            product_name: raw.name(),
            image_url: raw.image_url(),
            hair_relevance_reason,
            ingredients_text: raw.ingredients_text(),
            confidence: raw.confidence(),
        }
    }

    /// View a stored record, replaying its raw ingredient text.
    pub fn from_record(record: &'a ProductRecord) -> Self {
        Self {
            canonical_url: &record.canonical_url,
            product_name: record.product_name.as_deref(),
            image_url: record.image_url_main.as_deref(),
            hair_relevance_reason: record.hair_relevance_reason.as_deref(),
            ingredients_text: record.ingredients_raw.as_deref(),
            confidence: record.confidence,
        }
    }
}

/// Gate verdict plus the validator output, when ingredients were validated.
#[derive(Debug, Clone, PartialEq)]
pub struct GateOutcome {
    pub qa: QaResult,
    pub validation: Option<IngredientValidationResult>,
}

impl GateOutcome {
    pub fn tier(&self) -> Tier {
        self.qa.tier
    }

    /// Cleaned ingredients, only when the product reached `verified_inci`.
    pub fn verified_ingredients(&self) -> Option<&[String]> {
        match (&self.qa.tier, &self.validation) {
            (Tier::VerifiedInci, Some(v)) => Some(&v.cleaned),
            _ => None,
        }
    }
}

/// Quality gate for one site.
#[derive(Debug, Clone)]
pub struct QualityGate {
    allowed_domains: Vec<String>,
    min_confidence: f64,
    validator: IngredientValidator,
}

impl QualityGate {
    pub fn new(allowed_domains: &[String], config: &PipelineConfig) -> Self {
        Self {
            allowed_domains: allowed_domains.to_vec(),
            min_confidence: config.min_confidence,
            validator: IngredientValidator::new(config.min_ingredients),
        }
    }

    pub fn evaluate(&self, input: &GateInput<'_>) -> GateOutcome {
        let mut passed = Vec::new();
        let mut failed = Vec::new();

        match input.product_name.map(str::trim).filter(|n| !n.is_empty()) {
            None => failed.push(QaCheck::NameMissing),
            Some(name) if is_garbage_name(name) => failed.push(QaCheck::NameGarbage),
            Some(_) => passed.push(QaCheck::NameValid),
        }

        if self.domain_allowed(input.canonical_url) {
            passed.push(QaCheck::DomainValid);
        } else {
            failed.push(QaCheck::DomainUnofficial);
        }

        if input.image_url.is_some_and(|u| !u.trim().is_empty()) {
            passed.push(QaCheck::HasImage);
        } else {
            failed.push(QaCheck::NoImage);
        }

        if input.hair_relevance_reason.is_some_and(|r| !r.trim().is_empty()) {
            passed.push(QaCheck::HairRelevant);
        } else {
            failed.push(QaCheck::NoHairRelevance);
        }

        if !failed.is_empty() {
            let reason = failed
                .iter()
                .map(QaCheck::as_str)
                .collect::<Vec<_>>()
                .join("; ");
            return GateOutcome {
                qa: verdict(Tier::Quarantined, passed, failed, Some(reason)),
                validation: None,
            };
        }

        let Some(text) = input.ingredients_text.filter(|t| !t.trim().is_empty()) else {
            return GateOutcome {
                qa: verdict(Tier::CatalogOnly, passed, failed, None),
                validation: None,
            };
        };

        let validation = self.validator.validate_text(text);
        if !validation.valid {
            failed.push(QaCheck::InciInvalid);
            let reason = validation.rejection_reason();
            return GateOutcome {
                qa: verdict(Tier::Quarantined, passed, failed, reason),
                validation: Some(validation),
            };
        }
        passed.push(QaCheck::InciValid);

        if input.confidence < self.min_confidence {
            failed.push(QaCheck::LowConfidence);
            return GateOutcome {
                qa: verdict(Tier::Quarantined, passed, failed, Some(LOW_CONFIDENCE.to_string())),
                validation: Some(validation),
            };
        }
        passed.push(QaCheck::ConfidenceOk);

        GateOutcome {
            qa: verdict(Tier::VerifiedInci, passed, failed, None),
            validation: Some(validation),
        }
    }

    fn domain_allowed(&self, url: &str) -> bool {
        url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_lowercase))
            .is_some_and(|host| host_matches(&host, &self.allowed_domains))
    }
}

fn verdict(
    tier: Tier,
    checks_passed: Vec<QaCheck>,
    checks_failed: Vec<QaCheck>,
    rejection_reason: Option<String>,
) -> QaResult {
    QaResult {
        tier,
        passed: tier != Tier::Quarantined,
        checks_passed,
        checks_failed,
        rejection_reason,
    }
}

fn is_garbage_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    GARBAGE_NAMES.iter().any(|g| lower.contains(g))
}
