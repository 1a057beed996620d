//! Label engine: quality seals from text, images and ingredient absence.
//!
//! Rules live in a versioned YAML table (`config/labels.yaml`) loaded once
//! into an immutable [`LabelRules`]. Three methods feed one [`LabelResult`]:
//!
//! 1. Keyword scan over product text fields (first match per seal)
//! 2. Keyword scan over image alt/title/filename texts, for seals not
//!    already found in text
//! 3. Inference from a validated ingredient list: a seal is inferred when
//!    none of its prohibited groups occur in any ingredient
//!
//! The engine never guesses. No text, no images and no validated
//! ingredients means no seals.

use std::path::Path;

use indexmap::{IndexMap, IndexSet};
use regex::Regex;
use serde::Deserialize;

use crate::error::{ConfigError, ConfigResult};
use crate::types::evidence::{Evidence, ExtractionMethod};
use crate::types::labels::{confidence, LabelResult, LabelSource};

/// Rule table shipped with the crate.
pub const BUNDLED_RULES: &str = include_str!("../../config/labels.yaml");

/// Locator for seals found in image texts.
pub const IMAGE_LOCATOR: &str = "img_alt_title_filename";

/// Locator for seals inferred from ingredients.
pub const INGREDIENTS_LOCATOR: &str = "inci_ingredients";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleFile {
    version: u32,
    seals: IndexMap<String, Vec<String>>,
    #[serde(default)]
    prohibited: IndexMap<String, GroupFile>,
    #[serde(default)]
    inference: IndexMap<String, Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GroupFile {
    #[serde(default)]
    substrings: Vec<String>,
    #[serde(default)]
    patterns: Vec<String>,
}

#[derive(Debug, Clone)]
struct Keyword {
    text: String,
    pattern: Regex,
}

#[derive(Debug, Clone)]
struct SealRule {
    seal: String,
    keywords: Vec<Keyword>,
}

#[derive(Debug, Clone)]
struct ProhibitedGroup {
    substrings: Vec<String>,
    patterns: Vec<Regex>,
}

impl ProhibitedGroup {
    /// `ingredient` must already be lowercase.
    fn matches(&self, ingredient: &str) -> bool {
        self.substrings.iter().any(|s| ingredient.contains(s.as_str()))
            || self.patterns.iter().any(|p| p.is_match(ingredient))
    }
}

#[derive(Debug, Clone)]
struct InferenceRule {
    seal: String,
    groups: Vec<String>,
}

/// Compiled, immutable seal rules.
#[derive(Debug, Clone)]
pub struct LabelRules {
    version: u32,
    seals: Vec<SealRule>,
    groups: IndexMap<String, ProhibitedGroup>,
    inference: Vec<InferenceRule>,
}

impl LabelRules {
    /// Parse and compile a rule table. Fails fast on malformed data.
    pub fn from_yaml(text: &str, origin: &Path) -> ConfigResult<Self> {
        let file: RuleFile = serde_yaml::from_str(text).map_err(|source| ConfigError::Yaml {
            path: origin.to_path_buf(),
            source,
        })?;
        Self::compile(file)
    }

    pub fn load(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text, path)
    }

    /// The rule table embedded at build time.
    pub fn bundled() -> ConfigResult<Self> {
        Self::from_yaml(BUNDLED_RULES, Path::new("config/labels.yaml"))
    }

    fn compile(file: RuleFile) -> ConfigResult<Self> {
        let mut seals = Vec::with_capacity(file.seals.len());
        for (seal, keywords) in file.seals {
            let keywords = keywords
                .into_iter()
                .map(|kw| kw.trim().to_lowercase())
                .filter(|kw| !kw.is_empty())
                .map(|kw| keyword(&seal, kw))
                .collect::<ConfigResult<Vec<_>>>()?;
            if keywords.is_empty() {
                return Err(ConfigError::Invalid(format!("seal '{}' has no keywords", seal)));
            }
            seals.push(SealRule { seal, keywords });
        }

        let mut groups = IndexMap::new();
        for (name, group) in file.prohibited {
            let patterns = group
                .patterns
                .iter()
                .map(|p| {
                    Regex::new(p).map_err(|e| {
                        ConfigError::Invalid(format!("group '{}': bad pattern '{}': {}", name, p, e))
                    })
                })
                .collect::<ConfigResult<Vec<_>>>()?;
            let substrings: Vec<String> = group
                .substrings
                .into_iter()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect();
            if substrings.is_empty() && patterns.is_empty() {
                return Err(ConfigError::Invalid(format!("group '{}' is empty", name)));
            }
            groups.insert(name, ProhibitedGroup { substrings, patterns });
        }

        let mut inference = Vec::with_capacity(file.inference.len());
        for (seal, required_absent) in file.inference {
            if required_absent.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "inference for '{}' names no groups",
                    seal
                )));
            }
            if let Some(missing) = required_absent.iter().find(|g| !groups.contains_key(*g)) {
                return Err(ConfigError::Invalid(format!(
                    "inference for '{}' names unknown group '{}'",
                    seal, missing
                )));
            }
            inference.push(InferenceRule {
                seal,
                groups: required_absent,
            });
        }

        Ok(Self {
            version: file.version,
            seals,
            groups,
            inference,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Seal names with keyword rules, in table order.
    pub fn seal_names(&self) -> impl Iterator<Item = &str> {
        self.seals.iter().map(|s| s.seal.as_str())
    }

    fn group_present(&self, group: &str, ingredients: &[String]) -> bool {
        self.groups
            .get(group)
            .is_some_and(|g| ingredients.iter().any(|i| g.matches(i)))
    }
}

fn keyword(seal: &str, text: String) -> ConfigResult<Keyword> {
    let pattern = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(&text)))
        .map_err(|e| ConfigError::Invalid(format!("seal '{}': bad keyword '{}': {}", seal, text, e)))?;
    Ok(Keyword { text, pattern })
}

/// Text and ingredients scanned for one product.
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelInput<'a> {
    pub product_name: Option<&'a str>,
    pub description: Option<&'a str>,
    pub benefits: &'a [String],
    pub usage: Option<&'a str>,
    /// Alt/title/filename texts of page images
    pub image_texts: &'a [String],
    /// Validated ingredient list; inference is skipped without one
    pub ingredients: Option<&'a [String]>,
}

/// Seals plus the evidence rows that justify them.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelDetection {
    pub result: LabelResult,
    pub evidence: Vec<Evidence>,
}

/// Applies [`LabelRules`] to products.
#[derive(Debug, Clone)]
pub struct LabelEngine {
    rules: LabelRules,
}

impl LabelEngine {
    pub fn new(rules: LabelRules) -> Self {
        Self { rules }
    }

    pub fn bundled() -> ConfigResult<Self> {
        LabelRules::bundled().map(Self::new)
    }

    pub fn rules(&self) -> &LabelRules {
        &self.rules
    }

    /// Detect seals for the product at `source_url`.
    pub fn detect(&self, source_url: &str, input: &LabelInput<'_>) -> LabelDetection {
        let mut result = LabelResult::default();
        let mut evidence = Vec::new();

        // Text fields, in scan order
        let benefits = input.benefits.join(" ");
        let fields: Vec<(&str, &str)> = [
            ("description", input.description),
            ("product_name", input.product_name),
            ("benefits_claims", (!benefits.is_empty()).then_some(benefits.as_str())),
            ("usage_instructions", input.usage),
        ]
        .into_iter()
        .filter_map(|(name, text)| text.map(|t| (name, t)))
        .collect();

        for rule in &self.rules.seals {
            let hit = fields.iter().find_map(|(field, text)| {
                rule.keywords
                    .iter()
                    .find(|kw| kw.pattern.is_match(text))
                    .map(|kw| (*field, kw))
            });
            if let Some((field, kw)) = hit {
                result.detected.insert(rule.seal.clone());
                result.sources.insert(LabelSource::OfficialText);
                evidence.push(Evidence::new(
                    label_field(&rule.seal),
                    source_url,
                    field,
                    &kw.text,
                    ExtractionMethod::KeywordMatch,
                ));
            }
        }

        for rule in &self.rules.seals {
            if result.detected.contains(&rule.seal) {
                continue;
            }
            let hit = input.image_texts.iter().find_map(|img_text| {
                rule.keywords
                    .iter()
                    .find(|kw| kw.pattern.is_match(img_text))
                    .map(|kw| (img_text, kw))
            });
            if let Some((img_text, kw)) = hit {
                result.detected.insert(rule.seal.clone());
                result.sources.insert(LabelSource::HtmlImgElement);
                let head: String = img_text.chars().take(100).collect();
                evidence.push(Evidence::new(
                    label_field(&rule.seal),
                    source_url,
                    IMAGE_LOCATOR,
                    &format!("{} (in: {})", kw.text, head),
                    ExtractionMethod::ImageElement,
                ));
            }
        }

        let mut corroborated = false;
        if let Some(ingredients) = input.ingredients.filter(|i| !i.is_empty()) {
            let lowered: Vec<String> = ingredients.iter().map(|i| i.to_lowercase()).collect();
            for rule in &self.rules.inference {
                if rule
                    .groups
                    .iter()
                    .any(|g| self.rules.group_present(g, &lowered))
                {
                    continue;
                }
                if result.detected.contains(&rule.seal) {
                    corroborated = true;
                } else {
                    result.inferred.insert(rule.seal.clone());
                }
                result.sources.insert(LabelSource::InciAnalysis);
                evidence.push(Evidence::new(
                    label_field(&rule.seal),
                    source_url,
                    INGREDIENTS_LOCATOR,
                    &format!("no {} found in INCI list", rule.groups.join(" or ")),
                    ExtractionMethod::IngredientInference,
                ));
            }
        }

        result.confidence = score(&result.detected, &result.inferred, corroborated);
        LabelDetection { result, evidence }
    }
}

/// Evidence field name for a seal.
pub fn label_field(seal: &str) -> String {
    format!("label:{}", seal)
}

fn score(detected: &IndexSet<String>, inferred: &IndexSet<String>, corroborated: bool) -> f64 {
    if corroborated {
        confidence::CORROBORATED
    } else if !detected.is_empty() {
        confidence::DETECTED_ONLY
    } else if !inferred.is_empty() {
        confidence::INFERRED_ONLY
    } else {
        confidence::NONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://www.amend.com.br/shampoo-gold";

    fn engine() -> LabelEngine {
        LabelEngine::bundled().unwrap()
    }

    fn terms(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn detect_text(description: &str) -> LabelDetection {
        engine().detect(
            URL,
            &LabelInput {
                description: Some(description),
                ..Default::default()
            },
        )
    }

    fn detect_inci(items: &[&str]) -> LabelResult {
        let ingredients = terms(items);
        engine()
            .detect(
                URL,
                &LabelInput {
                    ingredients: Some(&ingredients),
                    ..Default::default()
                },
            )
            .result
    }

    #[test]
    fn test_bundled_rules_compile() {
        let rules = LabelRules::bundled().unwrap();
        assert_eq!(rules.version(), 1);
        assert!(rules.seal_names().any(|s| s == "sulfate_free"));
    }

    #[test]
    fn test_keyword_detection_with_evidence() {
        let detection = detect_text("Fórmula sem sulfato para cabelos cacheados");
        assert!(detection.result.detected.contains("sulfate_free"));
        assert!(detection.result.sources.contains(&LabelSource::OfficialText));
        assert_eq!(detection.result.confidence, 0.8);

        let row = &detection.evidence[0];
        assert_eq!(row.field(), "label:sulfate_free");
        assert_eq!(row.locator(), "description");
        assert_eq!(row.raw_snippet(), "sem sulfato");
        assert_eq!(row.method(), ExtractionMethod::KeywordMatch);
    }

    #[test]
    fn test_keywords_respect_word_boundaries() {
        let result = detect_text("The organics line features supernatural cleaning, join veganuary").result;
        assert!(result.detected.is_empty());
        assert_eq!(result.confidence, 0.0);

        let result = detect_text("This product is SULFATE FREE and VEGAN").result;
        assert!(result.detected.contains("sulfate_free"));
        assert!(result.detected.contains("vegan"));
    }

    #[test]
    fn test_image_texts_detect_without_duplicates() {
        let images = terms(&["selo cruelty free certificado", "selo vegan"]);
        let detection = engine().detect(
            URL,
            &LabelInput {
                description: Some("This is a vegan product"),
                image_texts: &images,
                ..Default::default()
            },
        );
        assert!(detection.result.detected.contains("cruelty_free"));
        assert!(detection.result.sources.contains(&LabelSource::HtmlImgElement));

        let vegan_rows = detection
            .evidence
            .iter()
            .filter(|e| e.field() == "label:vegan")
            .count();
        assert_eq!(vegan_rows, 1);

        let image_row = detection
            .evidence
            .iter()
            .find(|e| e.field() == "label:cruelty_free")
            .unwrap();
        assert_eq!(image_row.locator(), IMAGE_LOCATOR);
        assert_eq!(image_row.raw_snippet(), "cruelty free (in: selo cruelty free certificado)");
    }

    #[test]
    fn test_silicone_inference() {
        let result = detect_inci(&["Aqua", "Glycerin", "Cetearyl Alcohol", "Parfum"]);
        assert!(result.inferred.contains("silicone_free"));
        assert!(result.inferred.contains("no_poo"));
        assert!(result.sources.contains(&LabelSource::InciAnalysis));
        assert_eq!(result.confidence, 0.5);

        let result = detect_inci(&["Aqua", "Glycerin", "Dimethicone", "Parfum"]);
        assert!(!result.inferred.contains("silicone_free"));
        assert!(!result.inferred.contains("no_poo"));
    }

    #[test]
    fn test_sulfate_and_surfactant_inference() {
        let result = detect_inci(&["Aqua", "Cocamidopropyl Betaine", "Glycerin"]);
        assert!(result.inferred.contains("low_poo"));
        assert!(result.inferred.contains("sulfate_free"));
        assert!(!result.inferred.contains("no_poo"));

        let result = detect_inci(&["Aqua", "Sodium Laureth Sulfate", "Glycerin"]);
        assert!(!result.inferred.contains("low_poo"));
        assert!(!result.inferred.contains("sulfate_free"));
    }

    #[test]
    fn test_extended_inference() {
        let result = detect_inci(&["Aqua", "Glycerin", "CI 19140", "Methylparaben", "Mineral Oil"]);
        assert!(!result.inferred.contains("dye_free"));
        assert!(!result.inferred.contains("paraben_free"));
        assert!(!result.inferred.contains("petrolatum_free"));

        let result = detect_inci(&["Aqua", "FD&C Yellow No. 5"]);
        assert!(!result.inferred.contains("dye_free"));

        let result = detect_inci(&["Aqua", "Glycerin", "Cetearyl Alcohol"]);
        for seal in ["dye_free", "paraben_free", "petrolatum_free"] {
            assert!(result.inferred.contains(seal), "{} not inferred", seal);
        }
    }

    #[test]
    fn test_no_inference_without_ingredients() {
        let result = detect_text("A great shampoo").result;
        assert!(result.inferred.is_empty());
        assert!(result.is_empty());
    }

    #[test]
    fn test_corroborated_seal_scores_highest() {
        let ingredients = terms(&["Aqua", "Glycerin", "Cetearyl Alcohol", "Parfum"]);
        let detection = engine().detect(
            URL,
            &LabelInput {
                description: Some("Shampoo sem sulfato"),
                ingredients: Some(&ingredients),
                ..Default::default()
            },
        );
        let result = &detection.result;
        assert_eq!(result.confidence, 0.9);
        // Detected seals are not repeated as inferred
        assert!(result.detected.contains("sulfate_free"));
        assert!(!result.inferred.contains("sulfate_free"));
        assert!(result.inferred.contains("silicone_free"));
    }

    #[test]
    fn test_uncorroborated_detection_with_inference_scores_detected() {
        let ingredients = terms(&["Aqua", "Sodium Laureth Sulfate", "Glycerin", "Parfum"]);
        let detection = engine().detect(
            URL,
            &LabelInput {
                description: Some("Shampoo vegano"),
                ingredients: Some(&ingredients),
                ..Default::default()
            },
        );
        assert!(detection.result.inferred.contains("silicone_free"));
        assert_eq!(detection.result.confidence, 0.8);
    }

    #[test]
    fn test_loader_fails_fast() {
        let bad_group = "version: 1\nseals:\n  vegan: [vegan]\ninference:\n  no_poo: [missing]\n";
        let err = LabelRules::from_yaml(bad_group, Path::new("x.yaml")).unwrap_err();
        assert!(err.to_string().contains("unknown group"));

        let empty_seal = "version: 1\nseals:\n  vegan: []\n";
        assert!(LabelRules::from_yaml(empty_seal, Path::new("x.yaml")).is_err());

        let bad_pattern =
            "version: 1\nseals:\n  a: [a]\nprohibited:\n  g:\n    patterns: ['(']\n";
        assert!(matches!(
            LabelRules::from_yaml(bad_pattern, Path::new("x.yaml")),
            Err(ConfigError::Invalid(_))
        ));

        assert!(matches!(
            LabelRules::from_yaml("seals: [", Path::new("x.yaml")),
            Err(ConfigError::Yaml { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.yaml");
        std::fs::write(&path, "version: 2\nseals:\n  vegan: [Vegano]\n").unwrap();

        let engine = LabelEngine::new(LabelRules::load(&path).unwrap());
        assert_eq!(engine.rules().version(), 2);
        let result = engine
            .detect(
                URL,
                &LabelInput {
                    product_name: Some("Máscara VEGANO"),
                    ..Default::default()
                },
            )
            .result;
        assert!(result.detected.contains("vegan"));
    }
}
