//! Provenance records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum characters kept from the raw source text.
pub const MAX_SNIPPET_CHARS: usize = 2000;

/// How a value was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionMethod {
    /// Embedded JSON-LD product markup
    StructuredMarkup,
    /// Configured CSS selector or label heuristic on static HTML
    Selector,
    /// Selector on browser-rendered DOM
    RenderedDom,
    /// Model-assisted extraction from page text
    ModelAssisted,
    /// Seal keyword matched in product text
    KeywordMatch,
    /// Seal keyword matched in an image's alt/title/filename
    ImageElement,
    /// Seal inferred from ingredient absence
    IngredientInference,
    /// Entered or corrected by a reviewer
    Manual,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StructuredMarkup => "structured-markup",
            Self::Selector => "selector",
            Self::RenderedDom => "rendered-dom",
            Self::ModelAssisted => "model-assisted",
            Self::KeywordMatch => "keyword-match",
            Self::ImageElement => "image-element",
            Self::IngredientInference => "ingredient-inference",
            Self::Manual => "manual",
        }
    }

    /// Trust weight of a field filled by this method.
    pub fn confidence(&self) -> f64 {
        match self {
            Self::Manual => 1.0,
            Self::StructuredMarkup => 0.95,
            Self::Selector => 0.90,
            Self::RenderedDom | Self::ModelAssisted => 0.85,
            Self::KeywordMatch | Self::ImageElement | Self::IngredientInference => 0.0,
        }
    }
}

impl std::fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One provenance row. Immutable once created; corrections append new rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    field: String,
    source_url: String,
    locator: String,
    raw_snippet: String,
    method: ExtractionMethod,
    timestamp: DateTime<Utc>,
}

impl Evidence {
    /// Record evidence now. The snippet is truncated to [`MAX_SNIPPET_CHARS`].
    pub fn new(
        field: impl Into<String>,
        source_url: impl Into<String>,
        locator: impl Into<String>,
        raw_snippet: &str,
        method: ExtractionMethod,
    ) -> Self {
        Self::recorded_at(field, source_url, locator, raw_snippet, method, Utc::now())
    }

    /// Record evidence with an explicit timestamp (replay, storage).
    pub fn recorded_at(
        field: impl Into<String>,
        source_url: impl Into<String>,
        locator: impl Into<String>,
        raw_snippet: &str,
        method: ExtractionMethod,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            field: field.into(),
            source_url: source_url.into(),
            locator: locator.into(),
            raw_snippet: truncate_chars(raw_snippet, MAX_SNIPPET_CHARS),
            method,
            timestamp,
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }

    pub fn raw_snippet(&self) -> &str {
        &self.raw_snippet
    }

    pub fn method(&self) -> ExtractionMethod {
        self.method
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Truncate on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snippet_truncated() {
        let long = "ç".repeat(MAX_SNIPPET_CHARS + 50);
        let ev = Evidence::new("inci_ingredients", "https://x.com/p", "#inci", &long, ExtractionMethod::Selector);
        assert_eq!(ev.raw_snippet().chars().count(), MAX_SNIPPET_CHARS);
        assert_eq!(ev.locator(), "#inci");
        assert_eq!(ev.method(), ExtractionMethod::Selector);
    }

    #[test]
    fn test_method_serializes_kebab_case() {
        let json = serde_json::to_string(&ExtractionMethod::ModelAssisted).unwrap();
        assert_eq!(json, "\"model-assisted\"");
        assert_eq!(ExtractionMethod::StructuredMarkup.to_string(), "structured-markup");
    }
}
