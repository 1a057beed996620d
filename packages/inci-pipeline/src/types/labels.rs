//! Quality seal (label) results.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Where a seal claim came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelSource {
    /// Keyword in the product's own text
    OfficialText,
    /// Keyword in an image's alt/title/filename
    HtmlImgElement,
    /// Ingredient-absence reasoning
    InciAnalysis,
}

/// Confidence scores. Fixed by the scoring rule, not tunable.
pub mod confidence {
    pub const NONE: f64 = 0.0;
    pub const INFERRED_ONLY: f64 = 0.5;
    pub const DETECTED_ONLY: f64 = 0.8;
    pub const CORROBORATED: f64 = 0.9;
    pub const MANUAL: f64 = 1.0;
}

/// Seals attached to a product.
///
/// `detected` come from text evidence, `inferred` from ingredient absence.
/// A detected seal is never repeated in `inferred`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LabelResult {
    pub detected: IndexSet<String>,
    pub inferred: IndexSet<String>,
    pub confidence: f64,
    pub sources: IndexSet<LabelSource>,
    #[serde(default)]
    pub manually_verified: bool,
    #[serde(default)]
    pub manually_overridden: bool,
}

impl LabelResult {
    /// Every seal, detected first.
    pub fn all_seals(&self) -> impl Iterator<Item = &str> {
        self.detected
            .iter()
            .chain(self.inferred.iter())
            .map(String::as_str)
    }

    pub fn has_seal(&self, seal: &str) -> bool {
        self.detected.contains(seal) || self.inferred.contains(seal)
    }

    pub fn is_empty(&self) -> bool {
        self.detected.is_empty() && self.inferred.is_empty()
    }

    /// A reviewer confirmed the seals.
    pub fn mark_verified(&mut self) {
        self.manually_verified = true;
        self.confidence = confidence::MANUAL;
    }

    /// Keep a reviewer's decisions when the engine reruns.
    pub fn preserving_review(mut self, previous: &LabelResult) -> Self {
        if previous.manually_overridden {
            return previous.clone();
        }
        if previous.manually_verified {
            self.mark_verified();
        }
        self
    }
}
