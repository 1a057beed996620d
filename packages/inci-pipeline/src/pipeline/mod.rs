//! Pipeline stages.
//!
//! Pure stages (classification, validation, gating, labels) have no I/O.
//! Discovery, extraction and the coverage engine reach the outside world
//! only through the capability traits.

pub mod budget;
pub mod classify;
pub mod coverage;
pub mod discover;
pub mod evidence;
pub mod extract;
pub mod inci;
pub mod labels;
pub mod markup;
pub mod prompts;
pub mod quality;
pub mod taxonomy;

pub use budget::BudgetTracker;
pub use classify::{classify_url, UrlClassifier};
pub use coverage::{AuditReport, CoverageEngine, LabelUpdate, TierChange};
pub use discover::{Discoverer, Discovery};
pub use evidence::EvidenceTracker;
pub use extract::Extractor;
pub use inci::{validate_ingredient_text, validate_ingredients, IngredientValidator};
pub use labels::{LabelDetection, LabelEngine, LabelInput, LabelRules};
pub use quality::{GateInput, GateOutcome, QualityGate};
