//! Ingredient list cleaning and validation.
//!
//! Raw ingredient text scraped from a product page is untrusted: it often
//! runs on into usage instructions, carries UI boilerplate, or holds two
//! lists glued together from a multi-product page. This module turns it
//! into a cleaned list or a machine-parseable rejection.
//!
//! Stages for text input:
//! 1. cut at the first instructions/benefits/legal marker
//! 2. strip boilerplate phrases
//! 3. split on commas
//!
//! Stages for the resulting list:
//! 1. repetition check (the same block scraped twice)
//! 2. concatenation check (solvent restated, or a product heading)
//! 3. per-term filter and case-insensitive dedup, first-seen order
//! 4. minimum count
//!
//! Repetition and concatenation are checked on the raw split list, before
//! dedup would hide them.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::quality::{IngredientValidationResult, Rejection};

/// Default minimum number of surviving terms.
pub const MIN_INGREDIENTS: usize = 5;

const CUT_MARKERS: &[&str] = &[
    "modo de uso",
    "como usar",
    "how to use",
    "directions",
    "benefícios",
    "benefits",
    "indicação",
    "precauções",
    "warnings",
    "validade",
    "reg. ms",
    "sac:",
    "cnpj",
    "fabricante",
];

const GARBAGE_PHRASES: &[&str] = &[
    "click here",
    "see more",
    "read more",
    "ver mais",
    "clique aqui",
    "saiba mais",
    "leia mais",
    "show more",
    "infamous",
    "known for",
    "commonly used",
    "is a type of",
    "can cause",
    "compare",
    "report error",
    "embed",
];

/// Imperative verbs that mark an instruction sentence.
const VERB_INDICATORS: &[&str] = &[
    "aplique",
    "aplicar",
    "massageie",
    "enxágue",
    "enxague",
    "use",
    "apply",
    "massage",
    "rinse",
    "wash",
    "lavar",
    "espalhe",
    "distribua",
    "deixe agir",
    "aguarde",
];

const SOLVENTS: &[&str] = &["aqua", "water", "aqua/water"];

const MIN_TERM_CHARS: usize = 2;
const MAX_TERM_CHARS: usize = 80;
const MAX_TERM_WORDS: usize = 8;
const MAX_INSTRUCTION_WORDS: usize = 3;
const MIN_REPEAT_BLOCK: usize = 3;

static CUT_RE: LazyLock<Regex> = LazyLock::new(|| case_insensitive_alternation(CUT_MARKERS));

static GARBAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| case_insensitive_alternation(GARBAGE_PHRASES));

static URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)https?://").unwrap());

static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:shampoo|condicionador|conditioner|máscara|mascara|mask|creme|leave-in|óleo)\s*:",
    )
    .unwrap()
});

fn case_insensitive_alternation(phrases: &[&str]) -> Regex {
    let alternation = phrases
        .iter()
        .map(|p| regex::escape(p))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!("(?i){}", alternation)).unwrap()
}

/// Validates ingredient text and lists against a minimum count.
#[derive(Debug, Clone, Copy)]
pub struct IngredientValidator {
    min_ingredients: usize,
}

impl Default for IngredientValidator {
    fn default() -> Self {
        Self {
            min_ingredients: MIN_INGREDIENTS,
        }
    }
}

impl IngredientValidator {
    pub fn new(min_ingredients: usize) -> Self {
        Self { min_ingredients }
    }

    pub fn min_ingredients(&self) -> usize {
        self.min_ingredients
    }

    /// Validate raw text as captured from a page.
    pub fn validate_text(&self, raw: &str) -> IngredientValidationResult {
        if raw.trim().is_empty() {
            return IngredientValidationResult::rejected(Rejection::NoText);
        }
        let cleaned = clean_ingredient_text(raw);
        if cleaned.is_empty() {
            return IngredientValidationResult::rejected(Rejection::EmptyAfterCleaning);
        }
        self.validate(&split_ingredients(&cleaned))
    }

    /// Validate an already split list.
    pub fn validate<S: AsRef<str>>(&self, terms: &[S]) -> IngredientValidationResult {
        let terms: Vec<&str> = terms
            .iter()
            .map(|t| t.as_ref().trim())
            .filter(|t| !t.is_empty())
            .collect();

        if detect_repetition(&terms) {
            return IngredientValidationResult::rejected(Rejection::RepetitionDetected);
        }
        if detect_concatenation(&terms) {
            return IngredientValidationResult::rejected(Rejection::ConcatDetected);
        }

        let mut seen = std::collections::HashSet::new();
        let mut cleaned = Vec::new();
        let mut removed = Vec::new();
        for term in terms {
            if !seen.insert(term.to_lowercase()) || !is_valid_term(term) {
                removed.push(term.to_string());
                continue;
            }
            cleaned.push(term.to_string());
        }

        if cleaned.len() < self.min_ingredients {
            return IngredientValidationResult {
                valid: false,
                rejection: Some(Rejection::MinIngredients(cleaned.len())),
                cleaned,
                removed,
            };
        }
        IngredientValidationResult::accepted(cleaned, removed)
    }
}

/// Validate raw text with the default minimum.
pub fn validate_ingredient_text(raw: &str) -> IngredientValidationResult {
    IngredientValidator::default().validate_text(raw)
}

/// Validate a list with the default minimum.
pub fn validate_ingredients<S: AsRef<str>>(terms: &[S]) -> IngredientValidationResult {
    IngredientValidator::default().validate(terms)
}

/// Cut at the first marker and strip boilerplate.
pub fn clean_ingredient_text(raw: &str) -> String {
    let cut = match CUT_RE.find(raw) {
        Some(m) => &raw[..m.start()],
        None => raw,
    };
    GARBAGE_RE.replace_all(cut, "").trim().to_string()
}

/// Split on commas, trimming and dropping empties.
pub fn split_ingredients(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Per-term sanity rules.
pub fn is_valid_term(term: &str) -> bool {
    let term = term.trim();
    let chars = term.chars().count();
    if !(MIN_TERM_CHARS..=MAX_TERM_CHARS).contains(&chars) {
        return false;
    }
    if URL_RE.is_match(term) {
        return false;
    }
    let words = term.split_whitespace().count();
    if words > MAX_TERM_WORDS {
        return false;
    }
    let lower = term.to_lowercase();
    if words > MAX_INSTRUCTION_WORDS && VERB_INDICATORS.iter().any(|v| lower.contains(v)) {
        return false;
    }
    true
}

/// Two lists glued together: the solvent restated later in the list, or a
/// product heading such as "Shampoo:".
pub fn detect_concatenation<S: AsRef<str>>(terms: &[S]) -> bool {
    let lower: Vec<String> = terms
        .iter()
        .map(|t| t.as_ref().trim().to_lowercase())
        .collect();

    let solvent_positions: Vec<usize> = lower
        .iter()
        .enumerate()
        .filter(|(_, t)| SOLVENTS.contains(&t.as_str()))
        .map(|(i, _)| i)
        .collect();
    if solvent_positions.windows(2).any(|w| w[1] - w[0] > 1) {
        return true;
    }

    lower.iter().any(|t| HEADING_RE.is_match(t))
}

/// The same leading block of at least three terms scraped twice in a row.
pub fn detect_repetition<S: AsRef<str>>(terms: &[S]) -> bool {
    let lower: Vec<String> = terms
        .iter()
        .map(|t| t.as_ref().trim().to_lowercase())
        .collect();
    (MIN_REPEAT_BLOCK..=lower.len() / 2).any(|size| lower[..size] == lower[size..size * 2])
}
