//! Hair-care keyword tables: relevance, product type, audience.
//!
//! Matching is case-insensitive substring matching unless noted. The
//! gender tables use whole-word matching since short keywords such as
//! "men" would otherwise fire inside "treatment".

use std::sync::LazyLock;

use regex::Regex;

use crate::types::product::GenderTarget;

/// Keywords that mark a product or URL as hair care.
pub const HAIR_KEYWORDS: &[&str] = &[
    "shampoo",
    "condicionador",
    "conditioner",
    "máscara capilar",
    "mascara capilar",
    "hair mask",
    "tratamento capilar",
    "leave-in",
    "leave in",
    "óleo capilar",
    "oil hair",
    "tônico capilar",
    "tonico capilar",
    "scalp",
    "couro cabeludo",
    "antiqueda",
    "anti-queda",
    "queda capilar",
    "crescimento capilar",
    "cabelo",
    "cabelos",
    "hair",
    "capilar",
    "fios",
    "gel fixador",
    "mousse",
    "spray fixador",
    "pomada",
    "cera capilar",
    "wax",
    "clay",
    "pasta modeladora",
    "texturizador",
    "finalizador",
    "ampola",
    "sérum capilar",
    "serum capilar",
    "creme para pentear",
    "creme de pentear",
    "alisamento",
    "progressiva",
    "reconstrução",
    "hidratação capilar",
    "nutrição capilar",
    "reparação",
];

/// The subset of [`HAIR_KEYWORDS`] that is specific enough to trust in a URL.
pub fn url_hair_keywords() -> &'static [&'static str] {
    &HAIR_KEYWORDS[..20]
}

/// Keywords that mark a product as outside hair care.
pub const EXCLUDE_KEYWORDS: &[&str] = &[
    "corpo",
    "corporal",
    "body",
    "facial",
    "face",
    "rosto",
    "maquiagem",
    "makeup",
    "perfume",
    "fragrance",
    "fragrância",
    "unhas",
    "nail",
    "acessório",
    "accessory",
    "protetor solar",
    "sunscreen",
    "desodorante",
    "deodorant",
    "sabonete líquido",
    "sabonete corporal",
    "hidratante corporal",
    "body lotion",
    "body cream",
    "batom",
    "lipstick",
    "rímel",
    "mascara para cílios",
];

static KIT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"/kit[-_]",
        r"/combo[-_]",
        r"/bundle[-_]",
        r"/set[-_]",
        r"/kit/",
        r"/combo/",
        r"/bundle/",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Keyword groups mapped to a normalized product type. First match wins.
const TYPE_MAP: &[(&[&str], &str)] = &[
    (&["shampoo"], "shampoo"),
    (&["condicionador", "conditioner"], "conditioner"),
    (&["máscara", "mascara", "mask"], "mask"),
    (&["leave-in", "leave in"], "leave_in"),
    (&["óleo", "oleo", "oil"], "oil_serum"),
    (&["sérum", "serum"], "oil_serum"),
    (&["tônico", "tonico", "tonic"], "tonic"),
    (&["pomada", "pomade"], "pomade"),
    (&["gel"], "gel"),
    (&["mousse"], "mousse"),
    (&["spray"], "spray"),
    (&["cera", "wax"], "wax"),
    (&["argila", "clay"], "clay"),
    (&["pasta", "paste"], "paste"),
    (&["creme de pentear", "creme para pentear", "cream"], "cream"),
    (&["ampola", "ampule"], "ampule"),
    (&["finalizador", "finisher"], "finisher"),
    (&["tratamento", "treatment", "reconstrução"], "treatment"),
    (&["esfoliante", "exfoliant"], "exfoliant"),
    (&["texturizador", "texturizer"], "texturizer"),
];

const UNISEX_KEYWORDS: &[&str] = &["unissex", "unisex"];
const KIDS_KEYWORDS: &[&str] = &["kids", "infantil", "criança", "children", "baby"];
const MEN_KEYWORDS: &[&str] = &[
    "masculino",
    "masculina",
    "men",
    "for men",
    "man",
    "barber",
    "barbearia",
];
const WOMEN_KEYWORDS: &[&str] = &["feminino", "feminina", "women", "woman", "mulher"];

/// Check whether a URL matches a kit/bundle path pattern.
pub fn is_kit_url(url: &str) -> bool {
    let lower = url.to_lowercase();
    KIT_PATTERNS.iter().any(|re| re.is_match(&lower))
}

/// Map a product name to a normalized type, e.g. "Máscara Gold" -> "mask".
pub fn normalize_product_type(name: &str) -> Option<&'static str> {
    let lower = name.to_lowercase();
    TYPE_MAP
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|kw| lower.contains(kw)))
        .map(|(_, normalized)| *normalized)
}

/// Detect the audience from the product name and URL.
pub fn detect_gender_target(product_name: &str, url: &str) -> GenderTarget {
    let combined = format!("{} {}", product_name, url).to_lowercase();
    let words: Vec<&str> = combined
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let text = words.join(" ");
    let has = |keywords: &[&str]| {
        keywords
            .iter()
            .any(|kw| contains_phrase(&text, kw))
    };

    if has(UNISEX_KEYWORDS) {
        GenderTarget::Unisex
    } else if has(KIDS_KEYWORDS) {
        GenderTarget::Kids
    } else if has(MEN_KEYWORDS) {
        GenderTarget::Men
    } else if has(WOMEN_KEYWORDS) {
        GenderTarget::Women
    } else {
        GenderTarget::Unknown
    }
}

/// Whole-word phrase match over space-joined words.
fn contains_phrase(text: &str, phrase: &str) -> bool {
    let padded = format!(" {} ", text);
    padded.contains(&format!(" {} ", phrase))
}

/// Justify hair relevance from product text.
///
/// Returns `None` when an exclusion keyword appears or no hair keyword does.
pub fn hair_relevance(product_name: &str, url: &str, description: &str) -> Option<String> {
    let combined = format!("{} {} {}", product_name, url, description).to_lowercase();
    if EXCLUDE_KEYWORDS.iter().any(|kw| combined.contains(kw)) {
        return None;
    }
    HAIR_KEYWORDS
        .iter()
        .find(|kw| combined.contains(*kw))
        .map(|kw| format!("keyword '{}' found", kw))
}

/// Reason recorded when a product URL carries no hair keyword.
pub const URL_CLASSIFIED_AS_PRODUCT: &str = "url_classified_as_product";

/// Hair relevance for a URL already classified as a product.
///
/// Exclusion keywords still veto; otherwise a keyword justification is
/// preferred and the URL classification is the fallback.
pub fn product_hair_relevance(product_name: &str, url: &str, description: &str) -> Option<String> {
    let combined = format!("{} {} {}", product_name, url, description).to_lowercase();
    if EXCLUDE_KEYWORDS.iter().any(|kw| combined.contains(kw)) {
        return None;
    }
    hair_relevance(product_name, url, description)
        .or_else(|| Some(URL_CLASSIFIED_AS_PRODUCT.to_string()))
}
