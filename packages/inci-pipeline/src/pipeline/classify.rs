//! URL classification.
//!
//! Tags a candidate URL as product, category, kit, non-hair or other.
//! Rules read the URL; an optional context (a product name, or the anchor
//! text of the link the URL was found on) only feeds the hair-keyword rule.
//! Rules apply in priority order:
//!
//! 1. kit/bundle path pattern -> `kit`
//! 2. exclusion keyword as a path segment -> `non_hair`
//! 3. institutional page segment (about, contact, blog, ...) -> `other`
//! 4. category query (`cgid=`, `category=`) -> `category`
//! 5. category path on a shallow URL without product tokens -> `category`
//! 6. site product pattern, then generic product tokens -> `product`
//! 7. hair keyword in the URL or context with a meaningful path ->
//!    `product`, else `category`
//! 8. anything else -> `other`

use std::sync::LazyLock;

use regex::Regex;

use crate::pipeline::taxonomy::{self, EXCLUDE_KEYWORDS};
use crate::types::product::UrlKind;

const CATEGORY_INDICATORS: &[&str] = &[
    "/cabelos/",
    "/cabelo/",
    "/hair/",
    "/produtos/",
    "/products/",
    "/collections/",
    "/categoria/",
    "/category/",
    "/shampoo/",
    "/condicionador/",
    "/tratamento/",
    "/finalizacao/",
    "/masculino/",
    "/men/",
    "/busca/",
    "/search/",
    "/busca?",
];

static PRODUCT_INDICATORS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"-\d+ml",
        r"-\d+g",
        r"/p$",
        r"/p/",
        r"/p\?",
        r"-shampoo-",
        r"-condicionador-",
        r"-mascara-",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Path segments of pages that are never products.
const NON_PRODUCT_PATHS: &[&str] = &[
    "about",
    "sobre",
    "contato",
    "contact",
    "fale-conosco",
    "blog",
    "politica",
    "privacy",
    "terms",
    "termos",
    "institucional",
    "quem-somos",
    "faq",
    "ajuda",
    "help",
    "trabalhe-conosco",
    "careers",
    "imprensa",
    "press",
    "loja-fisica",
    "stores",
    "store-locator",
];

/// Category URLs have at most this many path segments.
const SHALLOW_DEPTH: usize = 2;

/// URL classifier with an optional site-specific product pattern.
#[derive(Debug, Clone, Default)]
pub struct UrlClassifier {
    product_pattern: Option<Regex>,
}

impl UrlClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force URLs matching `pattern` (lower-cased URL) to `product`.
    pub fn with_product_pattern(mut self, pattern: Regex) -> Self {
        self.product_pattern = Some(pattern);
        self
    }

    /// Build from an optional pattern string, as found in site config.
    pub fn from_pattern(pattern: Option<&str>) -> Result<Self, regex::Error> {
        let mut classifier = Self::new();
        if let Some(p) = pattern {
            classifier.product_pattern = Some(Regex::new(p)?);
        }
        Ok(classifier)
    }

    pub fn classify(&self, url: &str) -> UrlKind {
        self.classify_with_context(url, None)
    }

    /// Classify with a product name or page snippet alongside the URL.
    ///
    /// The context can only supply the hair keyword of the last rule; it
    /// never overrides a kit, non-hair, institutional or category verdict.
    pub fn classify_with_context(&self, url: &str, context: Option<&str>) -> UrlKind {
        let lower = url.trim().to_lowercase();
        let (path, query) = lower.split_once('?').unwrap_or((lower.as_str(), ""));
        let segments = path_segments(path);

        if taxonomy::is_kit_url(&lower) {
            return UrlKind::Kit;
        }

        if EXCLUDE_KEYWORDS.iter().any(|kw| {
            lower.contains(&format!("/{}/", kw)) || path.ends_with(&format!("/{}", kw))
        }) {
            return UrlKind::NonHair;
        }

        if segments
            .iter()
            .any(|s| NON_PRODUCT_PATHS.contains(&s.trim_end_matches(".html")))
        {
            return UrlKind::Other;
        }

        if query.contains("cgid=") || query.contains("category=") {
            return UrlKind::Category;
        }

        let product_like = PRODUCT_INDICATORS.iter().any(|re| re.is_match(&lower));
        let trimmed = lower.trim_end_matches('/');
        for indicator in CATEGORY_INDICATORS.iter().filter(|i| lower.contains(*i)) {
            if trimmed.ends_with(indicator.trim_end_matches('/')) {
                return UrlKind::Category;
            }
            if segments.len() <= SHALLOW_DEPTH && !product_like {
                return UrlKind::Category;
            }
        }

        if let Some(pattern) = &self.product_pattern {
            if pattern.is_match(&lower) {
                return UrlKind::Product;
            }
        }

        if product_like {
            return UrlKind::Product;
        }

        let has_hair_keyword = taxonomy::url_hair_keywords().iter().any(|kw| {
            lower.contains(&kw.replace(' ', "-")) || lower.contains(&kw.replace(' ', ""))
        }) || context.is_some_and(context_has_hair_keyword);
        if has_hair_keyword {
            let meaningful = segments.len() >= 2
                || segments
                    .first()
                    .is_some_and(|s| s.split('-').count() >= 3);
            return if meaningful {
                UrlKind::Product
            } else {
                UrlKind::Category
            };
        }

        UrlKind::Other
    }
}

/// Classify with the generic rules only.
pub fn classify_url(url: &str) -> UrlKind {
    UrlClassifier::new().classify(url)
}

/// A hair keyword in free text that names no excluded category.
fn context_has_hair_keyword(context: &str) -> bool {
    let lower = context.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric() && c != '-')
        .filter(|w| !w.is_empty())
        .collect();
    let padded = format!(" {} ", words.join(" "));
    let mentions = |kw: &&str| padded.contains(&format!(" {} ", kw));
    !EXCLUDE_KEYWORDS.iter().any(mentions) && taxonomy::url_hair_keywords().iter().any(mentions)
}

/// Non-empty path segments, host excluded.
fn path_segments(path: &str) -> Vec<&str> {
    let after_host = match path.split_once("://") {
        Some((_, rest)) => rest.split_once('/').map(|(_, p)| p).unwrap_or(""),
        None => path,
    };
    after_host
        .split('/')
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_by_hair_keyword_slug() {
        assert_eq!(
            classify_url("https://amend.com.br/shampoo-gold-black-reparador"),
            UrlKind::Product
        );
    }

    #[test]
    fn test_category_path() {
        assert_eq!(classify_url("https://amend.com.br/cabelos/shampoo"), UrlKind::Category);
        assert_eq!(classify_url("https://amend.com.br/cabelos/"), UrlKind::Category);
        assert_eq!(
            classify_url("https://loja.com/busca?cgid=cabelos"),
            UrlKind::Category
        );
    }

    #[test]
    fn test_kit() {
        assert_eq!(
            classify_url("https://amend.com.br/kit-shampoo-condicionador"),
            UrlKind::Kit
        );
    }

    #[test]
    fn test_non_hair() {
        assert_eq!(
            classify_url("https://amend.com.br/corpo/hidratante-corporal"),
            UrlKind::NonHair
        );
        assert_eq!(classify_url("https://loja.com/linha/maquiagem"), UrlKind::NonHair);
    }

    #[test]
    fn test_info_pages_are_other() {
        assert_eq!(classify_url("https://amend.com.br/sobre-nos"), UrlKind::Other);
        assert_eq!(classify_url("https://amend.com.br/blog/dicas-cabelo"), UrlKind::Other);
        assert_eq!(classify_url("https://amend.com.br/faq.html"), UrlKind::Other);
    }

    #[test]
    fn test_product_tokens() {
        assert_eq!(
            classify_url("https://loja.com/cabelos/mascara-nutritiva-250g"),
            UrlKind::Product
        );
        assert_eq!(classify_url("https://loja.com/oleo-argan/p"), UrlKind::Product);
    }

    #[test]
    fn test_site_product_pattern() {
        let classifier = UrlClassifier::from_pattern(Some(r"/produto/\d+")).unwrap();
        assert_eq!(
            classifier.classify("https://loja.com/produto/12345"),
            UrlKind::Product
        );
        assert_eq!(classify_url("https://loja.com/produto/12345"), UrlKind::Other);
    }

    #[test]
    fn test_rejects_bad_pattern() {
        assert!(UrlClassifier::from_pattern(Some("(")).is_err());
    }

    #[test]
    fn test_context_supplies_hair_keyword() {
        let url = "https://loja.com/novidades/gold-black";
        assert_eq!(classify_url(url), UrlKind::Other);
        let classifier = UrlClassifier::new();
        assert_eq!(
            classifier.classify_with_context(url, Some("Shampoo Gold Black 300ml")),
            UrlKind::Product
        );
        assert_eq!(
            classifier.classify_with_context(url, Some("Shampoo Corporal Gold")),
            UrlKind::Other
        );
        // Context never overrides an earlier rule
        assert_eq!(
            classifier.classify_with_context("https://loja.com/blog/dicas", Some("Shampoo")),
            UrlKind::Other
        );
    }

    #[test]
    fn test_deterministic() {
        let url = "https://amend.com.br/condicionador-gold-black-300ml";
        assert_eq!(classify_url(url), classify_url(url));
        assert_eq!(classify_url(url), UrlKind::Product);
    }
}
