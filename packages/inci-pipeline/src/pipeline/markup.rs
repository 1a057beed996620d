//! Deterministic HTML parsing helpers.
//!
//! Everything here is synchronous and works on a parsed `scraper::Html`.
//! `Html` is not `Send`, so callers parse, extract, and drop it before
//! awaiting anything.

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

/// Currency assumed when structured markup has a price but no currency.
pub const DEFAULT_CURRENCY: &str = "BRL";

/// Texts shorter than this are not accepted as tab content.
const MIN_TAB_CONTENT_CHARS: usize = 30;

/// Image texts at or above this length are not seal-like.
const MAX_IMAGE_TEXT_CHARS: usize = 200;

const INCI_TAB_LABELS: &[&str] = &[
    "composição",
    "composicao",
    "ingredientes",
    "ingredients",
    "inci",
    "composição do produto",
    "composição completa",
];

/// UI text from filter buttons that leaks into tab content.
const TAB_NOISE_PREFIXES: &[&str] = &["todos", "all", "ver todos", "mostrar todos", "ver mais"];

const TAB_CONTENT_CLASSES: &[&str] = &[
    "collapse__content",
    "tab-content",
    "tab-pane",
    "accordion-content",
];

/// Elements whose text never reaches the page text.
const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "svg", "iframe", "nav", "footer",
];

const NON_PAGE_HREFS: &[&str] = &["#", "mailto:", "tel:", "javascript:"];

static LD_JSON: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).unwrap());

static TAB_CANDIDATES: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("button, h2, h3, h4, a, span, div").unwrap());

static IMG: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").unwrap());

static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

/// A value found on the page and where.
#[derive(Debug, Clone, PartialEq)]
pub struct Located {
    pub value: String,
    pub locator: String,
}

impl Located {
    fn new(value: impl Into<String>, locator: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            locator: locator.into(),
        }
    }
}

/// Product fields read from embedded JSON-LD.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkupProduct {
    pub name: Option<String>,
    pub image: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub brand: Option<String>,
}

impl MarkupProduct {
    /// Locator for a JSON-LD field, e.g. `json-ld @type=Product .name`.
    pub fn locator(field: &str) -> String {
        format!("json-ld @type=Product .{}", field)
    }
}

/// Find the first JSON-LD object typed `Product`.
///
/// Handles a bare object, a top-level list, and `@graph` containers.
/// Unparseable blocks are skipped.
pub fn json_ld_product(doc: &Html) -> Option<Value> {
    for script in doc.select(&LD_JSON) {
        let raw: String = script.text().collect();
        let data: Value = match serde_json::from_str(raw.trim()) {
            Ok(v) => v,
            Err(e) => {
                debug!(error = %e, "Skipping unparseable JSON-LD block");
                continue;
            }
        };
        if let Some(product) = find_product(&data) {
            return Some(product.clone());
        }
    }
    None
}

fn find_product(value: &Value) -> Option<&Value> {
    match value {
        Value::Object(map) => {
            if is_product_type(map.get("@type")) {
                return Some(value);
            }
            map.get("@graph").and_then(find_product)
        }
        Value::Array(items) => items.iter().find_map(find_product),
        _ => None,
    }
}

fn is_product_type(t: Option<&Value>) -> bool {
    match t {
        Some(Value::String(s)) => s == "Product",
        Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some("Product")),
        _ => false,
    }
}

/// Read product fields from JSON-LD markup.
pub fn parse_markup_product(doc: &Html) -> Option<MarkupProduct> {
    let data = json_ld_product(doc)?;
    let text = |key: &str| {
        data.get(key)
            .and_then(Value::as_str)
            .map(normalize_whitespace)
            .filter(|s| !s.is_empty())
    };

    let mut product = MarkupProduct {
        name: text("name"),
        image: data.get("image").and_then(first_image),
        description: text("description"),
        brand: data.get("brand").and_then(|b| match b {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Object(_) => b.get("name").and_then(Value::as_str).map(|s| s.trim().to_string()),
            _ => None,
        }),
        ..Default::default()
    };

    let offer = match data.get("offers") {
        Some(Value::Array(offers)) => offers.first(),
        other => other,
    };
    if let Some(offer) = offer {
        product.price = offer.get("price").and_then(parse_price);
        if product.price.is_some() {
            product.currency = Some(
                offer
                    .get("priceCurrency")
                    .and_then(Value::as_str)
                    .unwrap_or(DEFAULT_CURRENCY)
                    .to_string(),
            );
        }
    }

    Some(product)
}

fn first_image(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Array(items) => items.iter().find_map(first_image),
        Value::Object(map) => map
            .get("url")
            .or_else(|| map.get("contentUrl"))
            .and_then(first_image),
        _ => None,
    }
}

fn parse_price(value: &Value) -> Option<f64> {
    let price: Option<f64> = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    };
    price.filter(|p| p.is_finite() && *p > 0.0)
}

/// First selector whose first match has non-empty text.
pub fn select_text(doc: &Html, selectors: &[String]) -> Option<Located> {
    selectors.iter().find_map(|sel| {
        let selector = parse_selector(sel)?;
        let text = doc.select(&selector).next().map(|el| element_text(&el))?;
        (!text.is_empty()).then(|| Located::new(text, sel.as_str()))
    })
}

/// First image URL matched by the selectors, resolved against `base_url`.
///
/// A selector may point at the `<img>` itself or at a container holding one.
pub fn select_image(doc: &Html, selectors: &[String], base_url: &str) -> Option<Located> {
    selectors.iter().find_map(|sel| {
        let selector = parse_selector(sel)?;
        doc.select(&selector)
            .find_map(|el| image_src(&el, base_url))
            .map(|src| Located::new(src, sel.as_str()))
    })
}

/// Every distinct image URL matched by the selectors, in document order.
pub fn select_gallery(doc: &Html, selectors: &[String], base_url: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    selectors
        .iter()
        .filter_map(|sel| parse_selector(sel))
        .flat_map(|selector| {
            doc.select(&selector)
                .filter_map(|el| image_src(&el, base_url))
                .collect::<Vec<_>>()
        })
        .filter(|src| seen.insert(src.clone()))
        .collect()
}

fn image_src(el: &ElementRef, base_url: &str) -> Option<String> {
    let img = if el.value().name() == "img" {
        *el
    } else {
        el.select(&IMG).next()?
    };
    let src = img
        .value()
        .attr("src")
        .filter(|s| !s.trim().is_empty())
        .or_else(|| img.value().attr("data-src"))?;
    resolve_url(base_url, src)
}

fn parse_selector(sel: &str) -> Option<Selector> {
    match Selector::parse(sel) {
        Ok(s) => Some(s),
        Err(e) => {
            warn!(selector = %sel, error = %e, "Invalid selector, skipping");
            None
        }
    }
}

/// Find ingredient text in a collapsible tab or accordion by its label.
///
/// Looks for a short element whose text is an ingredient label and takes
/// the next sibling (or the parent's next sibling) when that looks like a
/// comma-separated list. Falls back to common tab content classes whose
/// preceding sibling carries the label.
pub fn tab_label_ingredients(doc: &Html) -> Option<Located> {
    for el in doc.select(&TAB_CANDIDATES) {
        let label = element_text(&el).to_lowercase();
        if !INCI_TAB_LABELS
            .iter()
            .any(|l| label == *l || label.starts_with(l))
        {
            continue;
        }
        let label: String = label.chars().take(60).collect();

        if let Some(content) = next_element(el).and_then(|s| tab_content(&s)) {
            return Some(Located::new(content, format!("tab-label:{}", label)));
        }
        let parent_sibling = el.parent().and_then(ElementRef::wrap).and_then(next_element);
        if let Some(content) = parent_sibling.and_then(|s| tab_content(&s)) {
            return Some(Located::new(content, format!("tab-label-parent:{}", label)));
        }
    }

    for class in TAB_CONTENT_CLASSES {
        let Some(selector) = parse_selector(&format!(".{}", class)) else {
            continue;
        };
        for el in doc.select(&selector) {
            let labelled = el
                .prev_siblings()
                .find_map(ElementRef::wrap)
                .map(|prev| element_text(&prev).to_lowercase())
                .is_some_and(|prev| INCI_TAB_LABELS.iter().any(|l| prev.contains(l)));
            if !labelled {
                continue;
            }
            if let Some(content) = tab_content(&el) {
                return Some(Located::new(content, format!(".{}", class)));
            }
        }
    }

    None
}

fn next_element(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    el.next_siblings().find_map(ElementRef::wrap)
}

fn tab_content(el: &ElementRef) -> Option<String> {
    let content = strip_tab_noise(&element_text(el));
    (content.chars().count() > MIN_TAB_CONTENT_CHARS && content.contains(',')).then_some(content)
}

fn strip_tab_noise(text: &str) -> String {
    let mut text = text.trim();
    for prefix in TAB_NOISE_PREFIXES {
        let Some(head) = text.get(..prefix.len()) else {
            continue;
        };
        let rest = &text[prefix.len()..];
        let at_word_end = rest.chars().next().is_none_or(|c| !c.is_alphanumeric());
        if head.eq_ignore_ascii_case(prefix) && at_word_end {
            text = rest.trim_start();
        }
    }
    text.to_string()
}

/// Alt, title, and filename texts of every image, for seal scanning.
pub fn image_texts(doc: &Html) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut texts = Vec::new();
    let mut push = |text: String| {
        let text = text.trim().to_string();
        if !text.is_empty()
            && text.chars().count() < MAX_IMAGE_TEXT_CHARS
            && seen.insert(text.to_lowercase())
        {
            texts.push(text);
        }
    };

    for img in doc.select(&IMG) {
        let attrs = img.value();
        push(attrs.attr("alt").unwrap_or_default().to_string());
        push(attrs.attr("title").unwrap_or_default().to_string());
        if let Some(src) = attrs.attr("src").or_else(|| attrs.attr("data-src")) {
            push(image_filename_text(src));
        }
    }
    texts
}

/// `/img/selo-vegano_sem-sulfato.png?v=2` -> `selo vegano sem sulfato`.
fn image_filename_text(src: &str) -> String {
    let path = src.split(['?', '#']).next().unwrap_or_default();
    let file = path.rsplit('/').next().unwrap_or_default();
    let stem = file.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(file);
    stem.replace(['-', '_'], " ")
}

/// A link found on a page, with its anchor text.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLink {
    /// Absolute URL, fragment removed
    pub url: String,
    /// Visible anchor text, whitespace collapsed
    pub text: String,
}

/// Absolute links on a page in document order, first occurrence of each URL.
pub fn extract_links(doc: &Html, base_url: &str) -> Vec<PageLink> {
    let mut seen = HashSet::new();
    doc.select(&ANCHOR)
        .filter_map(|a| {
            let href = a.value().attr("href")?;
            if NON_PAGE_HREFS.iter().any(|p| href.starts_with(p)) {
                return None;
            }
            let mut url = Url::parse(&resolve_url(base_url, href)?).ok()?;
            url.set_fragment(None);
            Some(PageLink {
                url: url.to_string(),
                text: element_text(&a),
            })
        })
        .filter(|link| seen.insert(link.url.clone()))
        .collect()
}

/// Resolve `href` against `base`. Data URIs and blanks yield `None`.
pub fn resolve_url(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with("data:") {
        return None;
    }
    match Url::parse(href) {
        Ok(url) => Some(url.to_string()),
        Err(_) => Url::parse(base).ok()?.join(href).ok().map(|u| u.to_string()),
    }
}

/// Visible text of a document, one text node per line.
pub fn page_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let mut lines = Vec::new();
    collect_text(doc.root_element(), &mut lines);
    lines.join("\n")
}

fn collect_text(element: ElementRef, out: &mut Vec<String>) {
    for child in element.children() {
        if let Some(el) = ElementRef::wrap(child) {
            if !SKIPPED_TAGS.contains(&el.value().name()) {
                collect_text(el, out);
            }
        } else if let Some(text) = child.value().as_text() {
            let line = normalize_whitespace(text);
            if !line.is_empty() {
                out.push(line);
            }
        }
    }
}

/// Text content of an element with whitespace collapsed.
pub fn element_text(el: &ElementRef) -> String {
    normalize_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRODUCT_PAGE: &str = r#"
        <html><head>
          <script type="application/ld+json">{"@context":"https://schema.org","@type":"BreadcrumbList"}</script>
          <script type="application/ld+json">
            {"@context":"https://schema.org","@type":"Product","name":"Shampoo Gold Black 300ml",
             "image":["https://cdn.amend.com.br/gold.jpg","https://cdn.amend.com.br/gold-2.jpg"],
             "description":"Shampoo reparador sem sulfato.",
             "brand":{"@type":"Brand","name":"Amend"},
             "offers":{"@type":"Offer","price":"49.90"}}
          </script>
        </head><body>
          <h1 class="product-name">Shampoo Gold Black</h1>
          <div class="gallery"><img src="/img/selo-vegano.png" alt="Selo Vegano"></div>
        </body></html>
    "#;

    #[test]
    fn test_json_ld_product_fields() {
        let doc = Html::parse_document(PRODUCT_PAGE);
        let product = parse_markup_product(&doc).unwrap();
        assert_eq!(product.name.as_deref(), Some("Shampoo Gold Black 300ml"));
        assert_eq!(product.image.as_deref(), Some("https://cdn.amend.com.br/gold.jpg"));
        assert_eq!(product.price, Some(49.90));
        assert_eq!(product.currency.as_deref(), Some("BRL"));
        assert_eq!(product.brand.as_deref(), Some("Amend"));
    }

    #[test]
    fn test_json_ld_graph_and_list() {
        let html = r#"<script type="application/ld+json">
            {"@graph":[{"@type":"WebPage"},{"@type":["Product"],"name":"Máscara"}]}
        </script>"#;
        let doc = Html::parse_document(html);
        assert_eq!(parse_markup_product(&doc).unwrap().name.as_deref(), Some("Máscara"));

        let html = r#"<script type="application/ld+json">[{"@type":"Product","name":"Óleo"}]</script>"#;
        let doc = Html::parse_document(html);
        assert_eq!(parse_markup_product(&doc).unwrap().name.as_deref(), Some("Óleo"));
    }

    #[test]
    fn test_broken_json_ld_is_skipped() {
        let doc = Html::parse_document(r#"<script type="application/ld+json">{not json</script>"#);
        assert!(parse_markup_product(&doc).is_none());
    }

    #[test]
    fn test_select_text_first_match_wins() {
        let doc = Html::parse_document(PRODUCT_PAGE);
        let selectors = vec![".missing".to_string(), "h1.product-name".to_string(), "h1".to_string()];
        let found = select_text(&doc, &selectors).unwrap();
        assert_eq!(found.value, "Shampoo Gold Black");
        assert_eq!(found.locator, "h1.product-name");
    }

    #[test]
    fn test_select_image_resolves_relative() {
        let doc = Html::parse_document(PRODUCT_PAGE);
        let found = select_image(&doc, &[".gallery".to_string()], "https://www.amend.com.br/p").unwrap();
        assert_eq!(found.value, "https://www.amend.com.br/img/selo-vegano.png");
    }

    #[test]
    fn test_tab_label_heuristic() {
        let html = r#"<div class="tabs">
            <button>Composição</button>
            <div class="panel">Todos Aqua, Sodium Laureth Sulfate, Cocamidopropyl Betaine, Glycerin</div>
        </div>"#;
        let doc = Html::parse_document(html);
        let found = tab_label_ingredients(&doc).unwrap();
        assert_eq!(
            found.value,
            "Aqua, Sodium Laureth Sulfate, Cocamidopropyl Betaine, Glycerin"
        );
        assert_eq!(found.locator, "tab-label:composição");
    }

    #[test]
    fn test_tab_noise_needs_word_boundary() {
        assert_eq!(strip_tab_noise("Allantoin, Aqua"), "Allantoin, Aqua");
        assert_eq!(strip_tab_noise("ALL Aqua, Glycerin"), "Aqua, Glycerin");
    }

    #[test]
    fn test_image_texts() {
        let html = r#"<img src="https://x.com/img/selo-sem_sulfato.png?v=3" alt="Sem Sulfato">
                      <img src="/a/vegan.svg" alt="Vegan" title="vegan">"#;
        let doc = Html::parse_document(html);
        let texts = image_texts(&doc);
        assert_eq!(texts, vec!["Sem Sulfato", "selo sem sulfato", "Vegan"]);
    }

    #[test]
    fn test_extract_links_keep_query_and_text() {
        let html = r##"<a href="/cabelos/shampoo?page=2">Página 2</a><a href="#top">b</a>
                       <a href="https://other.com/x#frag">c</a><a href="/cabelos/shampoo">
                       Shampoos </a><a href="/cabelos/shampoo?page=2">again</a>"##;
        let doc = Html::parse_document(html);
        let links = extract_links(&doc, "https://amend.com.br/");
        let urls: Vec<&str> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://amend.com.br/cabelos/shampoo?page=2",
                "https://other.com/x",
                "https://amend.com.br/cabelos/shampoo",
            ]
        );
        assert_eq!(links[0].text, "Página 2");
        assert_eq!(links[2].text, "Shampoos");
    }

    #[test]
    fn test_page_text_skips_scripts() {
        let text = page_text(
            "<html><body><nav>Menu</nav><p>Aqua,  Glycerin</p><script>x()</script></body></html>",
        );
        assert_eq!(text, "Aqua, Glycerin");
    }
}
