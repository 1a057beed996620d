//! Two-tier field extraction.
//!
//! Tier 1 reads embedded JSON-LD product markup, then the site's ordered
//! selector lists, then the ingredient tab-label heuristic. Tier 2 asks a
//! model for the fields still missing, once per page, only when the site
//! allows it and the budget grants a call. Model values are kept only when
//! they appear verbatim in the page text the model was shown.

use std::time::Duration;

use scraper::Html;
use tracing::{debug, warn};

use crate::error::ModelError;
use crate::pipeline::budget::BudgetTracker;
use crate::pipeline::evidence::EvidenceTracker;
use crate::pipeline::markup::{self, Located, MarkupProduct};
use crate::pipeline::prompts::{parse_model_fields, truncate_page_text};
use crate::traits::fetcher::FetchedPage;
use crate::traits::model::{FieldSpec, ModelExtractor, ModelFields};
use crate::types::config::PipelineConfig;
use crate::types::evidence::ExtractionMethod;
use crate::types::product::{Field, FieldValue, RawExtraction};
use crate::types::site::SelectorConfig;

/// Locator recorded for model-assisted values.
pub const MODEL_LOCATOR: &str = "model-assisted:page-text";

/// Fields whose absence justifies a model call.
const MODEL_TRIGGER_FIELDS: [Field; 2] = [Field::ProductName, Field::Ingredients];

/// Fields the model may fill. Images and prices are never taken from a model.
const MODEL_FIELDS: [Field; 3] = [Field::ProductName, Field::Ingredients, Field::Description];

/// Extractor for one site's pages.
#[derive(Debug, Clone)]
pub struct Extractor {
    selectors: SelectorConfig,
    text_limit: usize,
    model_timeout: Duration,
}

impl Extractor {
    pub fn new(selectors: SelectorConfig, config: &PipelineConfig) -> Self {
        Self {
            selectors,
            text_limit: config.model_text_limit,
            model_timeout: config.model_timeout,
        }
    }

    /// Tier 1 only. Never calls a model.
    pub fn extract_deterministic(&self, url: &str, page: &FetchedPage) -> RawExtraction {
        let doc = Html::parse_document(&page.html);
        let mut raw = RawExtraction::new(url);
        let mut evidence = EvidenceTracker::new(url);
        let base = page.url.as_str();
        let selectors = &self.selectors;

        let markup = markup::parse_markup_product(&doc).unwrap_or_default();

        // Name
        if let Some(name) = markup.name.clone() {
            fill_markup(&mut raw, &mut evidence, Field::ProductName, name);
        } else if let Some(found) = markup::select_text(&doc, &selectors.name_selectors) {
            fill_selector(&mut raw, &mut evidence, Field::ProductName, found);
        }

        // Main image
        if let Some(src) = markup
            .image
            .as_deref()
            .and_then(|src| markup::resolve_url(base, src))
        {
            fill_markup(&mut raw, &mut evidence, Field::ImageUrl, src);
        } else if let Some(found) = markup::select_image(&doc, &selectors.image_selectors, base) {
            fill_selector(&mut raw, &mut evidence, Field::ImageUrl, found);
        }

        if let Some(description) = markup.description.clone() {
            fill_markup(&mut raw, &mut evidence, Field::Description, description);
        } else if let Some(found) = markup::select_text(&doc, &selectors.description_selectors) {
            fill_selector(&mut raw, &mut evidence, Field::Description, found);
        }

        if let Some(price) = markup.price {
            let locator = MarkupProduct::locator("offers.price");
            evidence.record(
                Field::Price.as_str(),
                &locator,
                &price.to_string(),
                ExtractionMethod::StructuredMarkup,
            );
            raw.price = Some(FieldValue::new(price, ExtractionMethod::StructuredMarkup, locator));
            raw.currency = markup.currency.clone();
        }
        raw.brand = markup.brand;

        // Ingredients: configured selectors, then tab labels
        let ingredients = markup::select_text(&doc, &selectors.ingredient_selectors)
            .or_else(|| markup::tab_label_ingredients(&doc));
        if let Some(found) = ingredients {
            fill_selector(&mut raw, &mut evidence, Field::Ingredients, found);
        }

        let main_image = raw.image_url().map(str::to_string);
        raw.gallery = markup::select_gallery(&doc, &selectors.image_selectors, base)
            .into_iter()
            .filter(|src| Some(src) != main_image.as_ref())
            .collect();
        raw.image_texts = markup::image_texts(&doc);
        raw.evidence = evidence.into_rows();

        debug!(
            url = %url,
            missing = ?raw.missing_fields(),
            "Deterministic extraction complete"
        );
        raw
    }

    /// Tier 1, then Tier 2 for the fields still missing.
    ///
    /// Model failures, timeouts, malformed replies and budget denials all
    /// leave the fields empty; none of them is an error for the caller.
    pub async fn extract(
        &self,
        url: &str,
        page: &FetchedPage,
        model: Option<&dyn ModelExtractor>,
        budget: &mut BudgetTracker,
    ) -> RawExtraction {
        let mut raw = self.extract_deterministic(url, page);

        let Some(model) = model else {
            return raw;
        };
        let Some(spec) = self.model_spec(&raw) else {
            return raw;
        };

        if let Err(e) = budget.try_acquire() {
            debug!(url = %url, error = %e, fields = ?spec.fields, "Model call denied");
            raw.budget_denied = spec.fields;
            return raw;
        }
        raw.model_calls += 1;

        let text = truncate_page_text(&page.text, self.text_limit);
        let response = match tokio::time::timeout(self.model_timeout, model.extract(text, &spec))
            .await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(url = %url, model = model.name(), error = %e, "Model extraction failed");
                return raw;
            }
            Err(_) => {
                warn!(url = %url, model = model.name(), error = %ModelError::Timeout, "Model extraction failed");
                return raw;
            }
        };
        budget.record_usage(response.input_tokens, response.output_tokens);

        match parse_model_fields(&response.content) {
            Ok(fields) => apply_model_fields(&mut raw, &spec, fields, text),
            Err(e) => warn!(url = %url, error = %e, "Discarding model output"),
        }
        raw
    }

    /// Fields to request from the model, or `None` when no call is warranted.
    fn model_spec(&self, raw: &RawExtraction) -> Option<FieldSpec> {
        if !self.selectors.use_model_fallback {
            return None;
        }
        if MODEL_TRIGGER_FIELDS.iter().all(|f| raw.is_filled(*f)) {
            return None;
        }
        let fields: Vec<Field> = MODEL_FIELDS
            .into_iter()
            .filter(|f| !raw.is_filled(*f))
            .collect();
        let spec = FieldSpec::new(fields);
        Some(match raw.name() {
            Some(name) => spec.with_product_name(name),
            None => spec,
        })
    }
}

fn fill_markup(raw: &mut RawExtraction, evidence: &mut EvidenceTracker, field: Field, value: String) {
    let locator = MarkupProduct::locator(markup_key(field));
    fill(raw, evidence, field, value, ExtractionMethod::StructuredMarkup, locator);
}

fn fill_selector(raw: &mut RawExtraction, evidence: &mut EvidenceTracker, field: Field, found: Located) {
    fill(raw, evidence, field, found.value, ExtractionMethod::Selector, found.locator);
}

fn markup_key(field: Field) -> &'static str {
    match field {
        Field::ProductName => "name",
        Field::ImageUrl => "image",
        Field::Description => "description",
        Field::Ingredients => "ingredients",
        Field::Price => "offers.price",
    }
}

/// Set a text field and record its evidence.
fn fill(
    raw: &mut RawExtraction,
    evidence: &mut EvidenceTracker,
    field: Field,
    value: String,
    method: ExtractionMethod,
    locator: String,
) {
    evidence.record(field.as_str(), &locator, &value, method);
    let filled = Some(FieldValue::new(value, method, locator));
    match field {
        Field::ProductName => raw.name = filled,
        Field::Ingredients => raw.ingredients = filled,
        Field::ImageUrl => raw.image_url = filled,
        Field::Description => raw.description = filled,
        // Prices are numeric and set directly
        Field::Price => {}
    }
}

/// Copy grounded model values into empty requested fields.
fn apply_model_fields(raw: &mut RawExtraction, spec: &FieldSpec, fields: ModelFields, page_text: &str) {
    let haystack = normalize_for_match(page_text);
    let mut evidence = EvidenceTracker::new(raw.url.clone());

    let mut candidates: Vec<(Field, String)> = Vec::new();
    if let Some(name) = fields.product_name.filter(|n| grounded(n, &haystack)) {
        candidates.push((Field::ProductName, name.trim().to_string()));
    }
    if let Some(terms) = fields.inci_ingredients {
        let terms: Vec<String> = terms
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if !terms.is_empty() && terms.iter().all(|t| grounded(t, &haystack)) {
            candidates.push((Field::Ingredients, terms.join(", ")));
        } else if !terms.is_empty() {
            warn!(url = %raw.url, "Model ingredients not found in page text, discarding");
        }
    }
    if let Some(description) = fields.description.filter(|d| grounded(d, &haystack)) {
        candidates.push((Field::Description, description.trim().to_string()));
    }

    for (field, value) in candidates {
        if spec.wants(field) && !raw.is_filled(field) && !value.is_empty() {
            fill(
                raw,
                &mut evidence,
                field,
                value,
                ExtractionMethod::ModelAssisted,
                MODEL_LOCATOR.to_string(),
            );
        }
    }
    raw.evidence.extend(evidence.into_rows());
}

fn normalize_for_match(text: &str) -> String {
    markup::normalize_whitespace(text).to_lowercase()
}

fn grounded(value: &str, haystack: &str) -> bool {
    let needle = normalize_for_match(value);
    !needle.is_empty() && haystack.contains(&needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockModel, ProductPage};

    const URL: &str = "https://www.amend.com.br/shampoo-gold-black";
    const INCI: &str = "Aqua, Sodium Laureth Sulfate, Cocamidopropyl Betaine, Glycerin, Parfum, Citric Acid";

    fn extractor() -> Extractor {
        Extractor::new(SelectorConfig::default(), &PipelineConfig::default())
    }

    fn page(html: String) -> FetchedPage {
        FetchedPage::from_html(URL, html)
    }

    #[test]
    fn test_selectors_fill_fields_with_evidence() {
        let html = ProductPage::new("Shampoo Gold Black")
            .with_ingredients(INCI)
            .with_description("Limpeza suave")
            .to_html();
        let raw = extractor().extract_deterministic(URL, &page(html));

        assert_eq!(raw.name(), Some("Shampoo Gold Black"));
        assert_eq!(raw.ingredients_text(), Some(INCI));
        assert_eq!(raw.image_url(), Some("https://www.amend.com.br/img/product.jpg"));
        assert_eq!(raw.method_of(Field::Ingredients), Some(ExtractionMethod::Selector));
        assert_eq!(raw.ingredients.as_ref().unwrap().locator, ".product-ingredients p");

        // One evidence row per populated field
        let fields: Vec<&str> = raw.evidence.iter().map(|e| e.field()).collect();
        assert!(fields.contains(&"product_name"));
        assert!(fields.contains(&"inci_ingredients"));
        assert!(fields.contains(&"image_url_main"));
        assert!(fields.contains(&"description"));
        assert!(raw.evidence.iter().all(|e| e.source_url() == URL));
    }

    #[test]
    fn test_structured_markup_wins_over_selectors() {
        let html = ProductPage::new("Shampoo Gold Black")
            .with_price(49.9)
            .as_json_ld()
            .to_html()
            .replace("<main>", r#"<main><h1 class="product-name">Other heading</h1>"#);
        let raw = extractor().extract_deterministic(URL, &page(html));

        assert_eq!(raw.name(), Some("Shampoo Gold Black"));
        assert_eq!(raw.method_of(Field::ProductName), Some(ExtractionMethod::StructuredMarkup));
        assert_eq!(raw.name.as_ref().unwrap().locator, "json-ld @type=Product .name");
        assert_eq!(raw.price.as_ref().map(|p| p.value), Some(49.9));
        assert_eq!(raw.currency.as_deref(), Some("BRL"));
    }

    #[test]
    fn test_tab_label_fallback() {
        let html = format!(
            r#"<html><body><h1>Máscara Nutritiva</h1>
               <button>Composição</button><div>{}</div></body></html>"#,
            INCI
        );
        let raw = extractor().extract_deterministic(URL, &page(html));
        assert_eq!(raw.ingredients_text(), Some(INCI));
        assert_eq!(raw.ingredients.as_ref().unwrap().locator, "tab-label:composição");
    }

    #[tokio::test]
    async fn test_model_fills_missing_ingredients() {
        let html = format!(
            "<html><body><h1>Shampoo Gold</h1><p>Composição completa: {}</p></body></html>",
            INCI
        );
        let model = MockModel::new().with_default_reply(
            r#"{"inci_ingredients": ["Aqua", "Sodium Laureth Sulfate", "Cocamidopropyl Betaine", "Glycerin", "Parfum", "Citric Acid"]}"#,
        );
        let mut budget = BudgetTracker::new(5);

        let raw = extractor()
            .extract(URL, &page(html), Some(&model), &mut budget)
            .await;

        assert_eq!(raw.ingredients_text(), Some(INCI));
        assert_eq!(raw.method_of(Field::Ingredients), Some(ExtractionMethod::ModelAssisted));
        assert_eq!(raw.model_calls, 1);
        assert_eq!(budget.total_calls(), 1);
        // Name was already present, so only ingredients and description were requested
        assert_eq!(model.calls()[0].fields, vec![Field::Ingredients, Field::Description]);
        assert_eq!(model.calls()[0].product_name.as_deref(), Some("Shampoo Gold"));
        assert!(raw
            .evidence
            .iter()
            .any(|e| e.locator() == MODEL_LOCATOR && e.method() == ExtractionMethod::ModelAssisted));
    }

    #[tokio::test]
    async fn test_model_values_must_appear_in_page_text() {
        let html = "<html><body><h1>Shampoo Gold</h1><p>Sem lista.</p></body></html>".to_string();
        let model = MockModel::new().with_default_reply(
            r#"{"inci_ingredients": ["Aqua", "Glycerin", "Parfum", "Dimethicone", "Citric Acid"]}"#,
        );
        let mut budget = BudgetTracker::new(5);

        let raw = extractor()
            .extract(URL, &page(html), Some(&model), &mut budget)
            .await;
        assert!(raw.ingredients.is_none());
        // The call was still made and paid for
        assert_eq!(budget.total_calls(), 1);
    }

    #[tokio::test]
    async fn test_zero_budget_never_calls_model() {
        let html = ProductPage::new("Shampoo Gold").to_html();
        let model = MockModel::new().with_default_reply(r#"{"inci_ingredients": ["Aqua"]}"#);
        let mut budget = BudgetTracker::new(0);

        let raw = extractor()
            .extract(URL, &page(html), Some(&model), &mut budget)
            .await;

        assert_eq!(model.call_count(), 0);
        assert!(raw.ingredients.is_none());
        assert_eq!(raw.budget_denied, vec![Field::Ingredients, Field::Description]);
        assert_eq!(budget.denied_calls(), 1);
    }

    #[tokio::test]
    async fn test_malformed_and_failing_model_leave_fields_empty() {
        let html = ProductPage::new("Shampoo Gold").to_html();
        let mut budget = BudgetTracker::new(5);

        let garbled = MockModel::new().with_default_reply("no json here");
        let raw = extractor()
            .extract(URL, &page(html.clone()), Some(&garbled), &mut budget)
            .await;
        assert!(raw.ingredients.is_none());

        let down = MockModel::new().unavailable();
        let raw = extractor()
            .extract(URL, &page(html), Some(&down), &mut budget)
            .await;
        assert!(raw.ingredients.is_none());
        assert_eq!(budget.total_calls(), 2);
    }

    #[tokio::test]
    async fn test_no_model_call_when_name_and_ingredients_present() {
        let html = ProductPage::new("Shampoo Gold").with_ingredients(INCI).to_html();
        let model = MockModel::new();
        let mut budget = BudgetTracker::new(5);

        extractor()
            .extract(URL, &page(html), Some(&model), &mut budget)
            .await;
        assert_eq!(model.call_count(), 0);
        assert_eq!(budget.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_site_can_disable_model_fallback() {
        let selectors = SelectorConfig {
            use_model_fallback: false,
            ..Default::default()
        };
        let extractor = Extractor::new(selectors, &PipelineConfig::default());
        let model = MockModel::new();
        let mut budget = BudgetTracker::new(5);

        extractor
            .extract(URL, &page(ProductPage::empty().to_html()), Some(&model), &mut budget)
            .await;
        assert_eq!(model.call_count(), 0);
    }
}
