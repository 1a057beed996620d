//! Testing utilities including mock implementations.
//!
//! These let applications exercise the pipeline without real model calls
//! or network access.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use crate::error::{ModelError, ModelResult};
use crate::fetchers::MockFetcher;
use crate::traits::model::{FieldSpec, ModelExtractor, ModelResponse};
use crate::types::product::Field;
use crate::types::site::{Site, SiteConfig};

/// A mock model-assisted extractor.
///
/// Replies are chosen by the first rule whose marker occurs in the page
/// text, falling back to a default reply. Every call is recorded.
#[derive(Default, Clone)]
pub struct MockModel {
    /// (marker, reply) pairs, checked in insertion order
    rules: Arc<RwLock<Vec<(String, String)>>>,

    /// Reply when no rule matches
    default_reply: Option<String>,

    /// Token usage reported with every reply
    usage: (u64, u64),

    /// Fail every call as unavailable
    unavailable: bool,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<MockModelCall>>>,
}

/// Record of a call made to the mock model.
#[derive(Debug, Clone, PartialEq)]
pub struct MockModelCall {
    pub fields: Vec<Field>,
    pub product_name: Option<String>,
    pub text_len: usize,
}

impl MockModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `json` when `marker` occurs in the page text.
    pub fn with_reply_for(self, marker: impl Into<String>, json: impl Into<String>) -> Self {
        self.rules.write().unwrap().push((marker.into(), json.into()));
        self
    }

    /// Reply with `json` when no rule matches.
    pub fn with_default_reply(mut self, json: impl Into<String>) -> Self {
        self.default_reply = Some(json.into());
        self
    }

    /// Report this token usage with each reply.
    pub fn with_usage(mut self, input_tokens: u64, output_tokens: u64) -> Self {
        self.usage = (input_tokens, output_tokens);
        self
    }

    /// Fail every call.
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }

    pub fn calls(&self) -> Vec<MockModelCall> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl ModelExtractor for MockModel {
    async fn extract(&self, page_text: &str, spec: &FieldSpec) -> ModelResult<ModelResponse> {
        self.calls.write().unwrap().push(MockModelCall {
            fields: spec.fields.clone(),
            product_name: spec.product_name.clone(),
            text_len: page_text.chars().count(),
        });

        if self.unavailable {
            return Err(ModelError::Unavailable("mock model unavailable".into()));
        }

        let reply = self
            .rules
            .read()
            .unwrap()
            .iter()
            .find(|(marker, _)| page_text.contains(marker.as_str()))
            .map(|(_, reply)| reply.clone())
            .or_else(|| self.default_reply.clone())
            .unwrap_or_else(|| "{}".to_string());

        Ok(ModelResponse::new(reply).with_usage(self.usage.0, self.usage.1))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// HTML for a synthetic product page.
#[derive(Debug, Clone)]
pub struct ProductPage {
    name: Option<String>,
    image: Option<String>,
    ingredients: Option<String>,
    description: Option<String>,
    price: Option<f64>,
    json_ld: bool,
}

impl ProductPage {
    /// A page with a name heading and a product image.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            image: Some("/img/product.jpg".to_string()),
            ingredients: None,
            description: None,
            price: None,
            json_ld: false,
        }
    }

    /// A page with none of the usual product elements.
    pub fn empty() -> Self {
        Self {
            name: None,
            image: None,
            ingredients: None,
            description: None,
            price: None,
            json_ld: false,
        }
    }

    pub fn with_ingredients(mut self, text: impl Into<String>) -> Self {
        self.ingredients = Some(text.into());
        self
    }

    pub fn with_description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn with_image(mut self, src: impl Into<String>) -> Self {
        self.image = Some(src.into());
        self
    }

    pub fn without_image(mut self) -> Self {
        self.image = None;
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    /// Emit name/image/description/price as JSON-LD instead of markup.
    pub fn as_json_ld(mut self) -> Self {
        self.json_ld = true;
        self
    }

    pub fn to_html(&self) -> String {
        let mut head = String::new();
        let mut body = String::new();

        if self.json_ld {
            let mut product = serde_json::json!({
                "@context": "https://schema.org",
                "@type": "Product",
            });
            if let Some(name) = &self.name {
                product["name"] = name.as_str().into();
            }
            if let Some(image) = &self.image {
                product["image"] = image.as_str().into();
            }
            if let Some(description) = &self.description {
                product["description"] = description.as_str().into();
            }
            if let Some(price) = self.price {
                product["offers"] = serde_json::json!({"@type": "Offer", "price": price});
            }
            head.push_str(&format!(
                r#"<script type="application/ld+json">{}</script>"#,
                product
            ));
        } else {
            if let Some(name) = &self.name {
                body.push_str(&format!(r#"<h1 class="product-name">{}</h1>"#, name));
            }
            if let Some(image) = &self.image {
                body.push_str(&format!(
                    r#"<div class="product-image"><img src="{}" alt="product"></div>"#,
                    image
                ));
            }
            if let Some(description) = &self.description {
                body.push_str(&format!(
                    r#"<div class="product-description">{}</div>"#,
                    description
                ));
            }
        }

        if let Some(ingredients) = &self.ingredients {
            body.push_str(&format!(
                r#"<div class="product-ingredients"><p>{}</p></div>"#,
                ingredients
            ));
        }

        format!(
            "<html><head>{}</head><body><main>{}</main></body></html>",
            head, body
        )
    }
}

/// A synthetic site: configuration plus a mock fetcher serving its pages.
///
/// Product URLs are listed in a sitemap at `https://<domain>/sitemap.xml`
/// in insertion order.
pub struct TestSite {
    pub config: SiteConfig,
    pub fetcher: MockFetcher,
    base: String,
    sitemap: Vec<String>,
}

impl TestSite {
    pub fn new(slug: &str, domain: &str) -> Self {
        let base = format!("https://{}", domain);
        let mut config = SiteConfig::new(Site::new(slug, domain));
        config.discovery.sitemap_urls = vec![format!("{}/sitemap.xml", base)];
        Self {
            config,
            fetcher: MockFetcher::new(),
            base,
            sitemap: Vec::new(),
        }
    }

    /// Absolute URL for a site path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Serve a product page at `path` and list it in the sitemap.
    pub fn with_product(mut self, path: &str, page: ProductPage) -> Self {
        let url = self.url(path);
        self.fetcher.add_page(url.clone(), page.to_html());
        self.sitemap.push(url);
        self.publish_sitemap();
        self
    }

    /// List a URL in the sitemap without serving it.
    pub fn with_listed_url(mut self, url: impl Into<String>) -> Self {
        self.sitemap.push(url.into());
        self.publish_sitemap();
        self
    }

    /// Serve a URL that fails to fetch, listed in the sitemap.
    pub fn with_broken_product(mut self, path: &str) -> Self {
        let url = self.url(path);
        self.fetcher.add_failure(url.clone());
        self.sitemap.push(url);
        self.publish_sitemap();
        self
    }

    /// Stop listing `path` in the sitemap. The page is still served.
    pub fn remove_from_sitemap(&mut self, path: &str) {
        let url = self.url(path);
        self.sitemap.retain(|u| *u != url);
        self.publish_sitemap();
    }

    fn publish_sitemap(&self) {
        self.fetcher
            .add_page(format!("{}/sitemap.xml", self.base), sitemap_xml(&self.sitemap));
    }
}

/// A `<urlset>` sitemap listing `urls`.
pub fn sitemap_xml(urls: &[String]) -> String {
    let entries: String = urls
        .iter()
        .map(|u| format!("<url><loc>{}</loc></url>", u))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{}</urlset>"#,
        entries
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_model_rules_and_tracking() {
        let model = MockModel::new()
            .with_reply_for("Gold", r#"{"product_name": "Gold"}"#)
            .with_default_reply(r#"{"product_name": null}"#)
            .with_usage(100, 10);

        let spec = FieldSpec::new(vec![Field::ProductName]);
        let reply = model.extract("Shampoo Gold", &spec).await.unwrap();
        assert!(reply.content.contains("Gold"));
        assert_eq!(reply.input_tokens, 100);

        let reply = model.extract("Other", &spec).await.unwrap();
        assert!(reply.content.contains("null"));
        assert_eq!(model.call_count(), 2);
        assert_eq!(model.calls()[0].fields, vec![Field::ProductName]);
    }

    #[test]
    fn test_product_page_html() {
        let html = ProductPage::new("Shampoo X")
            .with_ingredients("Aqua, Glycerin")
            .to_html();
        assert!(html.contains(r#"<h1 class="product-name">Shampoo X</h1>"#));
        assert!(html.contains("Aqua, Glycerin"));

        let html = ProductPage::new("Shampoo X").as_json_ld().to_html();
        assert!(html.contains("application/ld+json"));
        assert!(!html.contains("<h1"));
    }

    #[test]
    fn test_site_sitemap_lists_products() {
        let site = TestSite::new("amend", "amend.com.br")
            .with_product("/shampoo-gold-black", ProductPage::new("Shampoo Gold Black"));
        assert_eq!(site.config.slug(), "amend");
        assert_eq!(site.url("/a"), "https://amend.com.br/a");
        assert!(sitemap_xml(&site.sitemap).contains("https://amend.com.br/shampoo-gold-black"));
    }
}
