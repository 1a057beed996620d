//! Model-assisted extraction capability.
//!
//! The extractor hands the literal page text and the list of fields it
//! still needs; implementations wrap a specific provider and return the
//! raw completion. Parsing and budget accounting stay in the pipeline so
//! every backend is held to the same rules.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ModelResult;
use crate::types::product::Field;

/// What the model is asked to find.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Fields still empty after deterministic extraction
    pub fields: Vec<Field>,

    /// Product name, when already known, to anchor the model
    pub product_name: Option<String>,
}

impl FieldSpec {
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            fields,
            product_name: None,
        }
    }

    pub fn with_product_name(mut self, name: impl Into<String>) -> Self {
        self.product_name = Some(name.into());
        self
    }

    pub fn wants(&self, field: Field) -> bool {
        self.fields.contains(&field)
    }
}

/// Raw completion plus token usage when the backend reports it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    pub content: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl ModelResponse {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_usage(mut self, input_tokens: u64, output_tokens: u64) -> Self {
        self.input_tokens = input_tokens;
        self.output_tokens = output_tokens;
        self
    }
}

/// Structured fields the model may return. Absent means "not on the page".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelFields {
    pub product_name: Option<String>,
    pub inci_ingredients: Option<Vec<String>>,
    pub image_url_main: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
}

/// Model-assisted extraction trait.
#[async_trait]
pub trait ModelExtractor: Send + Sync {
    /// Extract `spec.fields` from `page_text`. The text is already truncated.
    async fn extract(&self, page_text: &str, spec: &FieldSpec) -> ModelResult<ModelResponse>;

    /// Backend name (for logging).
    fn name(&self) -> &str {
        "unknown"
    }
}

#[async_trait]
impl<M: ModelExtractor + ?Sized> ModelExtractor for std::sync::Arc<M> {
    async fn extract(&self, page_text: &str, spec: &FieldSpec) -> ModelResult<ModelResponse> {
        (**self).extract(page_text, spec).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// A model slot that is always empty. Tier 2 never runs.
pub struct NoModel;

#[async_trait]
impl ModelExtractor for NoModel {
    async fn extract(&self, _page_text: &str, _spec: &FieldSpec) -> ModelResult<ModelResponse> {
        Err(crate::error::ModelError::Unavailable(
            "no model backend configured".into(),
        ))
    }

    fn name(&self) -> &str {
        "none"
    }
}
