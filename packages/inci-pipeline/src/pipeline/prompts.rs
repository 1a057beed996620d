//! Prompts for model-assisted extraction, and parsing of the reply.

use crate::error::{ModelError, ModelResult};
use crate::traits::model::{FieldSpec, ModelFields};
use crate::types::product::Field;

/// System prompt shared by every backend.
pub const SYSTEM_PROMPT: &str = "You are a hair product data extractor. Extract ONLY information \
present in the provided page text. If a field is not found, return null. Never hallucinate or \
infer data not explicitly present.";

/// Prompt for extracting missing product fields from page text.
pub const EXTRACT_FIELDS_PROMPT: &str = r#"Extract the following fields from this hair product page.
Product: {product}

Return JSON with these fields:
{fields}

IMPORTANT: Only extract INCI ingredients if you find a complete ingredient list
(typically starting with 'Aqua' or 'Water'). Do NOT guess or infer any value.
Fields not listed above must be null.

---PAGE TEXT---
{content}"#;

fn describe(field: Field) -> &'static str {
    match field {
        Field::ProductName => "- product_name: the product's name as written on the page, or null",
        Field::Ingredients => {
            "- inci_ingredients: list of individual INCI ingredient names (strings), or null if not found"
        }
        Field::ImageUrl => "- image_url_main: absolute URL of the main product image, or null",
        Field::Description => "- description: product description text, or null if not found",
        Field::Price => "- price: numeric price without currency symbol, or null",
    }
}

/// Format the extraction prompt for the fields in `spec`.
pub fn format_extract_prompt(spec: &FieldSpec, page_text: &str) -> String {
    let fields = spec
        .fields
        .iter()
        .map(|f| describe(*f))
        .collect::<Vec<_>>()
        .join("\n");

    EXTRACT_FIELDS_PROMPT
        .replace("{product}", spec.product_name.as_deref().unwrap_or("unknown"))
        .replace("{fields}", &fields)
        .replace("{content}", page_text)
}

/// Truncate page text to the model's character budget.
pub fn truncate_page_text(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Parse a model reply, accepting bare JSON or JSON inside a code fence.
pub fn parse_model_fields(content: &str) -> ModelResult<ModelFields> {
    let trimmed = content.trim();
    if let Ok(fields) = serde_json::from_str(trimmed) {
        return Ok(fields);
    }
    let fenced = fenced_block(trimmed)
        .ok_or_else(|| ModelError::Malformed(snippet(trimmed)))?;
    serde_json::from_str(fenced).map_err(|e| ModelError::Malformed(format!("{}: {}", e, snippet(fenced))))
}

fn fenced_block(text: &str) -> Option<&str> {
    let start = match text.find("```json") {
        Some(i) => i + "```json".len(),
        None => text.find("```")? + "```".len(),
    };
    let rest = &text[start..];
    let end = rest.find("```")?;
    Some(rest[..end].trim())
}

fn snippet(text: &str) -> String {
    truncate_page_text(text, 120).to_string()
}
