//! OpenAI implementation of the model extractor.
//!
//! Sends the shared extraction prompt with a strict JSON-schema response
//! format, so the reply parses into [`ModelFields`](crate::traits::model::ModelFields)
//! without fence stripping in the common case.
//!
//! # Example
//!
//! ```rust,ignore
//! use inci_pipeline::ai::OpenAiExtractor;
//!
//! let model = OpenAiExtractor::from_env()?.with_model("gpt-4o-mini");
//! let engine = CoverageEngine::new(fetcher, store, labels).with_model(model);
//! ```

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{ConfigError, ModelError, ModelResult};
use crate::pipeline::prompts::{format_extract_prompt, SYSTEM_PROMPT};
use crate::traits::model::{FieldSpec, ModelExtractor, ModelResponse};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// OpenAI-backed model extractor.
pub struct OpenAiExtractor {
    client: Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl std::fmt::Debug for OpenAiExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiExtractor")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl OpenAiExtractor {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: SecretString::from(api_key.into()),
            model: DEFAULT_MODEL.to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    /// Create from environment variable `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ConfigError::Invalid("OPENAI_API_KEY not set".into()))?;
        Ok(Self::new(api_key))
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set a custom base URL (for Azure, proxies, compatible servers).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request(&self, spec: &FieldSpec, page_text: &str) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: format_extract_prompt(spec, page_text),
                },
            ],
            temperature: 0.0,
            response_format: json!({
                "type": "json_schema",
                "json_schema": {
                    "name": "product_fields",
                    "strict": true,
                    "schema": fields_schema(),
                }
            }),
        }
    }
}

/// Every field is required but nullable, as strict mode demands.
fn fields_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["product_name", "inci_ingredients", "image_url_main", "description", "price"],
        "properties": {
            "product_name": { "type": ["string", "null"] },
            "inci_ingredients": { "type": ["array", "null"], "items": { "type": "string" } },
            "image_url_main": { "type": ["string", "null"] },
            "description": { "type": ["string", "null"] },
            "price": { "type": ["number", "null"] }
        }
    })
}

#[async_trait]
impl ModelExtractor for OpenAiExtractor {
    async fn extract(&self, page_text: &str, spec: &FieldSpec) -> ModelResult<ModelResponse> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&self.request(spec, page_text))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::Timeout
                } else {
                    ModelError::Unavailable(Box::new(e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Unavailable(
                format!("OpenAI returned {}: {}", status, body).into(),
            ));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| ModelError::Malformed(e.to_string()))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ModelError::Malformed("no choices in response".into()))?;

        let usage = chat.usage.unwrap_or_default();
        Ok(ModelResponse::new(content).with_usage(usage.prompt_tokens, usage.completion_tokens))
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    response_format: serde_json::Value,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize, Default)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::product::Field;

    #[test]
    fn test_request_carries_prompt_and_schema() {
        let model = OpenAiExtractor::new("sk-test").with_model("gpt-4o");
        let spec = FieldSpec::new(vec![Field::Ingredients]).with_product_name("Shampoo Gold");
        let request = serde_json::to_value(model.request(&spec, "Composição: Aqua, Glycerin")).unwrap();

        assert_eq!(request["model"], "gpt-4o");
        assert_eq!(request["messages"][0]["content"], SYSTEM_PROMPT);
        let user = request["messages"][1]["content"].as_str().unwrap();
        assert!(user.contains("Shampoo Gold"));
        assert!(user.contains("inci_ingredients"));
        assert!(user.ends_with("Composição: Aqua, Glycerin"));
        assert_eq!(request["response_format"]["json_schema"]["strict"], true);
    }

    #[test]
    fn test_debug_redacts_key() {
        let model = OpenAiExtractor::new("sk-secret-value");
        assert!(!format!("{:?}", model).contains("sk-secret-value"));
    }

    #[test]
    fn test_usage_is_optional() {
        let chat: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"{}"}}]}"#).unwrap();
        assert!(chat.usage.is_none());
    }
}
