//! Gemini API client.
//!
//! Thin reqwest wrapper over the Generative Language API. HTTP status and
//! API error payloads are mapped to `ChatError` variants here, at the
//! boundary, so nothing downstream re-parses message text.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use super::provider::LlmProvider;
use crate::config::GeminiConfig;
use crate::core::errors::ChatError;

#[derive(Clone)]
pub struct GeminiProvider {
    base_url: String,
    api_key: String,
    model: String,
    embedding_model: String,
    client: Client,
}

impl GeminiProvider {
    pub fn new(config: &GeminiConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            embedding_model: config.embedding_model.clone(),
            client: Client::new(),
        }
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!(
            "{}/models/{}:{}?key={}",
            self.base_url, model, method, self.api_key
        )
    }

    /// Map a non-success response to the tagged error kind.
    fn error_for(status: StatusCode, body: &str) -> ChatError {
        let lower = body.to_lowercase();
        match status {
            StatusCode::TOO_MANY_REQUESTS => ChatError::Quota(body.to_string()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ChatError::Unauthorized(body.to_string())
            }
            StatusCode::NOT_FOUND if lower.contains("model") => {
                ChatError::ModelUnavailable(body.to_string())
            }
            _ if lower.contains("resource_exhausted") || lower.contains("quota") => {
                ChatError::Quota(body.to_string())
            }
            _ => ChatError::classify(format!("{}: {}", status, body)),
        }
    }

    async fn post(&self, url: &str, body: Value) -> Result<Value, ChatError> {
        let res = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|err| ChatError::classify(err.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(Self::error_for(status, &text));
        }

        res.json::<Value>()
            .await
            .map_err(|err| ChatError::classify(err.to_string()))
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, prompt: &str) -> Result<String, ChatError> {
        let url = self.endpoint(&self.model, "generateContent");
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let payload = self.post(&url, body).await?;

        payload["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(|text| text.trim().to_string())
            .ok_or_else(|| ChatError::Upstream("empty response from Gemini".to_string()))
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ChatError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.endpoint(&self.embedding_model, "batchEmbedContents");
        let requests: Vec<Value> = inputs
            .iter()
            .map(|text| {
                json!({
                    "model": format!("models/{}", self.embedding_model),
                    "content": { "parts": [{ "text": text }] }
                })
            })
            .collect();

        let payload = self.post(&url, json!({ "requests": requests })).await?;

        let embeddings = payload["embeddings"]
            .as_array()
            .ok_or_else(|| ChatError::Upstream("malformed embedding response".to_string()))?
            .iter()
            .map(|item| {
                item["values"]
                    .as_array()
                    .map(|vals| {
                        vals.iter()
                            .filter_map(|v| v.as_f64().map(|f| f as f32))
                            .collect::<Vec<f32>>()
                    })
                    .ok_or_else(|| ChatError::Upstream("malformed embedding response".to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if embeddings.len() != inputs.len() {
            return Err(ChatError::Upstream(format!(
                "expected {} embeddings, got {}",
                inputs.len(),
                embeddings.len()
            )));
        }

        Ok(embeddings)
    }
}
