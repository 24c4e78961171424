use async_trait::async_trait;

use crate::core::errors::ChatError;

/// Remote language-model seam. One concrete implementation talks to the
/// Gemini API; tests substitute scripted providers.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g. "gemini").
    fn name(&self) -> &str;

    /// Single-prompt completion, non-streaming.
    async fn generate(&self, prompt: &str) -> Result<String, ChatError>;

    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ChatError>;
}
