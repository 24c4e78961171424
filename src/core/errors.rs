use thiserror::Error;

/// Failures raised by the retriever or generator while answering a chat
/// request. Each variant carries the upstream message; the variant decides
/// which fallback text the user sees.
#[derive(Debug, Clone, Error)]
pub enum ChatError {
    #[error("quota exceeded: {0}")]
    Quota(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("{0}")]
    Upstream(String),
}

impl ChatError {
    /// Classify an untagged error message by its text. Collaborators that
    /// know the real cause (HTTP status codes, API error payloads) tag the
    /// variant directly; this is the single fallback for everything else,
    /// e.g. transport errors.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();

        if message.contains("429")
            || message.contains("quota")
            || message.contains("ResourceExhausted")
        {
            ChatError::Quota(message)
        } else if message.contains("401") || lower.contains("unauthorized") {
            ChatError::Unauthorized(message)
        } else if lower.contains("model") {
            ChatError::ModelUnavailable(message)
        } else {
            ChatError::Upstream(message)
        }
    }

    /// The canned message substituted for the answer when a request fails.
    pub fn fallback_message(&self) -> String {
        match self {
            ChatError::Quota(_) => {
                "Sorry, the Gemini API quota has been reached. Try again later.".to_string()
            }
            ChatError::Unauthorized(_) => {
                "Authentication error: invalid API key. Check your key.".to_string()
            }
            ChatError::ModelUnavailable(_) => {
                "Gemini model unavailable. Check the model configuration.".to_string()
            }
            ChatError::Upstream(message) => format!("Error: {}", message),
        }
    }
}
