//! Conversation history.
//!
//! Process-lifetime store of (question, answer) turns keyed by a
//! client-supplied conversation id. Conversations are created on first
//! reference and never expire; everything is lost on restart. Appends go
//! through a single RwLock so concurrent requests cannot drop turns.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// One completed exchange. The answer may be a fallback message when the
/// request failed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Turn {
    pub question: String,
    pub answer: String,
}

impl Turn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

#[derive(Clone, Default)]
pub struct ConversationStore {
    inner: Arc<RwLock<HashMap<String, Vec<Turn>>>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a conversation's turns, oldest first. Unknown ids read
    /// as empty without creating the conversation.
    pub async fn history(&self, conversation_id: &str) -> Vec<Turn> {
        self.inner
            .read()
            .await
            .get(conversation_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Append a turn, creating the conversation on first use.
    pub async fn append(&self, conversation_id: &str, turn: Turn) {
        self.inner
            .write()
            .await
            .entry(conversation_id.to_string())
            .or_default()
            .push(turn);
    }

    /// Render a conversation as alternating User/Assistant lines for
    /// inclusion in the generation prompt.
    pub async fn transcript(&self, conversation_id: &str) -> String {
        render_transcript(&self.history(conversation_id).await)
    }

    pub async fn turn_count(&self, conversation_id: &str) -> usize {
        self.inner
            .read()
            .await
            .get(conversation_id)
            .map(|turns| turns.len())
            .unwrap_or(0)
    }
}

/// Pure formatting; no validation of content.
pub fn render_transcript(turns: &[Turn]) -> String {
    turns
        .iter()
        .map(|turn| format!("User: {}\nAssistant: {}", turn.question, turn.answer))
        .collect::<Vec<_>>()
        .join("\n")
}
