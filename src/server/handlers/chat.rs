//! The chat endpoint.
//!
//! Orchestrates one exchange: snapshot the conversation, retrieve context,
//! compose the prompt, call the generator, append the turn. Failures map to
//! a category-specific fallback message which is still recorded as the
//! turn's answer, then surfaced as HTTP 500.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::core::errors::ChatError;
use crate::history::Turn;
use crate::prompt::build_prompt;
use crate::state::AppState;

pub const DEFAULT_CONVERSATION_ID: &str = "default";

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub question: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SourceDocument {
    pub source: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub conversation_id: String,
    /// [question, answer] pairs, oldest first.
    pub history: Vec<(String, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_documents: Option<Vec<SourceDocument>>,
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequest>,
) -> Response {
    let conversation_id = payload
        .conversation_id
        .unwrap_or_else(|| DEFAULT_CONVERSATION_ID.to_string());
    let question = payload.question;

    let transcript = state.conversations.transcript(&conversation_id).await;

    match answer(&state, &question, &transcript).await {
        Ok((response, sources)) => {
            tracing::info!("Generated response for '{}'", question);
            state
                .conversations
                .append(&conversation_id, Turn::new(question.clone(), response.clone()))
                .await;

            let history = history_pairs(&state, &conversation_id).await;
            (
                StatusCode::OK,
                Json(ChatResponse {
                    response,
                    conversation_id,
                    history,
                    source_documents: Some(sources),
                }),
            )
                .into_response()
        }
        Err(err) => {
            tracing::error!("Chat request failed for '{}': {}", question, err);
            let fallback = err.fallback_message();

            // the body carries the pre-failure history; the fallback turn
            // is still recorded in the store
            let history = history_pairs(&state, &conversation_id).await;
            state
                .conversations
                .append(&conversation_id, Turn::new(question, fallback.clone()))
                .await;

            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ChatResponse {
                    response: fallback,
                    conversation_id,
                    history,
                    source_documents: None,
                }),
            )
                .into_response()
        }
    }
}

async fn answer(
    state: &AppState,
    question: &str,
    transcript: &str,
) -> Result<(String, Vec<SourceDocument>), ChatError> {
    let hits = state
        .retriever
        .search(question, state.config.retrieval.top_k)
        .await?;

    let context = hits
        .iter()
        .map(|hit| hit.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    let prompt = build_prompt(&context, transcript, question);
    let response = state.generator.generate(&prompt).await?;

    let sources = hits
        .into_iter()
        .map(|hit| SourceDocument {
            source: hit.chunk.source,
            content: hit.chunk.text,
        })
        .collect();

    Ok((response, sources))
}

async fn history_pairs(state: &AppState, conversation_id: &str) -> Vec<(String, String)> {
    state
        .conversations
        .history(conversation_id)
        .await
        .into_iter()
        .map(|turn| (turn.question, turn.answer))
        .collect()
}
