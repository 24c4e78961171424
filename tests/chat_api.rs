//! End-to-end tests for the chat API, driving the axum router with a
//! scripted LLM provider.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tower::ServiceExt;

use lunachat_backend::config::Config;
use lunachat_backend::core::errors::ChatError;
use lunachat_backend::llm::provider::LlmProvider;
use lunachat_backend::rag::chunker::DocumentChunk;
use lunachat_backend::rag::keyword::KeywordRetriever;
use lunachat_backend::server::router::router;
use lunachat_backend::state::AppState;

/// Replies with a fixed answer (or a fixed error) and records every prompt
/// it sees.
struct ScriptedProvider {
    reply: Result<String, ChatError>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn failing(error: ChatError) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(error),
            prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str) -> Result<String, ChatError> {
        self.prompts.lock().await.push(prompt.to_string());
        self.reply.clone()
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ChatError> {
        Ok(inputs.iter().map(|_| vec![0.0]).collect())
    }
}

fn corpus() -> Vec<DocumentChunk> {
    vec![
        DocumentChunk {
            id: "1".to_string(),
            text: "The moon orbits the earth.".to_string(),
            source: "doc1.txt".to_string(),
            start_offset: 0,
            chunk_index: 0,
        },
        DocumentChunk {
            id: "2".to_string(),
            text: "Tides follow the moon.".to_string(),
            source: "doc2.txt".to_string(),
            start_offset: 0,
            chunk_index: 0,
        },
    ]
}

fn test_state(provider: Arc<ScriptedProvider>) -> Arc<AppState> {
    let chunks = corpus();
    let count = chunks.len();
    AppState::new(
        Config::default(),
        Arc::new(KeywordRetriever::new(chunks)),
        provider,
        count,
        false,
    )
}

async fn post_chat(app: axum::Router, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/chat")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value: Value = serde_json::from_slice(&bytes).unwrap();
    (status, value)
}

#[tokio::test]
async fn successful_chat_appends_one_turn() {
    let provider = ScriptedProvider::replying("The moon causes tides.");
    let state = test_state(provider.clone());
    let app = router(state.clone());

    let before = state.conversations.turn_count("c1").await;
    let (status, body) = post_chat(
        app,
        json!({ "question": "what about the moon?", "conversation_id": "c1" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "The moon causes tides.");
    assert_eq!(body["conversation_id"], "c1");

    assert_eq!(state.conversations.turn_count("c1").await, before + 1);
    let turns = state.conversations.history("c1").await;
    assert_eq!(turns.last().unwrap().question, "what about the moon?");
    assert_eq!(turns.last().unwrap().answer, "The moon causes tides.");

    // the response history includes the new turn as a [q, a] pair
    let history = body["history"].as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0][0], "what about the moon?");
    assert_eq!(history[0][1], "The moon causes tides.");
}

#[tokio::test]
async fn retrieved_sources_are_returned_and_prompted() {
    let provider = ScriptedProvider::replying("ok");
    let state = test_state(provider.clone());
    let app = router(state);

    let (status, body) = post_chat(app, json!({ "question": "moon tides" })).await;
    assert_eq!(status, StatusCode::OK);

    let sources = body["source_documents"].as_array().unwrap();
    assert!(!sources.is_empty());
    assert!(sources.len() <= 3);
    let names: Vec<&str> = sources.iter().map(|s| s["source"].as_str().unwrap()).collect();
    assert!(names.contains(&"doc1.txt"));
    assert!(names.contains(&"doc2.txt"));

    // retrieved chunk text made it into the generation prompt
    let prompts = provider.prompts.lock().await;
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("The moon orbits the earth."));
    assert!(prompts[0].contains("User: moon tides"));
}

#[tokio::test]
async fn prior_turns_appear_in_the_prompt() {
    let provider = ScriptedProvider::replying("answer");
    let state = test_state(provider.clone());

    let (status, _) = post_chat(
        router(state.clone()),
        json!({ "question": "first question", "conversation_id": "c1" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post_chat(
        router(state),
        json!({ "question": "second question", "conversation_id": "c1" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["history"].as_array().unwrap().len(), 2);

    let prompts = provider.prompts.lock().await;
    assert!(prompts[1].contains("User: first question\nAssistant: answer"));
}

#[tokio::test]
async fn failed_chat_returns_500_and_records_fallback() {
    let provider = ScriptedProvider::failing(ChatError::Quota("429".to_string()));
    let state = test_state(provider);
    let app = router(state.clone());

    let (status, body) = post_chat(
        app,
        json!({ "question": "anything", "conversation_id": "c1" }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let fallback = body["response"].as_str().unwrap();
    assert_eq!(
        fallback,
        "Sorry, the Gemini API quota has been reached. Try again later."
    );
    // the failed turn is not echoed in the body...
    assert_eq!(body["history"].as_array().unwrap().len(), 0);
    assert!(body.get("source_documents").is_none());

    // ...but it is recorded in the store, fallback as the answer
    let turns = state.conversations.history("c1").await;
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].question, "anything");
    assert_eq!(turns[0].answer, fallback);
}

#[tokio::test]
async fn fallback_category_follows_error_kind() {
    for (error, expected) in [
        (
            ChatError::Unauthorized("401".to_string()),
            "Authentication error: invalid API key. Check your key.",
        ),
        (
            ChatError::ModelUnavailable("missing".to_string()),
            "Gemini model unavailable. Check the model configuration.",
        ),
        (
            ChatError::Upstream("connection reset".to_string()),
            "Error: connection reset",
        ),
    ] {
        let state = test_state(ScriptedProvider::failing(error));
        let (status, body) = post_chat(router(state), json!({ "question": "q" })).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["response"], expected);
    }
}

#[tokio::test]
async fn conversations_do_not_leak_across_ids() {
    let state = test_state(ScriptedProvider::replying("a"));

    post_chat(
        router(state.clone()),
        json!({ "question": "q1", "conversation_id": "alice" }),
    )
    .await;
    let (_, body) = post_chat(
        router(state.clone()),
        json!({ "question": "q2", "conversation_id": "bob" }),
    )
    .await;

    // bob's first response sees only bob's turn
    assert_eq!(body["history"].as_array().unwrap().len(), 1);
    assert_eq!(state.conversations.turn_count("alice").await, 1);
    assert_eq!(state.conversations.turn_count("bob").await, 1);
}

#[tokio::test]
async fn omitted_conversation_id_is_default() {
    let state = test_state(ScriptedProvider::replying("a"));

    let (_, body) = post_chat(router(state.clone()), json!({ "question": "q1" })).await;
    assert_eq!(body["conversation_id"], "default");

    // an explicit "default" sees the same thread
    let (_, body) = post_chat(
        router(state.clone()),
        json!({ "question": "q2", "conversation_id": "default" }),
    )
    .await;
    assert_eq!(body["history"].as_array().unwrap().len(), 2);
    assert_eq!(state.conversations.turn_count("default").await, 2);
}

#[tokio::test]
async fn health_reports_backend_and_corpus() {
    let state = test_state(ScriptedProvider::replying("a"));
    let response = router(state)
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["backend"], "keyword");
    assert_eq!(body["chunks"], 2);
    assert_eq!(body["degraded"], false);
}

#[tokio::test]
async fn index_serves_the_chat_page() {
    let state = test_state(ScriptedProvider::replying("a"));
    let response = router(state)
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let page = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(page.contains("LunaChat"));
}
