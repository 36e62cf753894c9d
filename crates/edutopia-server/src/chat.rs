//! Conversational Q&A over a loaded context

use crate::error::{required, ApiResult};
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use edutopia_core::questions::{question_query, QuestionKind};
use serde::Deserialize;
use serde_json::{json, Value};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/context", post(load_context))
        .route("/query", post(query))
        .route("/health", get(health))
        .route("/api/health", get(api_health))
        .route("/api/load_context", post(api_load_context))
        .route("/api/chat", post(api_chat))
        .route("/api/generate_questions", post(api_generate_questions))
        .route("/api/save_conversation", post(api_save_conversation))
        .with_state(state)
}

#[derive(Deserialize)]
struct ContextRequest {
    context: Option<String>,
    #[serde(default)]
    user_str: String,
    #[serde(default)]
    ai_str: String,
}

#[derive(Deserialize)]
struct QueryRequest {
    query: Option<String>,
}

#[derive(Deserialize)]
struct LoadContextRequest {
    context: Option<String>,
    #[serde(default)]
    user_history: String,
    #[serde(default)]
    ai_history: String,
}

#[derive(Deserialize)]
struct ChatRequest {
    message: Option<String>,
}

#[derive(Deserialize)]
struct QuestionsRequest {
    text: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Deserialize)]
struct SaveConversationRequest {
    user_messages: Option<Vec<String>>,
    ai_messages: Option<Vec<String>>,
}

async fn load_context(
    State(state): State<AppState>,
    body: Result<Json<ContextRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = body?;
    let context = required("context", req.context)?;
    state
        .session
        .load(&context, &req.user_str, &req.ai_str)
        .await?;
    Ok(Json(json!({ "message": "Context loaded successfully" })))
}

async fn query(
    State(state): State<AppState>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = body?;
    let query = required("query", req.query)?;
    let response = state.agent.process_query(&query).await;
    Ok(Json(json!({ "response": response })))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "message": "API is running",
    }))
}

async fn api_health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "Chatbot API is running",
        "context_loaded": state.session.is_loaded().await,
        "metrics": state.metrics(),
    }))
}

async fn api_load_context(
    State(state): State<AppState>,
    body: Result<Json<LoadContextRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = body?;
    let context = required("context", req.context)?;
    let chunks = state
        .session
        .load(&context, &req.user_history, &req.ai_history)
        .await?;
    Ok(Json(json!({
        "status": "success",
        "message": "Context loaded successfully",
        "chunks": chunks,
    })))
}

async fn api_chat(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = body?;
    let message = required("message", req.message)?;
    let reply = state.agent.respond(&message).await;
    Ok(Json(json!({
        "status": "success",
        "message": reply.answer,
        "full_response": reply.transcript(),
    })))
}

async fn api_generate_questions(
    State(state): State<AppState>,
    body: Result<Json<QuestionsRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = body?;
    let text = required("text", req.text)?;
    let kind = QuestionKind::parse(req.kind.as_deref());
    let reply = state.agent.respond(&question_query(&text, kind)).await;
    Ok(Json(json!({
        "status": "success",
        "questions": reply.answer,
        "question_set": reply.questions,
    })))
}

async fn api_save_conversation(
    State(state): State<AppState>,
    body: Result<Json<SaveConversationRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = body?;
    let (Some(user_messages), Some(ai_messages)) = (req.user_messages, req.ai_messages) else {
        return Err(crate::error::ApiError::bad_request(
            "Missing conversation data in request body",
        ));
    };
    state
        .session
        .replace_history(&user_messages.join(","), &ai_messages.join(","))
        .await?;
    Ok(Json(json!({
        "status": "success",
        "message": "Conversation saved successfully",
    })))
}
