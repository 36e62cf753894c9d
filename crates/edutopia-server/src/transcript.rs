//! YouTube transcript analysis and summaries

use crate::error::{required, ApiError, ApiResult};
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use edutopia_core::youtube_video_id;
use serde::Deserialize;
use serde_json::{json, Value};

pub fn analysis_router(state: AppState) -> Router {
    Router::new()
        .route("/process_video", post(process_video))
        .with_state(state)
}

pub fn summary_router(state: AppState) -> Router {
    Router::new()
        .route("/summarize/video", post(summarize_video))
        .route("/summarize/text", post(summarize_text))
        .with_state(state)
}

#[derive(Deserialize)]
struct VideoRequest {
    video_url: Option<String>,
}

#[derive(Deserialize)]
struct TextRequest {
    text: Option<String>,
}

/// Video id and transcript for a request URL
async fn fetch_transcript(state: &AppState, url: Option<String>) -> ApiResult<(String, String)> {
    let url = required("video_url", url)?;
    let video_id = youtube_video_id(&url)
        .ok_or_else(|| ApiError::bad_request(format!("Invalid YouTube URL: {}", url)))?;
    tracing::info!("Fetching transcript for video {}", video_id);

    let transcript = state.transcripts.fetch(&video_id).await.map_err(|e| {
        tracing::error!("Could not retrieve transcript for {}: {}", video_id, e);
        ApiError::bad_request(format!("Could not retrieve video transcript: {}", e))
    })?;
    if transcript.trim().is_empty() {
        return Err(ApiError::bad_request("Could not retrieve video transcript"));
    }
    Ok((video_id, transcript))
}

async fn process_video(
    State(state): State<AppState>,
    body: Result<Json<VideoRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = body?;
    let (video_id, transcript) = fetch_transcript(&state, req.video_url).await?;

    let analysis = state.analyzer.analyze(&transcript).await.map_err(|e| {
        tracing::error!("Transcript analysis failed: {}", e);
        ApiError::internal(format!("Error in transcript analysis: {}", e))
    })?;
    tracing::info!("Analyzed transcript for video {}", video_id);

    Ok(Json(json!({
        "success": true,
        "video_id": video_id,
        "analysis": analysis.analysis,
        "sections": analysis.relevant_sections,
    })))
}

async fn summarize_video(
    State(state): State<AppState>,
    body: Result<Json<VideoRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = body?;
    let (_, transcript) = fetch_transcript(&state, req.video_url).await?;
    let summary = state.summarizer.summarize(&transcript).await?;
    Ok(Json(json!(summary)))
}

async fn summarize_text(
    State(state): State<AppState>,
    body: Result<Json<TextRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = body?;
    let text = required("text", req.text)?;
    let summary = state.summarizer.summarize(&text).await?;
    Ok(Json(json!(summary)))
}
