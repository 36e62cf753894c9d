//! Diagram extraction from lecture videos

use crate::error::{required, ApiError, ApiResult};
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/process_video", post(process_video))
        .route("/get_results/:session_id", get(get_results).delete(cancel_job))
        .route("/detect_objects", post(detect_objects))
        .with_state(state)
}

#[derive(Deserialize)]
struct ProcessRequest {
    video_url: Option<String>,
    session_id: Option<String>,
}

#[derive(Deserialize)]
struct DetectRequest {
    video_url: Option<String>,
}

async fn process_video(
    State(state): State<AppState>,
    body: Result<Json<ProcessRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = body?;
    let video_url = required("video_url", req.video_url)?;
    let session_id = state.jobs.submit(req.session_id, video_url)?;

    Ok(Json(json!({
        "success": true,
        "message": "Video processing started",
        "session_id": session_id,
    })))
}

async fn get_results(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let job = state
        .jobs
        .status(&session_id)
        .ok_or_else(|| ApiError::not_found(format!("Session {} not found", session_id)))?;

    Ok(Json(json!({
        "success": true,
        "status": job.status,
        "message": job.message,
        "session_id": job.session_id,
        "detected_objects": job.detected_objects,
        "object_count": job.object_count,
    })))
}

async fn cancel_job(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<Value>> {
    if state.jobs.status(&session_id).is_none() {
        return Err(ApiError::not_found(format!(
            "Session {} not found",
            session_id
        )));
    }
    let cancelled = state.jobs.cancel(&session_id);
    let message = if cancelled {
        "Cancellation requested"
    } else {
        "Session already finished"
    };
    Ok(Json(json!({
        "success": cancelled,
        "message": message,
        "session_id": session_id,
    })))
}

/// Synchronous extraction under the job cap; crops expire with the session
async fn detect_objects(
    State(state): State<AppState>,
    body: Result<Json<DetectRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = body?;
    let video_url = required("video_url", req.video_url)?;
    let (session_id, extraction) = state.jobs.run_sync(&video_url).await?;

    Ok(Json(json!({
        "success": true,
        "message": extraction.message(),
        "session_id": session_id,
        "detected_objects": extraction.objects,
        "object_count": extraction.object_count,
    })))
}
