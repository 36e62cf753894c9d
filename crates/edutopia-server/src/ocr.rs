//! Document upload and text extraction

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::routing::post;
use axum::{Json, Router};
use edutopia_core::ocr::sanitize_filename;
use serde_json::{json, Value};

/// Largest accepted upload
const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/process_file", post(process_file))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

async fn process_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<Value>> {
    let mut multipart =
        multipart.map_err(|e| ApiError::bad_request(format!("Expected a multipart upload: {}", e)))?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Malformed upload: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Malformed upload: {}", e)))?;
        upload = Some((filename, bytes));
        break;
    }

    let Some((filename, bytes)) = upload else {
        return Err(ApiError::bad_request("No file provided"));
    };
    if filename.trim().is_empty() {
        return Err(ApiError::bad_request("Empty filename"));
    }
    if !state.ocr.is_allowed(&filename) {
        return Err(ApiError::bad_request(format!(
            "Unsupported file type: {}",
            filename
        )));
    }
    let request_id = uuid::Uuid::new_v4().to_string();
    let safe_name = sanitize_filename(&filename, &request_id);
    let config = state.ocr.config();
    let upload_dir = config.upload_dir.join(&request_id);
    let output_dir = config.output_dir.join(&request_id);
    tokio::fs::create_dir_all(&upload_dir)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to store upload: {}", e)))?;
    let path = upload_dir.join(&safe_name);
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to store upload: {}", e)))?;
    tracing::info!("Stored upload {} ({} bytes)", path.display(), bytes.len());

    let output = state
        .ocr
        .process_file(&path, &output_dir)
        .await
        .map_err(|e| {
            if e.is_client_error() {
                tracing::warn!("Rejected upload {}: {}", path.display(), e);
                return ApiError::bad_request(format!("Failed to process file: {}", e));
            }
            tracing::error!("Failed to process {}: {}", path.display(), e);
            ApiError::internal(format!("Failed to process file: {}", e))
        })?;

    Ok(Json(json!({
        "success": true,
        "message": "Text extracted successfully",
        "extracted_text": output.combined_text,
    })))
}
