//! Error responses shared by every service

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use edutopia_core::EdutopiaError;
use serde_json::json;

/// Handler error rendered as `{error, message}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: &'static str,
    message: String,
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: "Bad request",
            message: message.into(),
        }
    }

    /// A required body field is absent or blank
    pub fn missing_field(field: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: "Missing required field",
            message: format!("Please provide '{}' in the request body", field),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            error: "Not found",
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            error: "Conflict",
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: "Internal server error",
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<EdutopiaError> for ApiError {
    fn from(err: EdutopiaError) -> Self {
        match err {
            EdutopiaError::NotFound(message) => Self::not_found(message),
            EdutopiaError::Conflict(message) => Self::conflict(message),
            err if err.is_client_error() => Self::bad_request(err.to_string()),
            err => {
                tracing::error!("Request failed: {}", err);
                Self::internal(err.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.error,
            "message": self.message,
        }));
        (self.status, body).into_response()
    }
}

/// Value of a required string field, rejecting absent and blank values
pub fn required(field: &str, value: Option<String>) -> ApiResult<String> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ApiError::missing_field(field)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_map_to_status() {
        let err: ApiError = EdutopiaError::InvalidInput("bad".into()).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err: ApiError = EdutopiaError::NotFound("gone".into()).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err: ApiError = EdutopiaError::Llm("down".into()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_required_rejects_blank() {
        assert_eq!(required("query", Some("hi".into())).unwrap(), "hi");
        assert!(required("query", Some("  ".into())).is_err());
        assert_eq!(
            required("query", None).unwrap_err().message,
            "Please provide 'query' in the request body"
        );
    }
}
