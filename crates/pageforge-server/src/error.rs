use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pageforge_shared::patch::PatchError;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Resource not found")]
    NotFound,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Slug already in use: {0}")]
    SlugConflict(String),

    #[error("Draft version conflict, current version is {0}")]
    VersionConflict(u64),

    #[error("Patch batch rejected")]
    PatchRejected(Vec<String>),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<PatchError> for AppError {
    fn from(e: PatchError) -> Self {
        match e {
            PatchError::Rejected(errors) => AppError::PatchRejected(errors),
            PatchError::Apply(msg) => AppError::Validation(format!("failed to apply patch: {}", msg)),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": self.to_string() }),
            ),
            AppError::NotFound => (StatusCode::NOT_FOUND, json!({ "error": self.to_string() })),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::SlugConflict(slug) => (
                StatusCode::CONFLICT,
                json!({ "error": self.to_string(), "slug": slug }),
            ),
            AppError::VersionConflict(current) => (
                StatusCode::CONFLICT,
                json!({ "error": self.to_string(), "currentVersion": current }),
            ),
            AppError::PatchRejected(errors) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": self.to_string(), "details": errors }),
            ),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
