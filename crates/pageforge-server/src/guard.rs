use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::AppError;
use crate::routes::AppState;

/// Opaque allow/deny gate in front of the mutation API. When `EDIT_TOKEN` is
/// configured every editing request must carry it as a bearer token; role
/// interpretation belongs to whatever sits in front of this server.
pub async fn edit_guard(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = &state.config.edit_token else {
        return Ok(next.run(request).await);
    };

    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::Unauthorized)?;

    if token != expected {
        return Err(AppError::Unauthorized);
    }

    Ok(next.run(request).await)
}
