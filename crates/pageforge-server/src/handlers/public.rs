use axum::{
    extract::{Path, State},
    Json,
};
use pageforge_shared::PublicPage;

use crate::error::AppError;
use crate::routes::AppState;

/// GET /api/public/pages/:slug
///
/// Serves the published snapshot only; a page that has never been published
/// does not exist as far as public readers are concerned.
pub async fn get_public_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PublicPage>, AppError> {
    let record = state
        .store
        .get_by_slug(&slug)
        .await?
        .ok_or(AppError::NotFound)?;

    let schema = record.published.schema.ok_or(AppError::NotFound)?;

    Ok(Json(PublicPage {
        slug: record.slug,
        title: record.title,
        schema,
    }))
}
