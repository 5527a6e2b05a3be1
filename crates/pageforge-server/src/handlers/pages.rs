use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use pageforge_shared::{
    api::{CreatePageRequest, DuplicatePageRequest, RenamePageRequest, SavePageRequest, SavePayload},
    patch, BlobTarget, HistoryItem, HistoryOp, PageRecord, PageStatus, PageSummary,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::routes::AppState;
use crate::store::normalize_slug;

/// Resolve and validate a slug for create/rename/duplicate. Empty after
/// normalization is an invalid slug, not a conflict.
fn checked_slug(raw: &str) -> Result<String, AppError> {
    let slug = normalize_slug(raw);
    if slug.is_empty() {
        return Err(AppError::Validation(format!(
            "slug \"{}\" contains no usable characters",
            raw
        )));
    }
    Ok(slug)
}

async fn load_page(state: &AppState, id: Uuid) -> Result<PageRecord, AppError> {
    state.store.get(id).await?.ok_or(AppError::NotFound)
}

/// GET /api/pages
pub async fn list_pages(State(state): State<AppState>) -> Result<Json<Vec<PageSummary>>, AppError> {
    let records = state.store.list().await?;
    Ok(Json(records.iter().map(PageRecord::summary).collect()))
}

/// POST /api/pages
pub async fn create_page(
    State(state): State<AppState>,
    Json(req): Json<CreatePageRequest>,
) -> Result<(StatusCode, Json<PageRecord>), AppError> {
    let slug = checked_slug(&req.slug)?;
    if state.store.slug_taken(&slug).await? {
        return Err(AppError::SlugConflict(slug));
    }

    let title = if req.title.trim().is_empty() {
        slug.clone()
    } else {
        req.title
    };

    let record = PageRecord::new(slug, title);
    state.store.put(&record).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /api/pages/:id
pub async fn get_page(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PageRecord>, AppError> {
    Ok(Json(load_page(&state, id).await?))
}

/// PUT /api/pages/:id
///
/// Draft mutation. Optimistic concurrency: a stale `baseVersion` is rejected
/// with the current version and nothing changes; the caller re-fetches and
/// resubmits.
pub async fn save_page(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SavePageRequest>,
) -> Result<Json<PageRecord>, AppError> {
    let mut record = load_page(&state, id).await?;

    if let Some(base) = req.base_version {
        if base != record.draft.version {
            return Err(AppError::VersionConflict(record.draft.version));
        }
    }

    let new_schema = match &req.payload {
        SavePayload::Schema { schema } => schema.clone(),
        SavePayload::Patches { patches } => {
            patch::apply_with_validation(&record.draft.schema, patches)?
        }
    };

    let diff = patch::diff(&record.draft.schema, &new_schema);
    let from_version = record.draft.version;
    let now = Utc::now();

    record.draft.schema = new_schema;
    record.draft.version += 1;
    record.draft.updated_at = now;
    if !diff.is_empty() {
        record.history.push(HistoryItem {
            op: HistoryOp::Save,
            patch: Some(diff),
            from_version,
            to_version: record.draft.version,
            target: BlobTarget::Draft,
            at: now,
        });
    }

    state.store.put(&record).await?;
    Ok(Json(record))
}

/// POST /api/pages/:id/publish
///
/// Unconditional: every publish bumps the published version, even when the
/// draft did not change since the last one.
pub async fn publish_page(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PageRecord>, AppError> {
    let mut record = load_page(&state, id).await?;
    let from_version = record.published.version;
    let now = Utc::now();

    record.published.schema = Some(record.draft.schema.clone());
    record.published.version += 1;
    record.published.updated_at = now;
    record.status = PageStatus::Published;
    record.history.push(HistoryItem {
        op: HistoryOp::Publish,
        patch: None,
        from_version,
        to_version: record.published.version,
        target: BlobTarget::Published,
        at: now,
    });

    state.store.put(&record).await?;
    Ok(Json(record))
}

/// POST /api/pages/:id/revert
///
/// Resets the draft content back to the published snapshot by applying the
/// computed diff; the diff is what lands in the history entry.
pub async fn revert_page(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PageRecord>, AppError> {
    let mut record = load_page(&state, id).await?;

    let Some(published_schema) = record.published.schema.clone() else {
        return Err(AppError::Validation(
            "page has never been published".to_string(),
        ));
    };

    let diff = patch::diff(&record.draft.schema, &published_schema);
    let new_schema = patch::apply(&record.draft.schema, &diff)?;
    let from_version = record.draft.version;
    let now = Utc::now();

    record.draft.schema = new_schema;
    record.draft.version += 1;
    record.draft.updated_at = now;
    record.history.push(HistoryItem {
        op: HistoryOp::Revert,
        patch: Some(diff),
        from_version,
        to_version: record.draft.version,
        target: BlobTarget::Draft,
        at: now,
    });

    state.store.put(&record).await?;
    Ok(Json(record))
}

/// PATCH /api/pages/:id
///
/// Metadata-only rename; the draft version does not move, but the history
/// gains a diff-less save entry marking the change.
pub async fn rename_page(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<RenamePageRequest>,
) -> Result<Json<PageRecord>, AppError> {
    let mut record = load_page(&state, id).await?;

    if let Some(title) = req.title {
        if title.trim().is_empty() {
            return Err(AppError::Validation("title must not be empty".to_string()));
        }
        record.title = title;
    }

    if let Some(raw_slug) = req.slug {
        let slug = checked_slug(&raw_slug)?;
        if slug != record.slug {
            if state.store.slug_taken(&slug).await? {
                return Err(AppError::SlugConflict(slug));
            }
            record.slug = slug;
        }
    }

    let now = Utc::now();
    record.draft.updated_at = now;
    record.history.push(HistoryItem {
        op: HistoryOp::Save,
        patch: None,
        from_version: record.draft.version,
        to_version: record.draft.version,
        target: BlobTarget::Draft,
        at: now,
    });

    state.store.put(&record).await?;
    Ok(Json(record))
}

/// POST /api/pages/:id/duplicate
pub async fn duplicate_page(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<DuplicatePageRequest>,
) -> Result<(StatusCode, Json<PageRecord>), AppError> {
    let source = load_page(&state, id).await?;

    let slug = match &req.slug {
        Some(raw) => checked_slug(raw)?,
        None => format!("{}-copy", source.slug),
    };
    if state.store.slug_taken(&slug).await? {
        return Err(AppError::SlugConflict(slug));
    }

    let title = req
        .title
        .unwrap_or_else(|| format!("{} (copy)", source.title));

    let mut record = PageRecord::new(slug, title);
    record.draft.schema = source.draft.schema.clone();

    if req.copy_published {
        if let Some(published_schema) = &source.published.schema {
            record.published.schema = Some(published_schema.clone());
            record.published.version = 1;
            record.status = PageStatus::Published;
        }
    }

    state.store.put(&record).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// DELETE /api/pages/:id
pub async fn delete_page(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.store.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
