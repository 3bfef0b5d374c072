//! Diary handlers
//!
//! Writes commit first, then queue a processing run; the response never
//! waits for the run.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use tracing::info;

use momento_core::models::{Diary, DiaryDetail, NewDiary, SimilarDiary, Tag, User};
use momento_core::ProcessingJob;

use super::read_json;
use crate::{AppError, AppState, SuccessResponse};

/// Default number of shared tags for a diary to count as similar
const DEFAULT_MIN_MATCHING: i64 = 2;

/// Default number of similar diaries returned
const DEFAULT_SIMILAR_LIMIT: i64 = 3;

/// POST /api/diaries - Create a diary and queue its processing
pub async fn create_diary(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    request: Request,
) -> Result<(StatusCode, Json<DiaryDetail>), AppError> {
    let new: NewDiary = read_json(request).await?;

    let (diary, status) = state
        .db
        .create_diary(user.id, &new)
        .map_err(AppError::from_core)?;

    state
        .enqueue(ProcessingJob::new(diary.id, status.run_token))
        .await;
    info!(diary_id = diary.id, user_id = user.id, "Diary created");

    Ok((
        StatusCode::CREATED,
        Json(DiaryDetail {
            diary,
            status_tracking: Some(status),
            tags: vec![],
        }),
    ))
}

/// GET /api/diaries - List the caller's diaries, newest date first
pub async fn list_diaries(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<Diary>>, AppError> {
    Ok(Json(state.db.list_diaries(user.id)?))
}

/// GET /api/diaries/:id - Get a diary with its status record and tags
pub async fn get_diary(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<i64>,
) -> Result<Json<DiaryDetail>, AppError> {
    let detail = state
        .db
        .get_diary_detail(id, user.id)?
        .ok_or_else(|| AppError::not_found("Diary not found"))?;

    Ok(Json(detail))
}

/// PUT /api/diaries/:id - Edit a diary and re-queue its processing
pub async fn update_diary(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<DiaryDetail>, AppError> {
    let changes: NewDiary = read_json(request).await?;

    let (diary, status) = state
        .db
        .update_diary(id, user.id, &changes)
        .map_err(AppError::from_core)?
        .ok_or_else(|| AppError::not_found("Diary not found"))?;

    state
        .enqueue(ProcessingJob::new(diary.id, status.run_token))
        .await;
    info!(
        diary_id = diary.id,
        run_token = status.run_token,
        "Diary updated, processing re-queued"
    );

    Ok(Json(DiaryDetail {
        diary,
        status_tracking: Some(status),
        tags: vec![],
    }))
}

/// DELETE /api/diaries/:id - Delete a diary with its status and tag links
pub async fn delete_diary(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    if !state.db.delete_diary(id, user.id)? {
        return Err(AppError::not_found("Diary not found"));
    }

    info!(diary_id = id, user_id = user.id, "Diary deleted");
    Ok(Json(SuccessResponse { success: true }))
}

/// GET /api/diaries/:id/tags - Tags linked to a diary
pub async fn get_diary_tags(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Tag>>, AppError> {
    state
        .db
        .get_owned_diary(id, user.id)?
        .ok_or_else(|| AppError::not_found("Diary not found"))?;

    Ok(Json(state.db.get_diary_tags(id)?))
}

/// Query parameters for the similarity search
#[derive(Debug, Deserialize)]
pub struct SimilarQuery {
    pub min_matching: Option<i64>,
    pub limit: Option<i64>,
}

/// GET /api/diaries/:id/similar - The caller's diaries sharing tags with this one
pub async fn get_similar_diaries(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<i64>,
    Query(query): Query<SimilarQuery>,
) -> Result<Json<Vec<SimilarDiary>>, AppError> {
    state
        .db
        .get_owned_diary(id, user.id)?
        .ok_or_else(|| AppError::not_found("Diary not found"))?;

    let names: Vec<String> = state
        .db
        .get_diary_tags(id)?
        .into_iter()
        .map(|t| t.name)
        .collect();

    let similar = state.db.find_similar_diaries(
        id,
        user.id,
        &names,
        query.min_matching.unwrap_or(DEFAULT_MIN_MATCHING).max(1),
        query.limit.unwrap_or(DEFAULT_SIMILAR_LIMIT),
    )?;

    Ok(Json(similar))
}
