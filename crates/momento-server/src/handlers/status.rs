//! Processing status polling
//!
//! When an analysis server is configured it is the authority: every poll
//! fetches its view and adopts it locally. Without one, the locally stored
//! record is returned as is.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use momento_core::ai::AnalysisBackend;
use momento_core::models::{ProcessingStatus, User};

use crate::{AppError, AppState};

/// Status poll response
#[derive(Debug, Serialize)]
pub struct DiaryStatusResponse {
    pub diary_id: i64,
    pub status: ProcessingStatus,
    pub emotion: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// GET /api/diaries/:id/status - Poll (and reconcile) a diary's processing status
pub async fn get_diary_status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<i64>,
) -> Result<Json<DiaryStatusResponse>, AppError> {
    let diary = state
        .db
        .get_owned_diary(id, user.id)?
        .ok_or_else(|| AppError::not_found("Diary not found"))?;

    let Some(analysis) = state.analysis.as_ref() else {
        let status = state
            .db
            .get_status(id)?
            .map(|s| s.status)
            .unwrap_or_default();
        return Ok(Json(DiaryStatusResponse {
            diary_id: id,
            status,
            emotion: diary.emotion,
            image_url: diary.image_url,
            created_at: diary.created_at,
            updated_at: diary.updated_at,
        }));
    };

    let remote = analysis.fetch_status(id).await.map_err(|e| {
        AppError::bad_gateway("Failed to fetch status from analysis server", e)
    })?;

    let diary = state
        .db
        .reconcile_status(
            id,
            remote.status,
            remote.emotion.as_deref(),
            remote.image_url.as_deref(),
        )?
        .ok_or_else(|| AppError::not_found("Diary not found"))?;

    debug!(diary_id = id, status = %remote.status, "Status reconciled");

    Ok(Json(DiaryStatusResponse {
        diary_id: id,
        status: remote.status,
        emotion: remote.emotion,
        image_url: remote.image_url,
        created_at: diary.created_at,
        updated_at: diary.updated_at,
    }))
}
