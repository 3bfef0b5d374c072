//! Per-user analytics: emotion distribution, image gallery, writing habits

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;

use momento_core::models::{EmotionStat, GalleryImage, User, WritingStats};

use crate::{AppError, AppState};

/// GET /api/analytics/emotions - Emotion distribution across the caller's diaries
pub async fn get_emotion_stats(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<EmotionStat>>, AppError> {
    Ok(Json(state.db.emotion_stats(user.id)?))
}

#[derive(Debug, Deserialize)]
pub struct GalleryQuery {
    pub emotion: Option<String>,
}

/// GET /api/analytics/images - Generated images, optionally for one emotion
pub async fn list_images(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Query(query): Query<GalleryQuery>,
) -> Result<Json<Vec<GalleryImage>>, AppError> {
    let emotion = query.emotion.as_deref().filter(|e| !e.trim().is_empty());
    Ok(Json(state.db.gallery_images(user.id, emotion)?))
}

/// GET /api/analytics/images/:id - One diary's generated image
pub async fn get_image(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<i64>,
) -> Result<Json<GalleryImage>, AppError> {
    let image = state
        .db
        .gallery_image(user.id, id)?
        .ok_or_else(|| AppError::not_found("Image not found"))?;

    Ok(Json(image))
}

/// GET /api/analytics/stats - Writing streak and volume
pub async fn get_writing_stats(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<WritingStats>, AppError> {
    let today = Utc::now().date_naive();
    Ok(Json(state.db.writing_stats(user.id, today)?))
}
