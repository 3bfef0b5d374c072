//! AI comment generation

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Serialize;
use tracing::{info, warn};

use momento_core::ai::{AIBackend, COMMENT_FALLBACK};
use momento_core::models::User;

use crate::{AppError, AppState};

/// Earlier diaries must share this many tags to be quoted in the prompt
const COMMENT_MIN_MATCHING: i64 = 2;

/// At most this many earlier diaries are quoted
const COMMENT_SIMILAR_LIMIT: i64 = 3;

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub diary_id: i64,
    pub comment: String,
}

/// POST /api/diaries/:id/comment - Generate and store a personalized comment
///
/// Generation never fails outright; when the completion API is unreachable
/// the caller gets the fixed fallback text and nothing is stored.
pub async fn generate_comment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<i64>,
) -> Result<Json<CommentResponse>, AppError> {
    let ai = state
        .ai
        .as_ref()
        .ok_or_else(|| AppError::bad_request("AI backend not configured"))?;

    let diary = state
        .db
        .get_owned_diary(id, user.id)?
        .ok_or_else(|| AppError::not_found("Diary not found"))?;

    let names: Vec<String> = state
        .db
        .get_diary_tags(id)?
        .into_iter()
        .map(|t| t.name)
        .collect();
    let similar: Vec<String> = state
        .db
        .find_similar_diaries(id, user.id, &names, COMMENT_MIN_MATCHING, COMMENT_SIMILAR_LIMIT)?
        .into_iter()
        .map(|s| s.content)
        .collect();

    let comment = ai.generate_comment(&diary.content, &similar).await;

    if comment == COMMENT_FALLBACK {
        warn!(diary_id = id, "Comment generation failed, not storing fallback");
    } else {
        if !state.db.set_diary_comment(id, user.id, &comment)? {
            return Err(AppError::not_found("Diary not found"));
        }
        info!(diary_id = id, similar = similar.len(), "Comment generated");
    }
    Ok(Json(CommentResponse {
        diary_id: id,
        comment,
    }))
}
