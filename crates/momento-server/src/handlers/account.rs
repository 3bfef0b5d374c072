//! Health and current-user handlers

use axum::{Extension, Json};
use serde::Serialize;

use momento_core::models::User;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// GET /api/health - Liveness probe (no authentication)
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /api/me - The user the bearer token resolved to
pub async fn get_me(Extension(user): Extension<User>) -> Json<User> {
    Json(user)
}
