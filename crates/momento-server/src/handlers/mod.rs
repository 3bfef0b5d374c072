//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod account;
pub mod analytics;
pub mod comments;
pub mod diaries;
pub mod status;

// Re-export all handlers for use in router
pub use account::*;
pub use analytics::*;
pub use comments::*;
pub use diaries::*;
pub use status::*;

use axum::extract::Request;
use serde::de::DeserializeOwned;

use crate::AppError;

/// Largest JSON body accepted from a client
const MAX_BODY_BYTES: usize = 1024 * 64;

/// Read and parse a JSON request body
pub(crate) async fn read_json<T: DeserializeOwned>(request: Request) -> Result<T, AppError> {
    let bytes = axum::body::to_bytes(request.into_body(), MAX_BODY_BYTES)
        .await
        .map_err(|_| AppError::bad_request("Invalid request body"))?;
    serde_json::from_slice(&bytes).map_err(|_| AppError::bad_request("Invalid JSON"))
}
