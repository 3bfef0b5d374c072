//! Types for AI backend requests and responses

use serde::{Deserialize, Serialize};

use crate::models::{ProcessingStatus, TagCategory};

/// Request body for `POST /api/analyze_diary`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub diary_id: i64,
    pub content: String,
}

/// Analysis server answer for one diary
///
/// A missing `status` means the server finished the work synchronously.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default)]
    pub emotion: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default = "completed")]
    pub status: ProcessingStatus,
}

fn completed() -> ProcessingStatus {
    ProcessingStatus::Completed
}

/// Analysis server's view of a diary (`GET /api/status/{id}`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteStatus {
    pub status: ProcessingStatus,
    #[serde(default)]
    pub emotion: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Status notification pushed to the analysis server (`POST /api/status/{id}`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: ProcessingStatus,
    pub error: Option<String>,
    pub emotion: Option<String>,
    pub image_url: Option<String>,
}

impl StatusUpdate {
    pub fn new(status: ProcessingStatus) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    pub fn failed(reason: &str) -> Self {
        Self {
            status: ProcessingStatus::Failed,
            error: Some(reason.to_string()),
            ..Default::default()
        }
    }
}

/// A tag extracted from diary content by the completion model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedTag {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
}

impl ExtractedTag {
    /// The category mapped onto the closed set (unknown labels become `None`)
    pub fn tag_category(&self) -> Option<TagCategory> {
        self.category.as_deref().and_then(|c| c.parse().ok())
    }
}
