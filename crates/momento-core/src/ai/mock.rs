//! Mock backends for testing
//!
//! Both mocks answer from configuration held in memory. The analysis mock
//! also records every status push so tests can assert on them.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::ProcessingStatus;

use super::types::{AnalysisResult, ExtractedTag, RemoteStatus, StatusUpdate};
use super::{AIBackend, AnalysisBackend};

/// Mock completion backend
#[derive(Clone)]
pub struct MockBackend {
    /// Whether health_check should return true
    pub healthy: bool,
    /// Tags returned by every extraction
    pub tags: Vec<ExtractedTag>,
    /// Comment returned by every generation
    pub comment: String,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create a new mock backend (healthy by default)
    pub fn new() -> Self {
        Self {
            healthy: true,
            tags: vec![
                ExtractedTag {
                    name: "산책".into(),
                    category: Some("취미".into()),
                },
                ExtractedTag {
                    name: "행복".into(),
                    category: Some("좋아하는 것".into()),
                },
            ],
            comment: "오늘 하루도 수고 많으셨어요.".into(),
        }
    }

    /// Create an unhealthy mock backend
    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            ..Self::new()
        }
    }

    /// Answer every extraction with `tags` as (name, category) pairs
    pub fn with_tags(mut self, tags: &[(&str, Option<&str>)]) -> Self {
        self.tags = tags
            .iter()
            .map(|(name, category)| ExtractedTag {
                name: name.to_string(),
                category: category.map(str::to_string),
            })
            .collect();
        self
    }

    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = comment.to_string();
        self
    }
}

#[async_trait]
impl AIBackend for MockBackend {
    async fn extract_tags(&self, _content: &str) -> Vec<ExtractedTag> {
        self.tags.clone()
    }

    async fn generate_comment(&self, _content: &str, similar_contents: &[String]) -> String {
        if similar_contents.is_empty() {
            self.comment.clone()
        } else {
            format!("{} ({})", self.comment, similar_contents.len())
        }
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}

/// Mock analysis server backend
#[derive(Clone)]
pub struct MockAnalysisBackend {
    /// Answer to every `analyze` call; `None` makes `analyze` fail
    pub result: Option<AnalysisResult>,
    /// Answer to every `fetch_status` call; `None` makes it fail
    pub remote_status: Option<RemoteStatus>,
    pushes: Arc<Mutex<Vec<(i64, StatusUpdate)>>>,
}

impl Default for MockAnalysisBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAnalysisBackend {
    /// Completes every diary as "기쁨" with a fixed image URL
    pub fn new() -> Self {
        Self {
            result: Some(AnalysisResult {
                emotion: Some("기쁨".into()),
                image_url: Some("http://images.mock/diary.png".into()),
                status: ProcessingStatus::Completed,
            }),
            remote_status: None,
            pushes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every `analyze` call fails
    pub fn failing() -> Self {
        Self {
            result: None,
            ..Self::new()
        }
    }

    pub fn with_result(mut self, result: AnalysisResult) -> Self {
        self.result = Some(result);
        self
    }

    pub fn with_remote_status(mut self, status: RemoteStatus) -> Self {
        self.remote_status = Some(status);
        self
    }

    /// Status pushes received so far, in order
    pub fn pushes(&self) -> Vec<(i64, StatusUpdate)> {
        self.pushes
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AnalysisBackend for MockAnalysisBackend {
    async fn analyze(&self, diary_id: i64, _content: &str) -> Result<AnalysisResult> {
        self.result
            .clone()
            .ok_or_else(|| Error::Ai(format!("Mock analysis failed for diary {}", diary_id)))
    }

    async fn fetch_status(&self, diary_id: i64) -> Result<RemoteStatus> {
        self.remote_status
            .clone()
            .ok_or_else(|| Error::Ai(format!("Mock status unavailable for diary {}", diary_id)))
    }

    async fn push_status(&self, diary_id: i64, update: &StatusUpdate) -> Result<()> {
        if let Ok(mut pushes) = self.pushes.lock() {
            pushes.push((diary_id, update.clone()));
        }
        Ok(())
    }

    fn host(&self) -> &str {
        "mock://analysis"
    }
}
