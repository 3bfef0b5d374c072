//! AI backend abstraction
//!
//! Two kinds of remote AI are involved in processing a diary:
//!
//! - `AnalysisBackend`: the external analysis server that derives an emotion
//!   label and a generated image, and tracks its own per-diary status
//! - `AIBackend`: an OpenAI-compatible completion API used for tag
//!   extraction and diary comments
//!
//! Each trait has a concrete client enum (`AnalysisClient`, `AIClient`)
//! providing Clone and compile-time dispatch over the real HTTP backend and
//! a mock.

mod analysis_server;
mod mock;
mod openai_compatible;
pub mod parsing;
pub mod types;

pub use analysis_server::AnalysisServerBackend;
pub use mock::{MockAnalysisBackend, MockBackend};
pub use openai_compatible::OpenAICompatibleBackend;
pub use types::*;

use async_trait::async_trait;

use crate::config::AppConfig;
use crate::error::Result;

/// Comment returned whenever generation fails
pub const COMMENT_FALLBACK: &str = "코멘트 생성 중 오류가 발생했습니다. 잠시 후 다시 시도해 주세요.";

/// Interface to the external analysis server
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Derive emotion and image for a diary
    async fn analyze(&self, diary_id: i64, content: &str) -> Result<AnalysisResult>;

    /// The server's current view of a diary
    async fn fetch_status(&self, diary_id: i64) -> Result<RemoteStatus>;

    /// Notify the server of a local status change
    async fn push_status(&self, diary_id: i64, update: &StatusUpdate) -> Result<()>;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;
}

/// Interface to the completion API
///
/// Neither operation fails: extraction degrades to no tags and comment
/// generation to [`COMMENT_FALLBACK`].
#[async_trait]
pub trait AIBackend: Send + Sync {
    /// Extract categorized tags from diary content
    async fn extract_tags(&self, content: &str) -> Vec<ExtractedTag>;

    /// Write a personalized comment given similar earlier diaries
    async fn generate_comment(&self, content: &str, similar_contents: &[String]) -> String;

    /// Check if the backend is available
    async fn health_check(&self) -> bool;

    /// Get the model name (for logging)
    fn model(&self) -> &str;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete analysis server client
#[derive(Clone)]
pub enum AnalysisClient {
    /// Real analysis server (HTTP)
    Server(AnalysisServerBackend),
    /// Mock backend for testing
    Mock(MockAnalysisBackend),
}

impl AnalysisClient {
    /// Build the client the configuration asks for
    ///
    /// Returns None when no analysis server is configured and mocks are off.
    pub fn from_config(config: &AppConfig) -> Option<Self> {
        if config.use_mock_ai {
            return Some(Self::mock());
        }
        config
            .analysis_server
            .clone()
            .map(|server| AnalysisClient::Server(AnalysisServerBackend::new(server)))
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        AnalysisClient::Mock(MockAnalysisBackend::new())
    }
}

#[async_trait]
impl AnalysisBackend for AnalysisClient {
    async fn analyze(&self, diary_id: i64, content: &str) -> Result<AnalysisResult> {
        match self {
            AnalysisClient::Server(b) => b.analyze(diary_id, content).await,
            AnalysisClient::Mock(b) => b.analyze(diary_id, content).await,
        }
    }

    async fn fetch_status(&self, diary_id: i64) -> Result<RemoteStatus> {
        match self {
            AnalysisClient::Server(b) => b.fetch_status(diary_id).await,
            AnalysisClient::Mock(b) => b.fetch_status(diary_id).await,
        }
    }

    async fn push_status(&self, diary_id: i64, update: &StatusUpdate) -> Result<()> {
        match self {
            AnalysisClient::Server(b) => b.push_status(diary_id, update).await,
            AnalysisClient::Mock(b) => b.push_status(diary_id, update).await,
        }
    }

    fn host(&self) -> &str {
        match self {
            AnalysisClient::Server(b) => b.host(),
            AnalysisClient::Mock(b) => b.host(),
        }
    }
}

/// Concrete completion client
#[derive(Clone)]
pub enum AIClient {
    /// OpenAI-compatible API (HTTP)
    OpenAICompatible(OpenAICompatibleBackend),
    /// Mock backend for testing
    Mock(MockBackend),
}

impl AIClient {
    /// Build the client the configuration asks for
    ///
    /// Returns None when no completion API is configured and mocks are off.
    pub fn from_config(config: &AppConfig) -> Option<Self> {
        if config.use_mock_ai {
            return Some(Self::mock());
        }
        config
            .completion
            .clone()
            .map(|completion| AIClient::OpenAICompatible(OpenAICompatibleBackend::new(completion)))
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        AIClient::Mock(MockBackend::new())
    }
}

#[async_trait]
impl AIBackend for AIClient {
    async fn extract_tags(&self, content: &str) -> Vec<ExtractedTag> {
        match self {
            AIClient::OpenAICompatible(b) => b.extract_tags(content).await,
            AIClient::Mock(b) => b.extract_tags(content).await,
        }
    }

    async fn generate_comment(&self, content: &str, similar_contents: &[String]) -> String {
        match self {
            AIClient::OpenAICompatible(b) => b.generate_comment(content, similar_contents).await,
            AIClient::Mock(b) => b.generate_comment(content, similar_contents).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            AIClient::OpenAICompatible(b) => b.health_check().await,
            AIClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            AIClient::OpenAICompatible(b) => b.model(),
            AIClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            AIClient::OpenAICompatible(b) => b.host(),
            AIClient::Mock(b) => b.host(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnalysisServerConfig, CompletionConfig};

    #[test]
    fn test_from_config_without_settings() {
        let config = AppConfig::default();
        assert!(AnalysisClient::from_config(&config).is_none());
        assert!(AIClient::from_config(&config).is_none());
    }

    #[test]
    fn test_from_config_mock_overrides_servers() {
        let config = AppConfig {
            use_mock_ai: true,
            analysis_server: Some(AnalysisServerConfig::new("http://ai", "k")),
            ..Default::default()
        };
        assert!(matches!(
            AnalysisClient::from_config(&config),
            Some(AnalysisClient::Mock(_))
        ));
        assert!(matches!(AIClient::from_config(&config), Some(AIClient::Mock(_))));
    }

    #[test]
    fn test_from_config_real_backends() {
        let config = AppConfig {
            analysis_server: Some(AnalysisServerConfig::new("http://ai/", "k")),
            completion: Some(CompletionConfig::new("http://llm", "gpt-3.5-turbo")),
            ..Default::default()
        };
        let analysis = AnalysisClient::from_config(&config).unwrap();
        assert_eq!(analysis.host(), "http://ai");
        let ai = AIClient::from_config(&config).unwrap();
        assert_eq!(ai.model(), "gpt-3.5-turbo");
    }

    #[tokio::test]
    async fn test_mock_clients_delegate() {
        let ai = AIClient::mock();
        assert!(ai.health_check().await);
        assert_eq!(ai.extract_tags("x").await.len(), 2);

        let analysis = AnalysisClient::mock();
        let result = analysis.analyze(1, "x").await.unwrap();
        assert_eq!(result.emotion.as_deref(), Some("기쁨"));
        assert!(analysis.fetch_status(1).await.is_err());
    }
}
