//! External analysis server client
//!
//! The analysis server derives an emotion label and a generated image for a
//! diary. It authenticates callers with an `X-API-KEY` header and exposes:
//!
//! - `POST /api/analyze_diary` with `{diary_id, content}`
//! - `GET /api/status/{diary_id}`
//! - `POST /api/status/{diary_id}` with `{status, error, emotion, image_url}`

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use tracing::debug;

use crate::config::AnalysisServerConfig;
use crate::error::{Error, Result};

use super::types::{AnalysisResult, AnalyzeRequest, RemoteStatus, StatusUpdate};
use super::AnalysisBackend;

const API_KEY_HEADER: &str = "X-API-KEY";

/// HTTP client for the analysis server
#[derive(Clone)]
pub struct AnalysisServerBackend {
    http_client: Client,
    config: AnalysisServerConfig,
}

impl AnalysisServerBackend {
    pub fn new(config: AnalysisServerConfig) -> Self {
        Self {
            http_client: Client::new(),
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header(API_KEY_HEADER, &self.config.api_key)
    }

    async fn check(response: Response) -> Result<Response> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Ai(format!("Analysis server error {}: {}", status, body)));
        }
        Ok(response)
    }
}

#[async_trait]
impl AnalysisBackend for AnalysisServerBackend {
    async fn analyze(&self, diary_id: i64, content: &str) -> Result<AnalysisResult> {
        debug!(diary_id, "Requesting diary analysis");
        let request = AnalyzeRequest {
            diary_id,
            content: content.to_string(),
        };

        let response = self
            .authorized(self.http_client.post(self.url("/api/analyze_diary")))
            .timeout(self.config.analyze_timeout)
            .json(&request)
            .send()
            .await?;

        Ok(Self::check(response).await?.json().await?)
    }

    async fn fetch_status(&self, diary_id: i64) -> Result<RemoteStatus> {
        let response = self
            .authorized(
                self.http_client
                    .get(self.url(&format!("/api/status/{}", diary_id))),
            )
            .timeout(self.config.status_timeout)
            .send()
            .await?;

        Ok(Self::check(response).await?.json().await?)
    }

    async fn push_status(&self, diary_id: i64, update: &StatusUpdate) -> Result<()> {
        let response = self
            .authorized(
                self.http_client
                    .post(self.url(&format!("/api/status/{}", diary_id))),
            )
            .timeout(self.config.status_timeout)
            .json(update)
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }

    fn host(&self) -> &str {
        &self.config.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProcessingStatus;
    use crate::test_utils::MockAiServer;

    #[test]
    fn test_backend_trims_trailing_slash() {
        let backend =
            AnalysisServerBackend::new(AnalysisServerConfig::new("http://localhost:9000/", "k"));
        assert_eq!(backend.host(), "http://localhost:9000");
        assert_eq!(backend.url("/api/status/1"), "http://localhost:9000/api/status/1");
    }

    #[tokio::test]
    async fn test_analyze_against_mock_server() {
        let server = MockAiServer::start().await;
        let backend = AnalysisServerBackend::new(AnalysisServerConfig::new(
            &server.url(),
            MockAiServer::API_KEY,
        ));

        let result = backend.analyze(7, "오늘은 행복했다").await.unwrap();
        assert_eq!(result.status, ProcessingStatus::Completed);
        assert_eq!(result.emotion.as_deref(), Some("기쁨"));
        assert_eq!(result.image_url.as_deref(), Some("http://images.test/7.png"));
    }

    #[tokio::test]
    async fn test_wrong_api_key_is_an_error() {
        let server = MockAiServer::start().await;
        let backend =
            AnalysisServerBackend::new(AnalysisServerConfig::new(&server.url(), "wrong-key"));

        let err = backend.fetch_status(1).await.unwrap_err();
        assert!(matches!(err, Error::Ai(_)));
    }

    #[tokio::test]
    async fn test_push_then_fetch_status() {
        let server = MockAiServer::start().await;
        let backend = AnalysisServerBackend::new(AnalysisServerConfig::new(
            &server.url(),
            MockAiServer::API_KEY,
        ));

        let mut update = StatusUpdate::new(ProcessingStatus::Completed);
        update.emotion = Some("평온".into());
        backend.push_status(3, &update).await.unwrap();

        let remote = backend.fetch_status(3).await.unwrap();
        assert_eq!(remote.status, ProcessingStatus::Completed);
        assert_eq!(remote.emotion.as_deref(), Some("평온"));
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        let backend =
            AnalysisServerBackend::new(AnalysisServerConfig::new("http://127.0.0.1:1", "k"));
        assert!(backend.analyze(1, "x").await.is_err());
    }
}
