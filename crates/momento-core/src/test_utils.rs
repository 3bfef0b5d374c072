//! Test utilities for momento-core
//!
//! This module provides a mock AI server implementing both the analysis
//! server API and the OpenAI chat completions API, so the real HTTP clients
//! can be exercised in integration tests.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Json, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::oneshot;

use crate::ai::{AnalysisResult, AnalyzeRequest, RemoteStatus, StatusUpdate};
use crate::models::ProcessingStatus;

#[derive(Default)]
struct MockState {
    statuses: HashMap<i64, RemoteStatus>,
    fail_analysis: bool,
}

type SharedState = Arc<Mutex<MockState>>;

/// Mock AI server for testing and development
pub struct MockAiServer {
    addr: SocketAddr,
    state: SharedState,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockAiServer {
    /// `X-API-KEY` value the analysis endpoints accept
    pub const API_KEY: &'static str = "test-api-key";

    /// Reply to every comment request
    pub const COMMENT: &'static str = "요즘 자연 속에서 힘을 얻고 계시네요. 꾸준히 이어가 보세요.";

    /// Start the mock server on an available port
    pub async fn start() -> Self {
        Self::start_with(MockState::default()).await
    }

    /// Start a mock server whose analysis endpoint always answers 500
    pub async fn start_failing_analysis() -> Self {
        Self::start_with(MockState {
            fail_analysis: true,
            ..Default::default()
        })
        .await
    }

    async fn start_with(state: MockState) -> Self {
        let state = Arc::new(Mutex::new(state));
        let app = Router::new()
            .route("/api/analyze_diary", post(handle_analyze))
            .route(
                "/api/status/:diary_id",
                get(handle_get_status).post(handle_push_status),
            )
            .route("/v1/chat/completions", post(handle_chat_completion))
            .route("/v1/models", get(handle_models))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Set what `GET /api/status/{diary_id}` reports
    pub fn set_status(&self, diary_id: i64, status: RemoteStatus) {
        self.state.lock().unwrap().statuses.insert(diary_id, status);
    }

    /// What the server currently holds for a diary
    pub fn status(&self, diary_id: i64) -> Option<RemoteStatus> {
        self.state.lock().unwrap().statuses.get(&diary_id).cloned()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockAiServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("X-API-KEY")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == MockAiServer::API_KEY)
        .unwrap_or(false)
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({"detail": "invalid api key"}))).into_response()
}

/// Analysis endpoint: completes immediately as "기쁨"
async fn handle_analyze(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(request): Json<AnalyzeRequest>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }

    let mut state = state.lock().unwrap();
    if state.fail_analysis {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"detail": "model crashed"})),
        )
            .into_response();
    }

    let result = AnalysisResult {
        emotion: Some("기쁨".to_string()),
        image_url: Some(format!("http://images.test/{}.png", request.diary_id)),
        status: ProcessingStatus::Completed,
    };
    state.statuses.insert(
        request.diary_id,
        RemoteStatus {
            status: result.status,
            emotion: result.emotion.clone(),
            image_url: result.image_url.clone(),
        },
    );
    Json(result).into_response()
}

async fn handle_get_status(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(diary_id): Path<i64>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    match state.lock().unwrap().statuses.get(&diary_id) {
        Some(status) => Json(status.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({"detail": "unknown diary"}))).into_response(),
    }
}

async fn handle_push_status(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(diary_id): Path<i64>,
    Json(update): Json<StatusUpdate>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    state.lock().unwrap().statuses.insert(
        diary_id,
        RemoteStatus {
            status: update.status,
            emotion: update.emotion,
            image_url: update.image_url,
        },
    );
    Json(json!({"ok": true})).into_response()
}

#[derive(Deserialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatRequestMessage>,
}

#[derive(Deserialize)]
struct ChatRequestMessage {
    content: String,
}

/// Chat completions: tag extraction or comment, told apart by the system prompt
async fn handle_chat_completion(Json(request): Json<ChatRequest>) -> Json<serde_json::Value> {
    let system = request
        .messages
        .first()
        .map(|m| m.content.as_str())
        .unwrap_or_default();

    let content = if system.contains("키워드") {
        "추출 결과입니다:\n[{\"name\": \"등산\", \"category\": \"취미\"}, {\"name\": \"두통\", \"category\": \"몸에 나타나는 증상\"}]"
            .to_string()
    } else {
        MockAiServer::COMMENT.to_string()
    };

    Json(json!({
        "model": request.model,
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
    }))
}

async fn handle_models() -> Json<serde_json::Value> {
    Json(json!({"data": [{"id": "gpt-3.5-turbo"}]}))
}
