//! Momento Web Server
//!
//! Axum-based REST API for the Momento diary service.
//!
//! - Bearer JWT authentication resolving to a user row
//! - Diary CRUD with background processing (emotion/image or tags)
//! - Status polling reconciled against the analysis server
//! - Restrictive CORS policy and sanitized error responses

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    cors::CorsLayer, services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::{error, info, warn};

use momento_core::ai::{AIBackend, AIClient, AnalysisBackend, AnalysisClient};
use momento_core::{AppConfig, AuthConfig, Database, DiaryProcessor, PipelineMode, ProcessingJob};

pub mod auth;
mod handlers;
mod worker;

pub use worker::ProcessingQueue;

/// Authorization header carrying the bearer access token
const AUTHORIZATION_HEADER: &str = "authorization";

/// Server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
    /// Access token verification settings
    pub auth: AuthConfig,
    /// Which processing pipeline runs after a diary is written
    pub pipeline: PipelineMode,
}

impl ServerConfig {
    pub fn new(auth: AuthConfig) -> Self {
        Self {
            allowed_origins: vec![],
            auth,
            pipeline: PipelineMode::default(),
        }
    }

    /// Server settings from the application configuration (requires a JWT secret)
    pub fn from_app_config(config: &AppConfig) -> momento_core::Result<Self> {
        Ok(Self {
            allowed_origins: config.allowed_origins.clone(),
            auth: config.require_auth()?.clone(),
            pipeline: config.pipeline,
        })
    }
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
    pub analysis: Option<AnalysisClient>,
    pub ai: Option<AIClient>,
    pub queue: ProcessingQueue,
}

impl AppState {
    /// Build the state and start the processing queue
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        db: Database,
        config: ServerConfig,
        analysis: Option<AnalysisClient>,
        ai: Option<AIClient>,
    ) -> Arc<Self> {
        let processor =
            DiaryProcessor::new(db.clone(), analysis.clone(), ai.clone(), config.pipeline);
        let queue = ProcessingQueue::start(processor);
        Arc::new(Self {
            db,
            config,
            analysis,
            ai,
            queue,
        })
    }

    /// Queue a run started by a create or an edit
    ///
    /// The analysis server is told the diary is QUEUED first. If the queue is
    /// gone the run is marked FAILED.
    pub async fn enqueue(&self, job: ProcessingJob) {
        let queued = self.queue.submit(job).await;
        self.fail_unqueued(job, queued);
    }

    /// Re-queue runs left QUEUED or ANALYZING by a previous server session
    pub fn requeue_unfinished(&self) -> momento_core::Result<usize> {
        let runs = self.db.list_unfinished_runs()?;
        for (diary_id, run_token) in &runs {
            let job = ProcessingJob::new(*diary_id, *run_token);
            self.fail_unqueued(job, self.queue.enqueue(job));
        }
        Ok(runs.len())
    }

    fn fail_unqueued(&self, job: ProcessingJob, queued: bool) {
        if queued {
            return;
        }
        if let Err(e) = self.db.fail_run(job.diary_id, job.run_token) {
            error!(diary_id = job.diary_id, error = %e, "Failed to mark diary as failed");
        }
    }
}

/// Authentication middleware - resolves the bearer token to a user row
///
/// The user is attached to the request extensions for handlers to extract.
/// A missing, invalid or expired token, or a token for a user that no longer
/// exists, is rejected with 401.
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    let Some(token) = token else {
        return AppError::unauthorized("Missing bearer token").into_response();
    };

    let claims = match auth::verify_access_token(&state.config.auth, token) {
        Ok(claims) => claims,
        Err(e) => {
            warn!(error = %e, path = %request.uri().path(), "Rejected access token");
            return AppError::unauthorized(&e.to_string()).into_response();
        }
    };

    match state.db.get_user(claims.user_id) {
        Ok(Some(user)) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Ok(None) => AppError::unauthorized("User does not exist").into_response(),
        Err(e) => AppError::from(e).into_response(),
    }
}

/// Success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Create the application router from the application configuration
pub fn create_router(
    db: Database,
    static_dir: Option<&str>,
    app_config: &AppConfig,
) -> anyhow::Result<Router> {
    let config = ServerConfig::from_app_config(app_config)?;
    let analysis = AnalysisClient::from_config(app_config);
    let ai = AIClient::from_config(app_config);
    Ok(create_router_with_clients(db, static_dir, config, analysis, ai))
}

/// Create the application router with explicit AI clients (for testing)
pub fn create_router_with_clients(
    db: Database,
    static_dir: Option<&str>,
    config: ServerConfig,
    analysis: Option<AnalysisClient>,
    ai: Option<AIClient>,
) -> Router {
    let state = AppState::new(db, config, analysis, ai);
    router_from_state(state, static_dir)
}

fn router_from_state(state: Arc<AppState>, static_dir: Option<&str>) -> Router {
    match state.analysis {
        Some(ref client) => info!("Analysis server configured: {}", client.host()),
        None => info!("ℹ️  Analysis server not configured (set MOMENTO_AI_SERVER_URL)"),
    }
    match state.ai {
        Some(ref client) => info!(
            "Completion API configured: {} (model: {})",
            client.host(),
            client.model()
        ),
        None => info!("ℹ️  Completion API not configured (set OPENAI_COMPATIBLE_API_KEY)"),
    }

    let protected_routes = Router::new()
        .route("/me", get(handlers::get_me))
        // Diaries
        .route(
            "/diaries",
            get(handlers::list_diaries).post(handlers::create_diary),
        )
        .route(
            "/diaries/:id",
            get(handlers::get_diary)
                .put(handlers::update_diary)
                .delete(handlers::delete_diary),
        )
        .route("/diaries/:id/status", get(handlers::get_diary_status))
        .route("/diaries/:id/tags", get(handlers::get_diary_tags))
        .route("/diaries/:id/similar", get(handlers::get_similar_diaries))
        .route("/diaries/:id/comment", post(handlers::generate_comment))
        // Analytics
        .route("/analytics/emotions", get(handlers::get_emotion_stats))
        .route("/analytics/images", get(handlers::list_images))
        .route("/analytics/images/:id", get(handlers::get_image))
        .route("/analytics/stats", get(handlers::get_writing_stats))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes);

    // Build CORS layer
    let cors = if state.config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        // Allow specified origins
        let origins: Vec<HeaderValue> = state
            .config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    };

    let mut app = Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ));

    // Serve static files if directory provided
    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app
}

/// Start the server
pub async fn serve_with_config(
    db: Database,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
    app_config: &AppConfig,
) -> anyhow::Result<()> {
    let config = ServerConfig::from_app_config(app_config)?;
    let analysis = AnalysisClient::from_config(app_config);
    let ai = AIClient::from_config(app_config);

    check_ai_connection(ai.as_ref()).await;

    let state = AppState::new(db, config, analysis, ai);

    // Pick up runs interrupted by a server restart
    match state.requeue_unfinished() {
        Ok(count) if count > 0 => {
            warn!(
                "⚠️  Re-queued {} unfinished diary run(s) from previous server session",
                count
            );
        }
        Ok(_) => {}
        Err(e) => {
            warn!("Failed to re-queue unfinished runs: {}", e);
        }
    }

    let app = router_from_state(state, static_dir);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Check and log completion API connection status
async fn check_ai_connection(ai: Option<&AIClient>) {
    if let Some(client) = ai {
        if client.health_check().await {
            info!("✅ Completion API connected: {} ({})", client.host(), client.model());
        } else {
            warn!(
                "⚠️  Completion API configured but not responding: {}",
                client.host()
            );
        }
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn unauthorized(msg: &str) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
            internal: None,
        }
    }

    /// Upstream failure; the detail is logged, not returned
    pub fn bad_gateway(msg: &str, err: impl Into<anyhow::Error>) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: msg.to_string(),
            internal: Some(err.into()),
        }
    }

    /// Map a core error: invalid input is 400, missing rows 404, the rest 500
    pub fn from_core(err: momento_core::Error) -> Self {
        match err {
            momento_core::Error::InvalidData(msg) => Self::bad_request(&msg),
            momento_core::Error::NotFound(msg) => Self::not_found(&msg),
            other => Self::from(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, status = %self.status, "Request failed");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            // Keep full error for logging
            internal: Some(err),
        }
    }
}
