//! Application configuration
//!
//! Built once at startup from environment variables and passed by reference
//! to the AI clients, the processing pipeline and the token issuer. Nothing
//! reads the environment after [`AppConfig::from_env`] returns.
//!
//! # Environment variables
//!
//! - `MOMENTO_AI_SERVER_URL` / `MOMENTO_AI_SERVER_API_KEY`: external analysis server
//! - `OPENAI_COMPATIBLE_HOST` / `OPENAI_COMPATIBLE_MODEL` / `OPENAI_COMPATIBLE_API_KEY`:
//!   completion API used for tag extraction and comments
//! - `AI_BACKEND=mock`: use mock backends instead of network clients
//! - `MOMENTO_PIPELINE`: `analysis` or `tags`
//! - `MOMENTO_JWT_SECRET` / `MOMENTO_ACCESS_TOKEN_MINUTES`: bearer token signing
//! - `MOMENTO_ALLOWED_ORIGINS`: comma-separated CORS origins

use std::time::Duration;

use crate::error::{Error, Result};

/// Default completion API host when only an API key is configured
pub const DEFAULT_OPENAI_HOST: &str = "https://api.openai.com";

/// Default completion model
pub const DEFAULT_COMPLETION_MODEL: &str = "gpt-3.5-turbo";

/// Default access token lifetime in minutes
pub const DEFAULT_ACCESS_TOKEN_MINUTES: i64 = 30;

/// Which variant of the processing pipeline runs after a diary is written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineMode {
    /// Emotion + generated image from the external analysis server
    #[default]
    Analysis,
    /// Tag extraction through the completion API, emotion derived from tags
    Tags,
}

impl PipelineMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Analysis => "analysis",
            Self::Tags => "tags",
        }
    }
}

impl std::str::FromStr for PipelineMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "analysis" | "emotion" => Ok(Self::Analysis),
            "tags" | "tag" => Ok(Self::Tags),
            _ => Err(format!("Unknown pipeline mode: {}", s)),
        }
    }
}

impl std::fmt::Display for PipelineMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// External analysis server connection settings
#[derive(Debug, Clone)]
pub struct AnalysisServerConfig {
    pub base_url: String,
    /// Sent as the `X-API-KEY` header
    pub api_key: String,
    /// Timeout for `POST /api/analyze_diary` (image generation is slow)
    pub analyze_timeout: Duration,
    /// Timeout for status push/pull calls
    pub status_timeout: Duration,
}

impl AnalysisServerConfig {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            analyze_timeout: Duration::from_secs(60),
            status_timeout: Duration::from_secs(10),
        }
    }
}

/// OpenAI-compatible completion API settings
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl CompletionConfig {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.api_key = Some(api_key.to_string());
        self
    }
}

/// Bearer token signing settings
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_token_minutes: i64,
}

impl AuthConfig {
    pub fn new(jwt_secret: &str) -> Self {
        Self {
            jwt_secret: jwt_secret.to_string(),
            access_token_minutes: DEFAULT_ACCESS_TOKEN_MINUTES,
        }
    }
}

// Never print the secret
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("access_token_minutes", &self.access_token_minutes)
            .finish()
    }
}

/// Immutable application configuration
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub analysis_server: Option<AnalysisServerConfig>,
    pub completion: Option<CompletionConfig>,
    /// Replace both AI clients with mocks (`AI_BACKEND=mock`)
    pub use_mock_ai: bool,
    pub pipeline: PipelineMode,
    pub auth: Option<AuthConfig>,
    pub allowed_origins: Vec<String>,
}

impl AppConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup (empty values count as unset)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let analysis_server = get("MOMENTO_AI_SERVER_URL").map(|url| {
            AnalysisServerConfig::new(&url, &get("MOMENTO_AI_SERVER_API_KEY").unwrap_or_default())
        });

        let completion_key = get("OPENAI_COMPATIBLE_API_KEY");
        let completion_host = get("OPENAI_COMPATIBLE_HOST").or_else(|| {
            completion_key
                .as_ref()
                .map(|_| DEFAULT_OPENAI_HOST.to_string())
        });
        let completion = completion_host.map(|host| {
            let model =
                get("OPENAI_COMPATIBLE_MODEL").unwrap_or_else(|| DEFAULT_COMPLETION_MODEL.into());
            let config = CompletionConfig::new(&host, &model);
            match completion_key.as_deref() {
                Some(key) => config.with_api_key(key),
                None => config,
            }
        });

        let use_mock_ai = get("AI_BACKEND")
            .map(|b| b.eq_ignore_ascii_case("mock"))
            .unwrap_or(false);

        let pipeline = match get("MOMENTO_PIPELINE") {
            Some(mode) => mode.parse().map_err(Error::Config)?,
            None if analysis_server.is_some() => PipelineMode::Analysis,
            None if completion.is_some() => PipelineMode::Tags,
            None => PipelineMode::default(),
        };

        let auth = match get("MOMENTO_JWT_SECRET") {
            Some(secret) => {
                let mut auth = AuthConfig::new(&secret);
                if let Some(minutes) = get("MOMENTO_ACCESS_TOKEN_MINUTES") {
                    auth.access_token_minutes = minutes.parse().map_err(|_| {
                        Error::Config(format!(
                            "MOMENTO_ACCESS_TOKEN_MINUTES must be an integer, got {}",
                            minutes
                        ))
                    })?;
                }
                Some(auth)
            }
            None => None,
        };

        let allowed_origins = get("MOMENTO_ALLOWED_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            analysis_server,
            completion,
            use_mock_ai,
            pipeline,
            auth,
            allowed_origins,
        })
    }

    /// Auth settings, or a configuration error naming the missing variable
    pub fn require_auth(&self) -> Result<&AuthConfig> {
        self.auth.as_ref().ok_or_else(|| {
            Error::Config("MOMENTO_JWT_SECRET must be set to issue or verify access tokens".into())
        })
    }
}
