//! OpenAI-compatible completion backend
//!
//! Works with any server that implements the OpenAI `/v1/chat/completions`
//! API (api.openai.com, vLLM, LocalAI, llama-server, ...). Used for tag
//! extraction and for personalized diary comments.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::CompletionConfig;
use crate::error::{Error, Result};
use crate::prompts::{self, Prompt};

use super::parsing::parse_tag_list;
use super::types::ExtractedTag;
use super::{AIBackend, COMMENT_FALLBACK};

/// OpenAI-compatible backend
#[derive(Clone)]
pub struct OpenAICompatibleBackend {
    http_client: Client,
    config: CompletionConfig,
}

impl OpenAICompatibleBackend {
    /// Create a backend from completion settings
    pub fn new(config: CompletionConfig) -> Self {
        Self {
            http_client: Client::new(),
            config,
        }
    }

    /// Send one system + user exchange and return the reply text
    async fn chat_completion(&self, prompt: &Prompt, user: String) -> Result<String> {
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: prompt.system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user,
                },
            ],
            temperature: Some(prompt.sampling.temperature),
            max_tokens: Some(prompt.sampling.max_tokens),
            stream: false,
        };

        let mut req_builder = self
            .http_client
            .post(format!("{}/v1/chat/completions", self.config.base_url))
            .timeout(self.config.timeout)
            .json(&request);

        if let Some(ref api_key) = self.config.api_key {
            req_builder = req_builder.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req_builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Ai(format!("OpenAI API error {}: {}", status, body)));
        }

        let chat_response: ChatCompletionResponse = response.json().await?;

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::Ai("No response from OpenAI API".into()))
    }
}

/// Chat completion request
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

/// Chat message
#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Chat completion response
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

/// Chat completion choice
#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

/// Chat response message
#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[async_trait]
impl AIBackend for OpenAICompatibleBackend {
    async fn extract_tags(&self, content: &str) -> Vec<ExtractedTag> {
        let prompt = prompts::extract_tags();
        match self
            .chat_completion(&prompt, prompts::render_extract_tags(content))
            .await
        {
            Ok(reply) => {
                let tags = parse_tag_list(&reply);
                debug!(count = tags.len(), "Extracted tags");
                tags
            }
            Err(e) => {
                warn!(error = %e, "Tag extraction failed");
                Vec::new()
            }
        }
    }

    async fn generate_comment(&self, content: &str, similar_contents: &[String]) -> String {
        let prompt = prompts::diary_comment();
        match self
            .chat_completion(
                &prompt,
                prompts::render_diary_comment(content, similar_contents),
            )
            .await
        {
            Ok(reply) => reply.trim().to_string(),
            Err(e) => {
                warn!(error = %e, "Comment generation failed");
                COMMENT_FALLBACK.to_string()
            }
        }
    }

    async fn health_check(&self) -> bool {
        let mut req_builder = self
            .http_client
            .get(format!("{}/v1/models", self.config.base_url))
            .timeout(self.config.timeout);
        if let Some(ref api_key) = self.config.api_key {
            req_builder = req_builder.header("Authorization", format!("Bearer {}", api_key));
        }

        match req_builder.send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn host(&self) -> &str {
        &self.config.base_url
    }
}
