//! Momento Core Library
//!
//! Shared functionality for the Momento diary service:
//! - Database access and migrations (users, diaries, status records, tags)
//! - AI backends (external analysis server, OpenAI-compatible completions)
//! - Diary processing pipeline with run-token guarded status tracking
//! - Tag-based emotion derivation and similar-diary search

pub mod ai;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod prompts;
pub mod tags;

/// Test utilities including mock AI server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{
    AIBackend, AIClient, AnalysisBackend, AnalysisClient, AnalysisServerBackend, MockAnalysisBackend,
    MockBackend, OpenAICompatibleBackend,
};
pub use config::{AnalysisServerConfig, AppConfig, AuthConfig, CompletionConfig, PipelineMode};
pub use db::Database;
pub use error::{Error, Result};
pub use pipeline::{DiaryProcessor, ProcessOutcome, ProcessingJob};
pub use tags::{derive_emotion, EmotionLabel};
