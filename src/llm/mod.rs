pub mod gemini;
pub mod sse;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::analysis::RequestSpec;
use crate::config::GeminiConfig;

/// LLM provider types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum LLMProvider {
    Gemini,
}

/// Error types for generation requests
#[derive(thiserror::Error, Debug)]
pub enum LLMError {
    #[error("authentication rejected ({status}): {message}")]
    Auth { status: u16, message: String },

    #[error("invalid request ({status}): {message}")]
    InvalidRequest { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("stream error: {0}")]
    Stream(String),
}

impl LLMError {
    /// Classify a non-success HTTP status returned while opening a stream
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 | 403 => LLMError::Auth { status, message },
            400 | 404 => LLMError::InvalidRequest { status, message },
            _ => LLMError::Api { status, message },
        }
    }
}

/// Chat message for LLM communication
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// One unit of a streamed response. `text` is `None` when the chunk carried
/// no usable text fragment.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StreamChunk {
    pub text: Option<String>,
}

impl StreamChunk {
    pub fn text(fragment: impl Into<String>) -> Self {
        Self {
            text: Some(fragment.into()),
        }
    }

    pub fn empty() -> Self {
        Self { text: None }
    }
}

/// An established response stream
pub type ChunkStream = BoxStream<'static, Result<StreamChunk, LLMError>>;

/// Trait for streaming generation providers
#[async_trait]
pub trait LLM: Send + Sync {
    /// Open a response stream. Resolves once the upstream accepted the request.
    async fn generate_stream(&self, request: &RequestSpec) -> Result<ChunkStream, LLMError>;

    /// Whether a service credential is available; no network activity
    fn credential_configured(&self) -> bool;

    fn provider_type(&self) -> LLMProvider;
}

/// Create LLM instance based on configuration
pub fn create_llm(config: &GeminiConfig) -> anyhow::Result<Box<dyn LLM>> {
    Ok(Box::new(gemini::GeminiProvider::new(config.clone())?))
}
