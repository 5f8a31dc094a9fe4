use super::sse::sse_chunks;
use super::{ChunkStream, LLMError, LLMProvider, LLM};
use crate::analysis::{RequestSpec, ResponseFormat};
use crate::config::GeminiConfig;
use anyhow::Result;
use async_trait::async_trait;
use futures::StreamExt;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Gemini provider implementation using `streamGenerateContent`
pub struct GeminiProvider {
    config: GeminiConfig,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    system_instruction: GeminiContent<'a>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    thinking_config: GeminiThinkingConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiThinkingConfig {
    thinking_budget: i32,
}

impl<'a> GeminiRequest<'a> {
    fn from_spec(spec: &'a RequestSpec) -> Self {
        let contents = spec
            .contents
            .iter()
            .map(|msg| GeminiContent {
                role: Some(msg.role.as_str()),
                parts: vec![GeminiPart { text: &msg.content }],
            })
            .collect();

        let response_mime_type = match spec.response_format {
            ResponseFormat::Json => Some("application/json"),
            ResponseFormat::Text => None,
        };

        Self {
            contents,
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: &spec.system_instruction,
                }],
            },
            generation_config: GeminiGenerationConfig {
                max_output_tokens: spec.max_output_tokens,
                temperature: spec.temperature,
                response_mime_type,
                thinking_config: GeminiThinkingConfig {
                    thinking_budget: spec.thinking_budget,
                },
            },
        }
    }
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        // Connect timeout only; the analyzer owns the stream deadline
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .build()?;

        Ok(Self { config, client })
    }

    fn stream_url(&self, model: &str) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.config.base_url.trim_end_matches('/'),
            model
        )
    }
}

#[async_trait]
impl LLM for GeminiProvider {
    async fn generate_stream(&self, spec: &RequestSpec) -> Result<ChunkStream, LLMError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| LLMError::Auth {
                status: 401,
                message: "Gemini API key not configured".to_string(),
            })?;

        let request = GeminiRequest::from_spec(spec);
        let url = self.stream_url(&spec.model);

        debug!("Opening Gemini stream for {} facet on {}", spec.facet, spec.model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| LLMError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(LLMError::from_status(status, text));
        }

        Ok(sse_chunks(response.bytes_stream()).boxed())
    }

    fn credential_configured(&self) -> bool {
        self.config.has_api_key()
    }

    fn provider_type(&self) -> LLMProvider {
        LLMProvider::Gemini
    }
}
