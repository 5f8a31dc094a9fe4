use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::analysis::{Facet, FacetPrompts};

/// Configuration for the term sheet analyzer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Generative-language service settings
    pub gemini: GeminiConfig,

    /// Per-facet request parameters
    pub facets: FacetsConfig,

    /// System instruction files
    pub prompts: PromptConfig,

    /// Debug output and logging settings
    pub output: OutputConfig,

    /// HTTP upload endpoint settings
    pub server: ServerConfig,
}

/// Gemini service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key; analysis is skipped when absent
    pub api_key: Option<String>,

    /// API base URL, without trailing `/models`
    pub base_url: String,

    /// TCP connect timeout (seconds)
    pub connect_timeout_seconds: u64,

    /// Deadline for one analysis batch, from first request to last chunk (seconds)
    pub stream_timeout_seconds: u64,
}

/// Request parameters for one facet
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FacetConfig {
    /// Model identifier
    pub model: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum output tokens
    pub max_tokens: u32,

    /// Thinking token budget (-1 = dynamic)
    pub thinking_budget: i32,

    /// System instruction file, relative to the prompt directory
    pub prompt_file: String,
}

/// Request parameters for all three facets
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FacetsConfig {
    pub control: FacetConfig,
    pub economics: FacetConfig,
    pub security: FacetConfig,
}

impl FacetsConfig {
    pub fn for_facet(&self, facet: Facet) -> &FacetConfig {
        match facet {
            Facet::Control => &self.control,
            Facet::Economics => &self.economics,
            Facet::Security => &self.security,
        }
    }
}

impl Default for FacetsConfig {
    fn default() -> Self {
        Self {
            control: FacetConfig {
                model: "gemini-2.5-flash".to_string(),
                temperature: 0.3,
                max_tokens: 7500,
                thinking_budget: -1,
                prompt_file: "control.txt".to_string(),
            },
            economics: FacetConfig {
                model: "gemini-2.5-flash".to_string(),
                temperature: 0.3,
                max_tokens: 10000,
                thinking_budget: -1,
                prompt_file: "economics.txt".to_string(),
            },
            security: FacetConfig {
                model: "gemini-2.5-flash-lite".to_string(),
                temperature: 0.2,
                max_tokens: 10000,
                thinking_budget: -1,
                prompt_file: "security.txt".to_string(),
            },
        }
    }
}

/// Configuration for the facet prompts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Base directory for prompt files
    pub prompt_dir: PathBuf,
}

impl PromptConfig {
    /// Load prompt content from a specific file
    pub async fn load_prompt(&self, filename: &str) -> Result<String> {
        let path = self.prompt_dir.join(filename);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(content.trim().to_string()),
            Err(e) => Err(anyhow!("Failed to load prompt from {}: {}", path.display(), e)),
        }
    }

    /// Load the system instructions of all three facets
    pub async fn load_facet_prompts(&self, facets: &FacetsConfig) -> Result<FacetPrompts> {
        let (control, economics, security) = tokio::try_join!(
            self.load_prompt(&facets.control.prompt_file),
            self.load_prompt(&facets.economics.prompt_file),
            self.load_prompt(&facets.security.prompt_file),
        )?;

        tracing::debug!("📝 Loaded facet prompts from {}", self.prompt_dir.display());
        Ok(FacetPrompts::new(control, economics, security))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Write every analysis result to a debug file
    pub enable_debug_output: bool,

    /// Directory for debug files
    pub debug_dir: PathBuf,

    /// Log level
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listening port
    pub port: u16,

    /// Maximum accepted upload size in bytes
    pub max_upload_bytes: usize,

    /// Minimum extracted text length (trimmed) worth analyzing
    pub min_text_chars: usize,
}

impl Config {
    /// Load configuration from file, then apply environment overrides
    pub fn load() -> Result<Self> {
        let config_paths = [
            "termsheet-analyzer.toml",
            "config/termsheet-analyzer.toml",
            "/etc/termsheet-analyzer/config.toml",
        ];

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str::<Config>(&config_str) {
                    Ok(mut config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        config.apply_env();
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        Ok(Self::from_env())
    }

    /// Default configuration with environment overrides
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Ok(api_key) = std::env::var("GOOGLE_API_KEY") {
            if !api_key.trim().is_empty() {
                self.gemini.api_key = Some(api_key.trim().to_string());
            }
        }

        if let Ok(prompt_dir) = std::env::var("TERMSHEET_ANALYZER_PROMPT_DIR") {
            self.prompts.prompt_dir = PathBuf::from(prompt_dir);
        }

        if let Ok(debug_dir) = std::env::var("TERMSHEET_ANALYZER_DEBUG_DIR") {
            self.output.debug_dir = PathBuf::from(debug_dir);
        }

        if let Ok(port) = std::env::var("TERMSHEET_ANALYZER_PORT") {
            self.server.port = port.parse().unwrap_or(self.server.port);
        }

        if let Ok(log_level) = std::env::var("TERMSHEET_ANALYZER_LOG_LEVEL") {
            self.output.log_level = log_level;
        }
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(config_str: &str) -> Result<Self> {
        Ok(toml::from_str(config_str)?)
    }

    /// Save configuration to file
    pub fn save(&self, path: &str) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        for facet in Facet::ALL {
            let facet_config = self.facets.for_facet(facet);

            if facet_config.model.trim().is_empty() {
                return Err(anyhow!("{} facet: model must not be empty", facet));
            }
            if facet_config.max_tokens == 0 {
                return Err(anyhow!("{} facet: max_tokens must be greater than 0", facet));
            }
            if !(0.0..=2.0).contains(&facet_config.temperature) {
                return Err(anyhow!(
                    "{} facet: temperature {} outside 0.0..=2.0",
                    facet,
                    facet_config.temperature
                ));
            }
        }

        if self.gemini.stream_timeout_seconds == 0 || self.gemini.connect_timeout_seconds == 0 {
            return Err(anyhow!("Gemini timeouts must be greater than 0"));
        }

        if self.server.max_upload_bytes == 0 {
            return Err(anyhow!("max_upload_bytes must be greater than 0"));
        }

        tracing::info!("✅ Configuration validation passed");
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Term Sheet Analyzer Configuration:\n\
            - Credential: {}\n\
            - Control: {} (temp {}, {} tokens)\n\
            - Economics: {} (temp {}, {} tokens)\n\
            - Security: {} (temp {}, {} tokens)\n\
            - Stream Timeout: {}s\n\
            - Prompt Directory: {}\n\
            - Debug Output: {}",
            if self.gemini.has_api_key() { "configured" } else { "missing" },
            self.facets.control.model,
            self.facets.control.temperature,
            self.facets.control.max_tokens,
            self.facets.economics.model,
            self.facets.economics.temperature,
            self.facets.economics.max_tokens,
            self.facets.security.model,
            self.facets.security.temperature,
            self.facets.security.max_tokens,
            self.gemini.stream_timeout_seconds,
            self.prompts.prompt_dir.display(),
            self.output.enable_debug_output
        )
    }
}

impl GeminiConfig {
    /// Whether a non-empty API key is set
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            connect_timeout_seconds: 10,
            stream_timeout_seconds: 300, // 5 minutes per channel
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini: GeminiConfig::default(),
            facets: FacetsConfig::default(),
            prompts: PromptConfig {
                prompt_dir: PathBuf::from("config/prompts"),
            },
            output: OutputConfig {
                enable_debug_output: true,
                debug_dir: PathBuf::from("."),
                log_level: "info".to_string(),
            },
            server: ServerConfig {
                port: 3000,
                max_upload_bytes: 10 * 1024 * 1024, // 10MB
                min_text_chars: 100,
            },
        }
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.config.gemini.api_key = Some(api_key);
        self
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.config.gemini.base_url = base_url;
        self
    }

    pub fn with_stream_timeout(mut self, seconds: u64) -> Self {
        self.config.gemini.stream_timeout_seconds = seconds;
        self
    }

    pub fn with_prompt_dir(mut self, dir: PathBuf) -> Self {
        self.config.prompts.prompt_dir = dir;
        self
    }

    pub fn with_debug_dir(mut self, dir: PathBuf) -> Self {
        self.config.output.debug_dir = dir;
        self
    }

    pub fn enable_debug_output(mut self, enable: bool) -> Self {
        self.config.output.enable_debug_output = enable;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
