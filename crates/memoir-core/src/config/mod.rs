//! Configuration system for memoir.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{MemoirError, MemoirResult};
use crate::traits::LlmConfig;

/// LLM provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    DeepInfra,
    OpenAI,
}

impl LlmProvider {
    /// Parse a provider name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "deepinfra" => Some(LlmProvider::DeepInfra),
            "openai" => Some(LlmProvider::OpenAI),
            _ => None,
        }
    }

    /// Environment variable holding the provider API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            LlmProvider::DeepInfra => "DEEPINFRA_API_KEY",
            LlmProvider::OpenAI => "OPENAI_API_KEY",
        }
    }
}

/// Provider configuration with type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmProviderConfig {
    /// Provider type.
    #[serde(default)]
    pub provider: LlmProvider,
    /// Provider-specific configuration.
    #[serde(flatten)]
    pub config: LlmConfig,
}

/// Main memoir configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoirConfig {
    /// LLM configuration.
    pub llm: LlmProviderConfig,
    /// Ask providers that support it for a JSON object response.
    pub json_response_format: bool,
    /// Custom fact extraction system prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_fact_extraction_prompt: Option<String>,
    /// Custom update memory prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_update_memory_prompt: Option<String>,
}

impl Default for MemoirConfig {
    fn default() -> Self {
        Self {
            llm: LlmProviderConfig::default(),
            json_response_format: true,
            custom_fact_extraction_prompt: None,
            custom_update_memory_prompt: None,
        }
    }
}

impl MemoirConfig {
    /// Default location of the configuration file: `~/.memoir/config.toml`.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".memoir"))
            .unwrap_or_else(|| PathBuf::from(".memoir"))
            .join("config.toml")
    }

    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<Path>) -> MemoirResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| MemoirError::Configuration(e.to_string()))
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| MemoirError::Configuration(e.to_string())),
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| MemoirError::Configuration(e.to_string())),
            _ => Err(MemoirError::Configuration(
                "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
            )),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Overlay environment variables on top of this configuration.
    pub fn apply_env(&mut self) {
        if let Ok(provider) = std::env::var("MEMOIR_LLM_PROVIDER") {
            match LlmProvider::from_name(&provider) {
                Some(p) => self.llm.provider = p,
                None => tracing::warn!(%provider, "Ignoring unknown MEMOIR_LLM_PROVIDER"),
            }
        }
        if let Ok(model) = std::env::var("MEMOIR_LLM_MODEL") {
            self.llm.config.model = model;
        }
        if let Ok(base_url) = std::env::var("MEMOIR_LLM_BASE_URL") {
            self.llm.config.base_url = Some(base_url);
        }
        if self.llm.config.api_key.is_none() {
            if let Ok(api_key) = std::env::var(self.llm.provider.api_key_env()) {
                self.llm.config.api_key = Some(api_key);
            }
        }
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> MemoirConfigBuilder {
        MemoirConfigBuilder::default()
    }
}

/// Builder for MemoirConfig.
#[derive(Default)]
pub struct MemoirConfigBuilder {
    config: MemoirConfig,
}

impl MemoirConfigBuilder {
    /// Set LLM configuration.
    pub fn llm(mut self, config: LlmProviderConfig) -> Self {
        self.config.llm = config;
        self
    }

    /// Enable or disable JSON response format requests.
    pub fn json_response_format(mut self, enabled: bool) -> Self {
        self.config.json_response_format = enabled;
        self
    }

    /// Set custom fact extraction prompt.
    pub fn custom_fact_extraction_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.custom_fact_extraction_prompt = Some(prompt.into());
        self
    }

    /// Set custom update memory prompt.
    pub fn custom_update_memory_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.custom_update_memory_prompt = Some(prompt.into());
        self
    }

    /// Build the configuration.
    pub fn build(self) -> MemoirConfig {
        self.config
    }
}
