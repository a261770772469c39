//! Factory for creating LLM providers.

use std::sync::Arc;

use memoir_core::config::{LlmProvider, MemoirConfig};
use memoir_core::error::MemoirResult;
use memoir_core::traits::{Llm, LlmConfig};

use crate::chat_completions::ChatCompletionsLlm;

/// Factory for creating LLM providers.
pub struct LlmFactory;

impl LlmFactory {
    /// Create an LLM provider from the given configuration.
    pub fn create(provider: LlmProvider, config: LlmConfig) -> MemoirResult<Arc<dyn Llm>> {
        tracing::debug!(?provider, model = %config.model, "Creating LLM provider");
        let llm = ChatCompletionsLlm::new(provider, config)?;
        Ok(Arc::new(llm))
    }

    /// Create the provider described by a memoir configuration.
    pub fn from_config(config: &MemoirConfig) -> MemoirResult<Arc<dyn Llm>> {
        Self::create(config.llm.provider, config.llm.config.clone())
    }

    /// Create a DeepInfra LLM provider with default configuration.
    pub fn deepinfra() -> MemoirResult<Arc<dyn Llm>> {
        Self::create(LlmProvider::DeepInfra, LlmConfig::default())
    }

    /// Create a DeepInfra LLM provider with a specific model.
    pub fn deepinfra_with_model(model: impl Into<String>) -> MemoirResult<Arc<dyn Llm>> {
        let config = LlmConfig {
            model: model.into(),
            ..Default::default()
        };
        Self::create(LlmProvider::DeepInfra, config)
    }

    /// Create an OpenAI LLM provider with default configuration.
    pub fn openai() -> MemoirResult<Arc<dyn Llm>> {
        Self::create(LlmProvider::OpenAI, LlmConfig::default())
    }

    /// Create an OpenAI LLM provider with a specific model.
    pub fn openai_with_model(model: impl Into<String>) -> MemoirResult<Arc<dyn Llm>> {
        let config = LlmConfig {
            model: model.into(),
            ..Default::default()
        };
        Self::create(LlmProvider::OpenAI, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memoir_core::config::LlmProviderConfig;

    #[test]
    fn test_from_config_uses_provider_and_model() {
        let config = MemoirConfig::builder()
            .llm(LlmProviderConfig {
                provider: LlmProvider::OpenAI,
                config: LlmConfig {
                    model: "gpt-4o-mini".to_string(),
                    api_key: Some("sk-test".to_string()),
                    ..Default::default()
                },
            })
            .build();

        let llm = LlmFactory::from_config(&config).unwrap();
        assert_eq!(llm.model_name(), "gpt-4o-mini");
    }

    #[test]
    fn test_empty_model_falls_back_to_provider_default() {
        let config = LlmConfig {
            api_key: Some("key".to_string()),
            ..Default::default()
        };
        let llm = LlmFactory::create(LlmProvider::DeepInfra, config).unwrap();
        assert_eq!(llm.model_name(), crate::chat_completions::DEEPINFRA_DEFAULT_MODEL);
    }
}
