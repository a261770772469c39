//! memoir-llm - LLM provider implementations for memoir.
//!
//! Both supported services speak the OpenAI chat completions protocol, so a
//! single client covers them with per-provider defaults.
//!
//! # Supported Providers
//!
//! - **DeepInfra** - hosted open models (default)
//! - **OpenAI** - GPT-4.1, GPT-4o, etc.
//!
//! # Example
//!
//! ```ignore
//! use memoir_llm::LlmFactory;
//!
//! // Reads DEEPINFRA_API_KEY from the environment
//! let llm = LlmFactory::deepinfra()?;
//!
//! // Or OpenAI with a specific model
//! let llm = LlmFactory::openai_with_model("gpt-4o-mini")?;
//! ```

mod chat_completions;
mod factory;

pub use chat_completions::{
    ChatCompletionsLlm, DEEPINFRA_API_URL, DEEPINFRA_DEFAULT_MODEL, OPENAI_API_URL,
    OPENAI_DEFAULT_MODEL,
};
pub use factory::LlmFactory;

// Re-export core types for convenience
pub use memoir_core::config::LlmProvider;
pub use memoir_core::traits::{GenerationOptions, Llm, LlmConfig, LlmResponse, ResponseFormat};
