//! OpenAI-compatible chat completions provider (DeepInfra, OpenAI).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use memoir_core::config::LlmProvider;
use memoir_core::error::{MemoirError, MemoirResult};
use memoir_core::traits::{
    GenerationOptions, Llm, LlmConfig, LlmResponse, Tool, ToolCall, ToolChoice, TokenUsage,
};
use memoir_core::types::Message;

pub const DEEPINFRA_API_URL: &str = "https://api.deepinfra.com/v1";
pub const DEEPINFRA_DEFAULT_MODEL: &str = "meta-llama/Llama-2-70b-chat-hf";
pub const OPENAI_API_URL: &str = "https://api.openai.com/v1";
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4.1-nano-2025-04-14";

/// LLM provider speaking the `/chat/completions` protocol.
pub struct ChatCompletionsLlm {
    client: Client,
    config: LlmConfig,
    base_url: String,
    provider: LlmProvider,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ApiResponseFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ApiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ApiResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Serialize)]
struct ApiTool {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: ApiFunction,
}

#[derive(Debug, Serialize)]
struct ApiFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ApiToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ApiToolCall {
    function: ApiFunctionCall,
}

#[derive(Debug, Deserialize)]
struct ApiFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl ChatCompletionsLlm {
    /// Create a provider for the given service.
    ///
    /// The API key comes from the config or, failing that, the provider's
    /// environment variable (`DEEPINFRA_API_KEY`, `OPENAI_API_KEY`).
    pub fn new(provider: LlmProvider, config: LlmConfig) -> MemoirResult<Self> {
        let key_env = provider.api_key_env();
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var(key_env).ok())
            .ok_or_else(|| {
                MemoirError::Configuration(format!(
                    "{:?} API key not found. Set {} environment variable or provide api_key in config.",
                    provider, key_env
                ))
            })?;

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::AUTHORIZATION,
            format!("Bearer {}", api_key)
                .parse()
                .map_err(|_| MemoirError::Configuration("Invalid API key format".to_string()))?,
        );
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            "application/json"
                .parse()
                .map_err(|_| MemoirError::Configuration("Invalid content type".to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| {
                MemoirError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| default_base_url(provider).to_string());
        url::Url::parse(&base_url).map_err(|e| {
            MemoirError::Configuration(format!("Invalid base URL '{}': {}", base_url, e))
        })?;
        let base_url = base_url.trim_end_matches('/').to_string();

        let mut config = config;
        if config.model.is_empty() {
            config.model = default_model(provider).to_string();
        }

        Ok(Self {
            client,
            config,
            base_url,
            provider,
        })
    }

    /// DeepInfra provider.
    pub fn deepinfra(config: LlmConfig) -> MemoirResult<Self> {
        Self::new(LlmProvider::DeepInfra, config)
    }

    /// OpenAI provider.
    pub fn openai(config: LlmConfig) -> MemoirResult<Self> {
        Self::new(LlmProvider::OpenAI, config)
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_request(
        &self,
        messages: &[Message],
        tools: &[Tool],
        tool_choice: ToolChoice,
        options: GenerationOptions,
    ) -> ChatRequest {
        let tools = (!tools.is_empty()).then(|| {
            tools
                .iter()
                .map(|tool| ApiTool {
                    tool_type: "function",
                    function: ApiFunction {
                        name: tool.name.clone(),
                        description: tool.description.clone(),
                        parameters: tool.parameters.clone(),
                    },
                })
                .collect::<Vec<_>>()
        });
        let tool_choice = tools.as_ref().map(|_| tool_choice.as_str());

        ChatRequest {
            model: self.config.model.clone(),
            messages: messages
                .iter()
                .map(|m| ChatMessage {
                    role: m.role.as_str(),
                    content: m.content.clone(),
                })
                .collect(),
            response_format: options.response_format.map(|f| ApiResponseFormat {
                format_type: f.as_str(),
            }),
            tools,
            tool_choice,
            temperature: Some(options.temperature.unwrap_or(self.config.temperature)),
            max_tokens: Some(options.max_tokens.unwrap_or(self.config.max_tokens)),
            top_p: Some(options.top_p.unwrap_or(self.config.top_p)),
        }
    }

    fn parse_response(response: ChatResponse) -> MemoirResult<LlmResponse> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| MemoirError::llm_invalid_response("No response choices returned"))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| ToolCall {
                name: call.function.name,
                arguments: call.function.arguments,
            })
            .collect();

        let usage = response.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(LlmResponse {
            content: Some(choice.message.content.unwrap_or_default()),
            tool_calls,
            usage,
        })
    }

    async fn send(&self, request: ChatRequest) -> MemoirResult<LlmResponse> {
        let url = self.endpoint();
        tracing::debug!(
            provider = ?self.provider,
            %url,
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.as_ref().map_or(0, Vec::len),
            "Sending chat completion request"
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(provider = ?self.provider, %url, error = %e, "Chat completion request failed");
                MemoirError::llm_connection(format!("{:?} API request failed", self.provider), e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            MemoirError::llm_connection("Failed to read response body", e)
        })?;

        if !status.is_success() {
            tracing::error!(
                provider = ?self.provider,
                status = status.as_u16(),
                %url,
                model = %self.config.model,
                error = %body,
                "Chat completion API error"
            );
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(MemoirError::from_http_status(
                status.as_u16(),
                &format!("{:?} API error: {}", self.provider, message),
            ));
        }

        let response: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            MemoirError::llm_invalid_response(format!("Failed to parse response: {}", e))
        })?;

        Self::parse_response(response)
    }
}

fn default_base_url(provider: LlmProvider) -> &'static str {
    match provider {
        LlmProvider::DeepInfra => DEEPINFRA_API_URL,
        LlmProvider::OpenAI => OPENAI_API_URL,
    }
}

fn default_model(provider: LlmProvider) -> &'static str {
    match provider {
        LlmProvider::DeepInfra => DEEPINFRA_DEFAULT_MODEL,
        LlmProvider::OpenAI => OPENAI_DEFAULT_MODEL,
    }
}

#[async_trait]
impl Llm for ChatCompletionsLlm {
    async fn generate(
        &self,
        messages: &[Message],
        options: Option<GenerationOptions>,
    ) -> MemoirResult<LlmResponse> {
        let request = self.build_request(
            messages,
            &[],
            ToolChoice::Auto,
            options.unwrap_or_default(),
        );
        self.send(request).await
    }

    async fn generate_with_tools(
        &self,
        messages: &[Message],
        tools: &[Tool],
        tool_choice: ToolChoice,
        options: Option<GenerationOptions>,
    ) -> MemoirResult<LlmResponse> {
        let request = self.build_request(messages, tools, tool_choice, options.unwrap_or_default());
        self.send(request).await
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn supports_json_mode(&self) -> bool {
        true
    }
}
