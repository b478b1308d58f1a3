use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

use crate::llm::ai::AIMessage;
use crate::llm::anthropic::ChatAnthropic;
use crate::llm::messages::ChatMessage;
use crate::llm::openai::ChatOpenAi;
use crate::llm::tools::ToolDefinition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Provider {
    #[default]
    Anthropic,
    Openai,
    Fireworks,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Self::Anthropic, Self::Openai, Self::Fireworks];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::Openai => "openai",
            Self::Fireworks => "fireworks",
        }
    }

    pub fn endpoint(self) -> &'static str {
        match self {
            Self::Anthropic => "https://api.anthropic.com/v1/messages",
            Self::Openai => "https://api.openai.com/v1/chat/completions",
            Self::Fireworks => "https://api.fireworks.ai/inference/v1/chat/completions",
        }
    }

    /// Provider-specific key variable consulted when `LM_TOKEN` is unset.
    pub fn api_key_env(self) -> &'static str {
        match self {
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::Openai => "OPENAI_API_KEY",
            Self::Fireworks => "FIREWORKS_API_KEY",
        }
    }

    pub fn supported_values() -> String {
        Self::ALL
            .iter()
            .map(|provider| provider.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "anthropic" => Ok(Self::Anthropic),
            "openai" => Ok(Self::Openai),
            "fireworks" => Ok(Self::Fireworks),
            _ => Err(format!(
                "Unsupported provider '{value}'. Supported values: {}.",
                Self::supported_values()
            )),
        }
    }
}

/// Sampling and transport options shared by all providers.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub retries: u32,
    pub retry_delay_ms: u64,
    /// Overrides [`Provider::endpoint`].
    pub base_url: Option<String>,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            temperature: None,
            max_tokens: None,
            timeout_secs: Some(120),
            retries: 2,
            retry_delay_ms: 500,
            base_url: None,
        }
    }
}

/// Whether the model may call tools on this request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolChoice {
    #[default]
    Auto,
    None,
}

/// One completion request.
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    pub messages: &'a [ChatMessage],
    pub tools: &'a [ToolDefinition],
    pub tool_choice: ToolChoice,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("No API key provided for {provider}. Set LM_TOKEN or {key_env}.")]
    MissingApiKey {
        provider: Provider,
        key_env: &'static str,
    },
    #[error("{provider} request failed: {source}")]
    Request {
        provider: Provider,
        #[source]
        source: reqwest::Error,
    },
    #[error("{provider} API error {status}: {body}")]
    Api {
        provider: Provider,
        status: StatusCode,
        body: String,
    },
    #[error("{provider} response did not contain message content")]
    EmptyResponse { provider: Provider },
    #[error("{provider} returned an unexpected response: {detail}")]
    Malformed { provider: Provider, detail: String },
}

/// A chat model that may request tool calls.
#[async_trait]
pub trait ChatModel: Send + Sync {
    fn provider(&self) -> Provider;

    fn model(&self) -> &str;

    async fn complete(&self, request: ChatRequest<'_>) -> Result<AIMessage, ProviderError>;
}

/// Builds the client for `provider`.
pub fn build_chat_model(
    provider: Provider,
    model: &str,
    api_key: &str,
    options: ModelOptions,
) -> Result<Box<dyn ChatModel>, ProviderError> {
    if api_key.trim().is_empty() {
        return Err(ProviderError::MissingApiKey {
            provider,
            key_env: provider.api_key_env(),
        });
    }

    let http = reqwest::Client::new();
    Ok(match provider {
        Provider::Anthropic => Box::new(ChatAnthropic::new(http, model, api_key, options)),
        Provider::Openai | Provider::Fireworks => {
            Box::new(ChatOpenAi::new(provider, http, model, api_key, options))
        }
    })
}
