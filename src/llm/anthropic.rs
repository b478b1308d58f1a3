use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::llm::ai::{AIMessage, Usage};
use crate::llm::chat_runtime::ChatEndpoint;
use crate::llm::messages::{ChatMessage, MessageRole};
use crate::llm::provider::{
    ChatModel, ChatRequest, ModelOptions, Provider, ProviderError, ToolChoice,
};
use crate::llm::tools::ToolCall;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Anthropic Messages API client.
#[derive(Debug, Clone)]
pub struct ChatAnthropic {
    model: String,
    api_key: String,
    options: ModelOptions,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    usage: Option<UsagePayload>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct UsagePayload {
    input_tokens: Option<u32>,
    output_tokens: Option<u32>,
}

impl ChatAnthropic {
    pub fn new(
        client: reqwest::Client,
        model: impl Into<String>,
        api_key: impl Into<String>,
        options: ModelOptions,
    ) -> Self {
        Self {
            model: model.into(),
            api_key: api_key.into(),
            options,
            client,
        }
    }

    /// Request body for one completion.
    pub fn build_payload(&self, request: &ChatRequest<'_>) -> Value {
        let (system, messages) = convert_messages(request.messages);

        let mut payload = Map::new();
        payload.insert("model".to_string(), Value::String(self.model.clone()));
        payload.insert(
            "max_tokens".to_string(),
            json!(self.options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)),
        );
        payload.insert("messages".to_string(), Value::Array(messages));
        if let Some(system) = system {
            payload.insert("system".to_string(), Value::String(system));
        }
        if let Some(temperature) = self.options.temperature {
            payload.insert("temperature".to_string(), json!(temperature));
        }
        if !request.tools.is_empty() {
            payload.insert(
                "tools".to_string(),
                Value::Array(
                    request
                        .tools
                        .iter()
                        .map(|tool| tool.to_anthropic_json())
                        .collect(),
                ),
            );
            let choice = match request.tool_choice {
                ToolChoice::Auto => "auto",
                ToolChoice::None => "none",
            };
            payload.insert("tool_choice".to_string(), json!({ "type": choice }));
        }
        Value::Object(payload)
    }

    fn headers(&self) -> Result<HeaderMap, ProviderError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&self.api_key).map_err(|_| ProviderError::Malformed {
            provider: Provider::Anthropic,
            detail: "API key contains characters not allowed in a header".to_string(),
        })?;
        headers.insert(HeaderName::from_static("x-api-key"), key);
        headers.insert(
            HeaderName::from_static("anthropic-version"),
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );
        Ok(headers)
    }
}

#[async_trait]
impl ChatModel for ChatAnthropic {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: ChatRequest<'_>) -> Result<AIMessage, ProviderError> {
        let provider = Provider::Anthropic;
        let payload = self.build_payload(&request);
        let url = self
            .options
            .base_url
            .as_deref()
            .unwrap_or_else(|| provider.endpoint());

        let endpoint = ChatEndpoint {
            provider,
            url,
            headers: self.headers()?,
            options: &self.options,
        };
        let response = endpoint.post(&self.client, &payload).await?;

        let body: MessagesResponse = response
            .json()
            .await
            .map_err(|source| ProviderError::Request { provider, source })?;
        let message = collect_reply(body);
        if message.content.is_empty() && message.tool_calls.is_empty() {
            return Err(ProviderError::EmptyResponse { provider });
        }
        Ok(message)
    }
}

fn collect_reply(body: MessagesResponse) -> AIMessage {
    let mut text = Vec::new();
    let mut tool_calls = Vec::new();
    for block in body.content {
        match block {
            ContentBlock::Text { text: chunk } => text.push(chunk),
            ContentBlock::ToolUse { id, name, input } => {
                tool_calls.push(ToolCall::new(id, name, input))
            }
            ContentBlock::Other => {}
        }
    }
    AIMessage {
        content: text.join("\n"),
        tool_calls,
        usage: body.usage.map(|usage| Usage {
            prompt_tokens: usage.input_tokens,
            completion_tokens: usage.output_tokens,
        }),
    }
}

/// Splits out the system prompt and folds tool traffic into content blocks.
///
/// Consecutive tool results are merged into a single user turn, which the
/// Messages API requires after an assistant turn with several `tool_use` blocks.
fn convert_messages(messages: &[ChatMessage]) -> (Option<String>, Vec<Value>) {
    let mut system = Vec::new();
    let mut converted: Vec<Value> = Vec::new();
    let mut pending_results: Vec<Value> = Vec::new();

    for message in messages {
        if message.role != MessageRole::Tool && !pending_results.is_empty() {
            let results = std::mem::take(&mut pending_results);
            converted.push(json!({ "role": "user", "content": results }));
        }
        match message.role {
            MessageRole::System => system.push(message.content.clone()),
            MessageRole::User => {
                converted.push(json!({ "role": "user", "content": message.content }));
            }
            MessageRole::Assistant if message.tool_calls.is_empty() => {
                converted.push(json!({ "role": "assistant", "content": message.content }));
            }
            MessageRole::Assistant => {
                let mut blocks = Vec::new();
                if !message.content.is_empty() {
                    blocks.push(json!({ "type": "text", "text": message.content }));
                }
                blocks.extend(message.tool_calls.iter().map(ToolCall::to_anthropic_block));
                converted.push(json!({ "role": "assistant", "content": blocks }));
            }
            MessageRole::Tool => pending_results.push(json!({
                "type": "tool_result",
                "tool_use_id": message.tool_call_id.clone().unwrap_or_default(),
                "content": message.content,
            })),
        }
    }
    if !pending_results.is_empty() {
        converted.push(json!({ "role": "user", "content": pending_results }));
    }

    let system = (!system.is_empty()).then(|| system.join("\n\n"));
    (system, converted)
}
