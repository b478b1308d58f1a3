use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::llm::ai::{AIMessage, Usage};
use crate::llm::chat_runtime::ChatEndpoint;
use crate::llm::provider::{
    ChatModel, ChatRequest, ModelOptions, Provider, ProviderError, ToolChoice,
};
use crate::llm::tools::ToolCall;

/// Chat-completions client shared by OpenAI and Fireworks.
#[derive(Debug, Clone)]
pub struct ChatOpenAi {
    provider: Provider,
    model: String,
    api_key: String,
    options: ModelOptions,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<UsagePayload>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Value,
}

#[derive(Debug, Deserialize)]
struct UsagePayload {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
}

impl ChatOpenAi {
    pub fn new(
        provider: Provider,
        client: reqwest::Client,
        model: impl Into<String>,
        api_key: impl Into<String>,
        options: ModelOptions,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            api_key: api_key.into(),
            options,
            client,
        }
    }

    fn endpoint(&self) -> &str {
        self.options
            .base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.endpoint())
    }

    /// Request body for one completion.
    pub fn build_payload(&self, request: &ChatRequest<'_>) -> Value {
        let mut payload = Map::new();
        payload.insert("model".to_string(), Value::String(self.model.clone()));
        payload.insert(
            "messages".to_string(),
            Value::Array(request.messages.iter().map(|message| message.to_json()).collect()),
        );
        if let Some(temperature) = self.options.temperature {
            payload.insert("temperature".to_string(), json!(temperature));
        }
        if let Some(max_tokens) = self.options.max_tokens {
            payload.insert("max_tokens".to_string(), json!(max_tokens));
        }
        if !request.tools.is_empty() {
            payload.insert(
                "tools".to_string(),
                Value::Array(request.tools.iter().map(|tool| tool.to_json()).collect()),
            );
            let choice = match request.tool_choice {
                ToolChoice::Auto => "auto",
                ToolChoice::None => "none",
            };
            payload.insert("tool_choice".to_string(), json!(choice));
        }
        Value::Object(payload)
    }
}

#[async_trait]
impl ChatModel for ChatOpenAi {
    fn provider(&self) -> Provider {
        self.provider
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: ChatRequest<'_>) -> Result<AIMessage, ProviderError> {
        let provider = self.provider;
        let payload = self.build_payload(&request);

        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key)).map_err(|_| {
            ProviderError::Malformed {
                provider,
                detail: "API key contains characters not allowed in a header".to_string(),
            }
        })?;
        headers.insert(AUTHORIZATION, bearer);

        let endpoint = ChatEndpoint {
            provider,
            url: self.endpoint(),
            headers,
            options: &self.options,
        };
        let response = endpoint.post(&self.client, &payload).await?;

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|source| ProviderError::Request { provider, source })?;
        let message = body
            .choices
            .first()
            .map(|choice| &choice.message)
            .ok_or(ProviderError::EmptyResponse { provider })?;

        let content = message["content"].as_str().unwrap_or("").to_string();
        let tool_calls = parse_tool_calls(message);
        if content.is_empty() && tool_calls.is_empty() {
            return Err(ProviderError::EmptyResponse { provider });
        }

        Ok(AIMessage {
            content,
            tool_calls,
            usage: body.usage.map(|usage| Usage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
            }),
        })
    }
}

fn parse_tool_calls(message: &Value) -> Vec<ToolCall> {
    let mut tool_calls = Vec::new();
    if let Some(calls) = message["tool_calls"].as_array() {
        for call in calls {
            let id = call["id"].as_str().unwrap_or("").to_string();
            let name = call["function"]["name"].as_str().unwrap_or("").to_string();
            let arguments = &call["function"]["arguments"];
            let args = match arguments {
                Value::String(raw) => {
                    serde_json::from_str(raw).unwrap_or(Value::String(raw.clone()))
                }
                other => other.clone(),
            };
            if !name.is_empty() {
                tool_calls.push(ToolCall { id, name, args });
            }
        }
    }
    tool_calls
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::messages::ChatMessage;
    use crate::llm::tools::{ToolDefinition, ToolFunction};

    #[test]
    fn parses_stringified_arguments() {
        let message = json!({
            "content": null,
            "tool_calls": [{
                "id": "call_9",
                "type": "function",
                "function": {"name": "search_concepts", "arguments": "{\"q\":\"malaria\"}"}
            }]
        });
        let calls = parse_tool_calls(&message);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_9");
        assert_eq!(calls[0].args["q"], "malaria");
    }

    #[test]
    fn nameless_calls_are_dropped() {
        let message = json!({
            "tool_calls": [{"id": "x", "function": {"name": "", "arguments": "{}"}}]
        });
        assert!(parse_tool_calls(&message).is_empty());
    }

    #[test]
    fn tool_choice_none_is_sent_with_tools() {
        let client = ChatOpenAi::new(
            Provider::Fireworks,
            reqwest::Client::new(),
            "accounts/fireworks/models/kimi-k2-instruct-0905",
            "key",
            ModelOptions {
                max_tokens: Some(256),
                ..ModelOptions::default()
            },
        );
        let messages = [ChatMessage::user("hello")];
        let tools = [ToolDefinition::from_function(ToolFunction::new(
            "list_servers",
            "List servers",
        ))];
        let payload = client.build_payload(&ChatRequest {
            messages: &messages,
            tools: &tools,
            tool_choice: ToolChoice::None,
        });
        assert_eq!(payload["tool_choice"], "none");
        assert_eq!(payload["max_tokens"], 256);
        assert!(payload.get("temperature").is_none());
    }
}
