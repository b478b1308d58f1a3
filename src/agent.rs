//! The tool-calling loop.
//!
//! A turn sends the conversation to the model, runs whatever tools it asks
//! for, feeds the results back, and repeats until the model answers in text
//! or [`MAX_TOOL_ROUNDS`] is reached.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llm::ai::AIMessage;
use crate::llm::messages::{ChatMessage, MessageRole};
use crate::llm::provider::{ChatModel, ChatRequest, ProviderError, ToolChoice};
use crate::llm::tools::{ToolCall, ToolDefinition};
use crate::toolbox::ToolError;

pub const MAX_TOOL_ROUNDS: usize = 4;

/// Tool output longer than this is cut before it is shown to the model.
pub const MAX_TOOL_OUTPUT_CHARS: usize = 20_000;

pub const LIMIT_NOTICE: &str = "I stopped after the maximum number of tool calls without \
reaching a final answer. Try narrowing the question.";

pub const SYSTEM_PROMPT: &str = "You are a terminology assistant for Open Concept Lab (OCL). \
Use the provided tools to look up owners, repositories, concepts, and mappings instead of \
answering from memory. Cite concept ids and repository URLs from tool results. Only call \
tools that create or update content when the user explicitly asks for a change.";

/// Runs tool calls requested by the model.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Declarations sent to the model.
    fn definitions(&self) -> Vec<ToolDefinition>;

    async fn execute(&self, call: &ToolCall) -> Result<Value, ToolError>;
}

/// One prior exchange as the browser keeps it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: MessageRole,
    pub content: String,
}

/// A tool invocation made during a turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolRun {
    pub id: String,
    pub name: String,
    pub arguments: Value,
    pub output: String,
    pub is_error: bool,
}

/// Result of one user message.
#[derive(Debug, Clone, Serialize)]
pub struct ChatTurn {
    pub reply: String,
    pub tool_calls: Vec<ToolRun>,
    /// Tool rounds executed.
    pub rounds: usize,
    pub limit_reached: bool,
}

/// System prompt, prior user/assistant exchanges, then the new message.
///
/// System and tool entries in `history` are dropped: the browser cannot
/// inject instructions and tool traffic is not replayed across turns.
pub fn build_conversation(history: &[HistoryEntry], message: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(SYSTEM_PROMPT));
    for entry in history {
        if entry.content.trim().is_empty() {
            continue;
        }
        match entry.role {
            MessageRole::User => messages.push(ChatMessage::user(entry.content.clone())),
            MessageRole::Assistant => {
                messages.push(ChatMessage::assistant(entry.content.clone()))
            }
            MessageRole::System | MessageRole::Tool => {}
        }
    }
    messages.push(ChatMessage::user(message));
    messages
}

/// Drives the model until it answers in text or the round bound is hit.
pub async fn run_turn(
    model: &dyn ChatModel,
    tools: &dyn ToolExecutor,
    mut messages: Vec<ChatMessage>,
) -> Result<ChatTurn, ProviderError> {
    let definitions = tools.definitions();
    let mut runs = Vec::new();

    for round in 0..MAX_TOOL_ROUNDS {
        let reply = complete(model, &messages, &definitions, ToolChoice::Auto).await?;
        if !reply.has_tool_calls() {
            return Ok(ChatTurn {
                reply: reply.content,
                tool_calls: runs,
                rounds: round,
                limit_reached: false,
            });
        }

        tracing::info!(
            round = round + 1,
            calls = reply.tool_calls.len(),
            "model requested tools"
        );
        messages.push(ChatMessage::assistant_from_ai(&reply));
        for call in &reply.tool_calls {
            let run = execute_call(tools, call).await;
            messages.push(ChatMessage::tool_result(&call.id, &run.output));
            runs.push(run);
        }
    }

    tracing::warn!(rounds = MAX_TOOL_ROUNDS, "tool round limit reached");
    let reply = match complete(model, &messages, &definitions, ToolChoice::None).await {
        Ok(reply) => reply,
        // Empty text here is handled by the limit notice below.
        Err(ProviderError::EmptyResponse { .. }) => AIMessage::default(),
        Err(err) => return Err(err),
    };
    let text = reply.content.trim();
    Ok(ChatTurn {
        reply: if text.is_empty() {
            LIMIT_NOTICE.to_string()
        } else {
            text.to_string()
        },
        tool_calls: runs,
        rounds: MAX_TOOL_ROUNDS,
        limit_reached: true,
    })
}

async fn complete(
    model: &dyn ChatModel,
    messages: &[ChatMessage],
    tools: &[ToolDefinition],
    tool_choice: ToolChoice,
) -> Result<AIMessage, ProviderError> {
    tracing::debug!(
        provider = %model.provider(),
        model = model.model(),
        messages = messages.len(),
        "requesting completion"
    );
    model
        .complete(ChatRequest {
            messages,
            tools,
            tool_choice,
        })
        .await
}

async fn execute_call(tools: &dyn ToolExecutor, call: &ToolCall) -> ToolRun {
    let (output, is_error) = match tools.execute(call).await {
        Ok(value) => (
            truncate_output(&render_value(&value), MAX_TOOL_OUTPUT_CHARS),
            false,
        ),
        Err(err) => {
            tracing::warn!(tool = %call.name, error = %err, "tool call failed");
            (format!("Error: {err}"), true)
        }
    };
    ToolRun {
        id: call.id.clone(),
        name: call.name.clone(),
        arguments: call.args.clone(),
        output,
        is_error,
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => "null".to_string(),
        other => serde_json::to_string(other).unwrap_or_else(|_| other.to_string()),
    }
}

fn truncate_output(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}\n[truncated after {max_chars} characters]", &text[..cut]),
        None => text.to_string(),
    }
}
