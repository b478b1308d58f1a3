//! Language model integration.
//!
//! Typed chat messages, tool schemas, and provider clients used by the
//! tool-calling loop in [`crate::agent`].

/// Assistant reply structures.
pub mod ai;
/// Anthropic Messages API client.
pub mod anthropic;
pub(crate) mod chat_runtime;
/// Role-tagged conversation messages.
pub mod messages;
/// OpenAI-compatible chat-completions client (OpenAI, Fireworks).
pub mod openai;
/// Provider selection, request options and the [`provider::ChatModel`] seam.
pub mod provider;
/// Tool schema and invocation payload helpers.
pub mod tools;
