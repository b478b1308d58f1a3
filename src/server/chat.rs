use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::Deserialize;

use crate::agent::{ChatTurn, HistoryEntry, build_conversation, run_turn};
use crate::llm::provider::{Provider, build_chat_model};
use crate::ocl::OclClient;
use crate::ocl::servers::resolve_ocl_url;
use crate::server::AppState;
use crate::server::error::{ApiError, ApiResult};
use crate::toolbox::{OclToolbox, parse_tool_list};

/// Per-session configuration kept by the browser.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionOverrides {
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub ocl_token: Option<String>,
    #[serde(default)]
    pub ocl_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequestBody {
    pub message: String,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub session: SessionOverrides,
    /// Tool ids the user left enabled; all tools when absent.
    #[serde(default)]
    pub enabled_tools: Option<Vec<String>>,
}

/// Effective settings for one request.
#[derive(Debug)]
struct Session {
    provider: Provider,
    model: String,
    api_key: String,
    ocl_url: String,
    ocl_token: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Layers the browser session over the server defaults.
///
/// Server secrets are only reused for the provider and terminology server
/// they were configured for.
fn resolve_session(state: &AppState, session: &SessionOverrides) -> ApiResult<Session> {
    let defaults = &state.defaults;
    let provider = match non_blank(&session.provider) {
        Some(name) => name.parse::<Provider>().map_err(ApiError::BadRequest)?,
        None => defaults.provider,
    };
    let model = non_blank(&session.model)
        .or_else(|| defaults.model.clone())
        .ok_or_else(|| {
            ApiError::BadRequest("No model configured for this session.".to_string())
        })?;
    let api_key = non_blank(&session.api_key)
        .or_else(|| {
            (provider == defaults.provider)
                .then(|| defaults.api_key.clone())
                .flatten()
        })
        .unwrap_or_default();

    let ocl_url = non_blank(&session.ocl_url)
        .map(|raw| resolve_ocl_url(&raw))
        .unwrap_or_else(|| defaults.ocl_url.clone());
    let ocl_token = non_blank(&session.ocl_token).or_else(|| {
        (ocl_url == defaults.ocl_url)
            .then(|| defaults.ocl_token.clone())
            .flatten()
    });

    Ok(Session {
        provider,
        model,
        api_key,
        ocl_url,
        ocl_token,
    })
}

pub async fn send_message(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ChatRequestBody>, JsonRejection>,
) -> ApiResult<Json<ChatTurn>> {
    let Json(body) = body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let message = body.message.trim();
    if message.is_empty() {
        return Err(ApiError::BadRequest("Message must not be empty.".to_string()));
    }

    let session = resolve_session(&state, &body.session)?;
    let model = build_chat_model(
        session.provider,
        &session.model,
        &session.api_key,
        state.defaults.options.clone(),
    )?;

    let client = OclClient::with_http(state.http.clone(), &session.ocl_url, session.ocl_token)?;
    let mut toolbox = OclToolbox::new(client);
    if let Some(names) = &body.enabled_tools {
        toolbox = toolbox.with_enabled(parse_tool_list(names)?);
    }

    let conversation = build_conversation(&body.history, message);
    let turn = run_turn(model.as_ref(), &toolbox, conversation).await?;
    tracing::info!(
        provider = %session.provider,
        model = %session.model,
        rounds = turn.rounds,
        tool_calls = turn.tool_calls.len(),
        limit_reached = turn.limit_reached,
        "chat turn completed"
    );
    Ok(Json(turn))
}
