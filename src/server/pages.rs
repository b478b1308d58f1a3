use std::sync::Arc;

use axum::extract::State;
use axum::response::{Html, Redirect};
use serde::Serialize;

use crate::llm::provider::Provider;
use crate::ocl::servers::{KNOWN_SERVERS, KnownServer};
use crate::server::AppState;

const LAYOUT: &str = include_str!("../../templates/layout.html");
const CHAT: &str = include_str!("../../templates/chat.html");
const HELP: &str = include_str!("../../templates/help.html");
const CONFIG: &str = include_str!("../../templates/config.html");

/// Defaults embedded in the chat page. Secrets are reported, never rendered.
#[derive(Debug, Serialize)]
struct SessionDefaults<'a> {
    provider: &'static str,
    model: &'a str,
    ocl_url: &'a str,
    api_key_configured: bool,
    ocl_token_configured: bool,
    providers: Vec<&'static str>,
    servers: &'static [KnownServer],
}

pub async fn root() -> Redirect {
    Redirect::to("/chat")
}

pub async fn chat_page(State(state): State<Arc<AppState>>) -> Html<String> {
    let defaults = &state.defaults;
    let session = SessionDefaults {
        provider: defaults.provider.as_str(),
        model: defaults.model.as_deref().unwrap_or(""),
        ocl_url: &defaults.ocl_url,
        api_key_configured: defaults.api_key_present(),
        ocl_token_configured: defaults.ocl_token.is_some(),
        providers: Provider::ALL.iter().map(|provider| provider.as_str()).collect(),
        servers: &KNOWN_SERVERS,
    };
    let json = serde_json::to_string(&session).unwrap_or_else(|_| "{}".to_string());
    let body = CHAT.replace("{{session_defaults}}", &script_safe(&json));
    render("Chat", "chat", &body)
}

pub async fn help_page() -> Html<String> {
    render("Help", "help", HELP)
}

pub async fn config_page() -> Html<String> {
    render("Tool settings", "config", CONFIG)
}

fn render(title: &str, page: &str, content: &str) -> Html<String> {
    Html(
        LAYOUT
            .replace("{{title}}", title)
            .replace("{{page}}", page)
            .replace("{{content}}", content),
    )
}

/// Makes JSON safe to place inside a `<script>` element.
fn script_safe(json: &str) -> String {
    json.replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}
