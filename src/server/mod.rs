//! HTTP surface: chat page, message endpoint, help and config pages.

mod api;
mod chat;
pub mod error;
mod pages;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::settings::{ServerConfig, Settings};

pub use chat::{ChatRequestBody, SessionOverrides};

/// Shared, read-only state for all handlers.
pub struct AppState {
    /// Server-side defaults; browser sessions may override them per request.
    pub defaults: Settings,
    pub static_dir: PathBuf,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(defaults: Settings, static_dir: PathBuf) -> Self {
        Self {
            defaults,
            static_dir,
            http: reqwest::Client::new(),
        }
    }
}

pub fn app_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/chat", post(chat::send_message))
        .route("/tools", get(api::list_tools))
        .route("/health", get(api::health));

    Router::new()
        .route("/", get(pages::root))
        .route("/chat", get(pages::chat_page))
        .route("/help", get(pages::help_page))
        .route("/config", get(pages::config_page))
        .nest("/api", api)
        .nest_service("/static", ServeDir::new(&state.static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds the listener and serves until Ctrl-C.
pub async fn serve(config: &ServerConfig, defaults: Settings) -> std::io::Result<()> {
    let state = Arc::new(AppState::new(defaults, config.static_dir.clone()));
    tracing::info!(
        provider = %state.defaults.provider,
        model = state.defaults.model.as_deref().unwrap_or("<unset>"),
        ocl_url = %state.defaults.ocl_url,
        "session defaults loaded"
    );
    let router = app_router(state);

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!("Listening on {}", config.listen_addr);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::warn!("could not install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
