use std::path::PathBuf;

use clap::Args;

use crate::server;
use crate::settings::{Overrides, ServerConfig, Settings, process_env};
use crate::telemetry;

#[derive(Debug, Args, Clone)]
pub struct ServeArgs {
    #[arg(long, help = "Address to listen on, e.g. 127.0.0.1:8000")]
    pub listen: Option<String>,
    #[arg(long, help = "Directory served under /static")]
    pub static_dir: Option<PathBuf>,
    #[arg(long, help = "Config profile to load")]
    pub profile: Option<String>,
    #[arg(long, help = "Default model provider for new sessions")]
    pub provider: Option<String>,
    #[arg(long, help = "Default model for new sessions")]
    pub model: Option<String>,
    #[arg(long, help = "Default terminology server URL or alias")]
    pub ocl_url: Option<String>,
    #[arg(long)]
    pub timeout: Option<u64>,
    #[arg(long)]
    pub retries: Option<u32>,
}

pub async fn run(args: ServeArgs) -> Result<(), String> {
    let defaults = Settings::load(&Overrides {
        profile: args.profile,
        provider: args.provider,
        model: args.model,
        ocl_url: args.ocl_url,
        timeout: args.timeout,
        retries: args.retries,
        ..Overrides::default()
    })?;
    let config = ServerConfig::resolve(args.listen.as_deref(), args.static_dir, &process_env)?;
    telemetry::init_tracing(config.log_format, "info,tower_http=debug");

    if !config.static_dir.is_dir() {
        tracing::warn!(
            static_dir = %config.static_dir.display(),
            "static directory not found; assets will 404"
        );
    }
    if defaults.model.is_none() {
        tracing::warn!("no default model configured; sessions must choose one");
    }

    server::serve(&config, defaults)
        .await
        .map_err(|err| format!("Server error on {}: {err}", config.listen_addr))
}
