use axum::Json;
use serde::Serialize;

use crate::toolbox::{ToolInfo, catalog};

#[derive(Serialize)]
pub struct Health {
    status: &'static str,
    version: &'static str,
    git_sha: &'static str,
    build_ts: &'static str,
}

pub async fn list_tools() -> Json<Vec<ToolInfo>> {
    Json(catalog())
}

pub async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        git_sha: env!("OCLCHAT_GIT_SHA"),
        build_ts: env!("OCLCHAT_BUILD_TS"),
    })
}
