use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OclError {
    #[error("terminology API request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("terminology API error {status}: {body}")]
    Api { status: StatusCode, body: String },
    #[error("invalid terminology API URL '{0}'")]
    InvalidUrl(String),
    #[error("{0}")]
    InvalidArgument(String),
}

impl OclError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status, .. } if *status == StatusCode::NOT_FOUND)
    }
}
