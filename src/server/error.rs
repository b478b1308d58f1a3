use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::llm::provider::ProviderError;
use crate::ocl::OclError;
use crate::toolbox::ToolError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error(transparent)]
    Ocl(#[from] OclError),
}

#[derive(Serialize)]
struct ErrorBody {
    code: u16,
    message: String,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Tool(_) | ApiError::Ocl(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Provider(ProviderError::MissingApiKey { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Provider(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        let body = Json(ErrorBody {
            code: status.as_u16(),
            message: self.to_string(),
        });
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::provider::Provider;

    #[test]
    fn provider_failures_map_to_bad_gateway() {
        let err = ApiError::from(ProviderError::EmptyResponse {
            provider: Provider::Anthropic,
        });
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn missing_key_is_a_client_error() {
        let err = ApiError::from(ProviderError::MissingApiKey {
            provider: Provider::Openai,
            key_env: "OPENAI_API_KEY",
        });
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
