use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Failures that end a forwarded request with a JSON error body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForwardError {
    #[error("Missing {0} parameter")]
    MissingParameter(&'static str),

    #[error("Invalid parameters")]
    InvalidParameters(Vec<String>),

    #[error("Configuration URL missing")]
    MissingTargetUrl,

    #[error("Invalid redirect target")]
    InvalidRedirect,

    #[error("Could not extract image URL")]
    ExtractionFailed,

    #[error("Proxy request timeout")]
    Timeout,

    #[error("Proxy setup failed")]
    ProxyFailed,
}

impl ForwardError {
    pub fn status(&self) -> StatusCode {
        match self {
            ForwardError::MissingParameter(_) | ForwardError::InvalidParameters(_) => {
                StatusCode::BAD_REQUEST
            }
            ForwardError::ExtractionFailed => StatusCode::NOT_FOUND,
            ForwardError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ForwardError::MissingTargetUrl
            | ForwardError::InvalidRedirect
            | ForwardError::ProxyFailed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ForwardError::InvalidParameters(details) => serde_json::json!({
                "error": self.to_string(),
                "details": details,
            }),
            _ => serde_json::json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
