use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigStoreError {
    #[error("Endpoint already exists: {0}")]
    AlreadyExists(String),

    #[error("Endpoint not found: {0}")]
    NotFound(String),

    #[error("Invalid endpoint name: {0}")]
    InvalidName(String),

    #[error("Failed to save configuration")]
    SaveFailed,

    #[error("Configuration file could not be parsed: {0}")]
    Unreadable(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

impl IntoResponse for ConfigStoreError {
    fn into_response(self) -> Response {
        let status = match self {
            ConfigStoreError::AlreadyExists(_) => StatusCode::CONFLICT,
            ConfigStoreError::NotFound(_) => StatusCode::NOT_FOUND,
            ConfigStoreError::InvalidName(_) => StatusCode::BAD_REQUEST,
            ConfigStoreError::SaveFailed
            | ConfigStoreError::Unreadable(_)
            | ConfigStoreError::IoError(_)
            | ConfigStoreError::SerdeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (
            status,
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}
