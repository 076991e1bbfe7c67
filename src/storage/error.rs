use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Upstream returned status {0}")]
    UpstreamStatus(u16),
}

impl StorageError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, StorageError::HttpError(e) if e.is_timeout())
    }
}
