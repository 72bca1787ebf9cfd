use reqwest::StatusCode;
use tracing::warn;

use crate::auth::AuthError;

/// Error type for every API, upload and cache operation.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Server returned status code {0}")]
    UnexpectedStatus(StatusCode),

    #[error("Server returned an empty body")]
    NoData,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Multipart boundary collided with part content {0} times")]
    BoundaryCollision(usize),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP client error: {0}")]
    Client(String),
}

impl From<url::ParseError> for ApiError {
    fn from(err: url::ParseError) -> Self {
        ApiError::InvalidUrl(err.to_string())
    }
}

impl ApiError {
    /// True when the request never left the process because no session exists.
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, ApiError::Auth(_))
    }

    /// The HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::UnexpectedStatus(status) => Some(*status),
            ApiError::Http(e) => e.status(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

/// Converts a best-effort result into an `Option`, logging the cause on failure.
pub fn soft<T>(context: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(error = %e, "{context}");
            None
        }
    }
}
