//! Error types for the cache manager
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the cache manager and its HTTP facade.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not found in cache (absent or expired)
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration could not be interpreted
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Provider is recognised but has no implementation in this crate
    #[error("Unsupported cache provider: {0}")]
    UnsupportedProvider(String),

    /// A caller-supplied fetch failed and no fallback applied
    #[error("Fetch failed: {0}")]
    Fetch(#[from] anyhow::Error),

    /// Value could not be converted to or from JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CacheError {
    /// HTTP status used when the error crosses the facade.
    pub fn status_code(&self) -> StatusCode {
        match self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Fetch(_) => StatusCode::BAD_GATEWAY,
            CacheError::InvalidConfig(_)
            | CacheError::UnsupportedProvider(_)
            | CacheError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache manager.
pub type Result<T> = std::result::Result<T, CacheError>;
