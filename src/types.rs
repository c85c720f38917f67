//! Common error and result types

use thiserror::Error;

/// Errors surfaced by the gateway
#[derive(Error, Debug)]
pub enum CivicError {
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unreadable image: {0}")]
    UnreadableImage(String),

    #[error("Upload error: {0}")]
    Upload(String),

    #[error("Auth provider error: {0}")]
    UpstreamAuth(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CivicError {
    /// HTTP status the error maps to at the edge
    pub fn status_code(&self) -> u16 {
        match self {
            CivicError::Unauthenticated(_) => 401,
            CivicError::Forbidden(_) => 403,
            CivicError::NotFound(_) => 404,
            CivicError::InvalidInput(_) => 400,
            CivicError::UnreadableImage(_) => 400,
            CivicError::Upload(_) => 502,
            CivicError::UpstreamAuth(_) => 400,
            CivicError::Conflict(_) => 409,
            CivicError::Database(_) => 503,
            CivicError::Http(_) => 400,
            CivicError::Config(_) => 500,
            CivicError::Internal(_) => 500,
        }
    }
}

impl From<std::io::Error> for CivicError {
    fn from(e: std::io::Error) -> Self {
        CivicError::Internal(format!("IO error: {}", e))
    }
}

impl From<serde_json::Error> for CivicError {
    fn from(e: serde_json::Error) -> Self {
        CivicError::InvalidInput(format!("JSON error: {}", e))
    }
}

impl From<mongodb::error::Error> for CivicError {
    fn from(e: mongodb::error::Error) -> Self {
        CivicError::Database(format!("MongoDB error: {}", e))
    }
}

impl From<reqwest::Error> for CivicError {
    fn from(e: reqwest::Error) -> Self {
        CivicError::UpstreamAuth(format!("Provider request failed: {}", e))
    }
}

pub type Result<T> = std::result::Result<T, CivicError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(CivicError::Unauthenticated("x".into()).status_code(), 401);
        assert_eq!(CivicError::Forbidden("x".into()).status_code(), 403);
        assert_eq!(CivicError::NotFound("x".into()).status_code(), 404);
        assert_eq!(CivicError::InvalidInput("x".into()).status_code(), 400);
        assert_eq!(CivicError::Conflict("x".into()).status_code(), 409);
        assert_eq!(CivicError::Upload("x".into()).status_code(), 502);
        assert_eq!(CivicError::Database("x".into()).status_code(), 503);
        assert_eq!(CivicError::Internal("x".into()).status_code(), 500);
    }
}
