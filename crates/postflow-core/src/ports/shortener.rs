//! Link shortening port.

use async_trait::async_trait;

/// Shortens long URLs through an external service.
#[async_trait]
pub trait LinkShortener: Send + Sync {
    /// Return the short form of `long_url`.
    async fn shorten(&self, long_url: &str) -> Result<String, ShortenError>;
}

/// Link shortening errors.
#[derive(Debug, thiserror::Error)]
pub enum ShortenError {
    /// A required credential is not configured. No request was sent.
    #[error("Shortener not configured: {0} is not set")]
    Configuration(&'static str),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Shortener API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}
