//! Fetch abstraction between the harvesters and the HTTP client
//!
//! Search pagination and comment-tree expansion only need "GET this URL
//! and give me JSON". This module defines that seam and the error type
//! shared by everything that talks to the API.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Error types for Reddit API operations
#[derive(Debug, Error)]
pub enum RedditError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Unexpected response shape: {0}")]
    UnexpectedShape(String),
}

impl RedditError {
    /// Map a non-success status and its body to an error
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 => RedditError::Authentication(body),
            404 => RedditError::NotFound(body),
            429 => RedditError::RateLimit(body),
            _ => RedditError::Api {
                status,
                message: body,
            },
        }
    }
}

/// Source of API JSON documents
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// GET `url` and decode the body as JSON
    async fn fetch_json(&self, url: &str) -> Result<Value, RedditError>;

    /// Base URL that endpoint paths are joined onto
    fn api_base_url(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            RedditError::from_status(401, String::new()),
            RedditError::Authentication(_)
        ));
        assert!(matches!(
            RedditError::from_status(429, String::new()),
            RedditError::RateLimit(_)
        ));
        assert!(matches!(
            RedditError::from_status(404, String::new()),
            RedditError::NotFound(_)
        ));
        assert!(matches!(
            RedditError::from_status(500, "boom".to_string()),
            RedditError::Api { status: 500, .. }
        ));
    }
}
