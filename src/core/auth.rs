//! Application-only OAuth
//!
//! Exchanges the app credentials for a bearer token using the
//! client-credentials grant.

use crate::core::config::Credentials;
use crate::core::fetcher::RedditError;
use crate::models::oauth::TokenResponse;
use reqwest::Client;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Token lifetime assumed when the server does not report one
const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3600;

/// Tokens this close to expiry are refreshed before use
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Bearer token with its expiry
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub value: String,
    pub expires_at: Instant,
}

impl AccessToken {
    pub fn is_expired(&self, now: Instant) -> bool {
        now + EXPIRY_MARGIN >= self.expires_at
    }
}

/// Random per-client device identifier
pub fn new_device_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Request a bearer token from the OAuth endpoint
///
/// # Errors
///
/// Returns `RedditError::Authentication` when the endpoint rejects the
/// credentials, `RedditError::Decode` when the body has no `access_token`.
pub async fn fetch_access_token(
    http: &Client,
    auth_url: &str,
    user_agent: &str,
    credentials: &Credentials,
    device_id: &str,
) -> Result<AccessToken, RedditError> {
    debug!("Requesting access token from {}", auth_url);

    let response = http
        .post(auth_url)
        .basic_auth(&credentials.client_id, Some(&credentials.secret_id))
        .header(reqwest::header::USER_AGENT, user_agent)
        .form(&[
            ("grant_type", "client_credentials"),
            ("device_id", device_id),
        ])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(RedditError::Authentication(format!(
            "token endpoint returned {}: {}",
            status.as_u16(),
            body
        )));
    }

    let body = response.text().await?;
    let token: TokenResponse = serde_json::from_str(&body)
        .map_err(|e| RedditError::Decode(format!("access token response: {}", e)))?;

    let lifetime = token.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
    info!(
        expires_in = lifetime,
        token_type = token.token_type.as_deref().unwrap_or("bearer"),
        scope = token.scope.as_deref().unwrap_or("*"),
        "Obtained access token"
    );

    Ok(AccessToken {
        value: token.access_token,
        expires_at: Instant::now() + Duration::from_secs(lifetime),
    })
}
