//! Rate-limited Reddit API client
//!
//! This module provides the async HTTP client used for every API read. Each
//! GET is authorized with an application-only bearer token and passes
//! through the sliding-window rate limiter first.

use crate::core::auth::{AccessToken, fetch_access_token, new_device_id};
use crate::core::config::{Config, Credentials};
use crate::core::fetcher::{Fetcher, RedditError};
use crate::core::rate_limiter::RateLimiter;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Reddit client with OAuth and client-side rate limiting
pub struct RedditClient {
    http: Client,
    user_agent: String,
    auth_url: String,
    api_base_url: String,
    credentials: Credentials,
    device_id: String,
    token: Mutex<Option<AccessToken>>,
    limiter: Mutex<RateLimiter>,
}

impl RedditClient {
    /// Create a client without contacting the API
    pub fn new(config: &Config, credentials: Credentials) -> Result<Self, RedditError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .build()?;

        Ok(Self {
            http,
            user_agent: config.user_agent.clone(),
            auth_url: config.auth_url.clone(),
            api_base_url: config.api_base_url.clone(),
            credentials,
            device_id: new_device_id(),
            token: Mutex::new(None),
            limiter: Mutex::new(RateLimiter::new(
                config.window,
                config.max_requests,
                config.poll_interval,
            )),
        })
    }

    /// Create a client and authenticate immediately
    ///
    /// # Errors
    ///
    /// Fails if the credentials are rejected, so a bad `keys.json` is caught
    /// before any harvesting starts.
    pub async fn connect(config: &Config, credentials: Credentials) -> Result<Self, RedditError> {
        let client = Self::new(config, credentials)?;
        client.bearer().await?;
        Ok(client)
    }

    /// Current bearer token, fetching a new one if none is held or it is
    /// about to expire
    async fn bearer(&self) -> Result<String, RedditError> {
        let mut token = self.token.lock().await;
        if let Some(current) = token.as_ref() {
            if !current.is_expired(Instant::now()) {
                return Ok(current.value.clone());
            }
            info!("Access token expired, refreshing");
        }

        let fresh = fetch_access_token(
            &self.http,
            &self.auth_url,
            &self.user_agent,
            &self.credentials,
            &self.device_id,
        )
        .await?;
        let value = fresh.value.clone();
        *token = Some(fresh);
        Ok(value)
    }

    async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    /// Send an authorized, rate-limited GET and decode the JSON body
    ///
    /// A 401 response triggers one token refresh and retry.
    ///
    /// # Errors
    ///
    /// Returns a `RedditError` classified from the response status, or
    /// `RedditError::Decode` when the body is not JSON.
    pub async fn get_json(&self, url: &str) -> Result<Value, RedditError> {
        let mut refreshed = false;

        loop {
            let token = self.bearer().await?;
            self.limiter.lock().await.acquire().await;

            debug!("Sent query: {}", url);
            let response = self
                .http
                .get(url)
                .header(USER_AGENT, &self.user_agent)
                .header(AUTHORIZATION, format!("bearer {}", token))
                .send()
                .await?;

            {
                let mut limiter = self.limiter.lock().await;
                limiter.observe_headers(response.headers());
                debug!(in_window = limiter.in_window(), "Rate-limit window updated");
            }

            let status = response.status();
            if status == StatusCode::UNAUTHORIZED && !refreshed {
                warn!("Request was unauthorized, refreshing access token and retrying");
                self.invalidate_token().await;
                refreshed = true;
                continue;
            }

            if !status.is_success() {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                return Err(RedditError::from_status(status.as_u16(), body));
            }

            let body = response.text().await?;
            return serde_json::from_str(&body)
                .map_err(|e| RedditError::Decode(format!("{}: {}", url, e)));
        }
    }
}

#[async_trait]
impl Fetcher for RedditClient {
    async fn fetch_json(&self, url: &str) -> Result<Value, RedditError> {
        self.get_json(url).await
    }

    fn api_base_url(&self) -> &str {
        &self.api_base_url
    }
}
