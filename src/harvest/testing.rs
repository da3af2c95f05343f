//! Canned-response fetcher for harvester tests

use crate::core::fetcher::{Fetcher, RedditError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

/// Serves fixed JSON documents keyed by URL and records every request
pub struct ScriptedFetcher {
    responses: HashMap<String, Value>,
    failures: HashMap<String, u16>,
    requested: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub const BASE: &'static str = "https://oauth.test";

    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            failures: HashMap::new(),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn with(mut self, url: String, body: Value) -> Self {
        self.responses.insert(url, body);
        self
    }

    /// Answer `url` with an HTTP error status instead of a body
    pub fn failing(mut self, url: String, status: u16) -> Self {
        self.failures.insert(url, status);
        self
    }

    pub fn calls(&self) -> usize {
        self.requested.lock().unwrap().len()
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch_json(&self, url: &str) -> Result<Value, RedditError> {
        self.requested.lock().unwrap().push(url.to_string());
        if let Some(status) = self.failures.get(url) {
            return Err(RedditError::from_status(*status, "scripted failure".to_string()));
        }
        self.responses
            .get(url)
            .cloned()
            .ok_or_else(|| RedditError::NotFound(url.to_string()))
    }

    fn api_base_url(&self) -> &str {
        Self::BASE
    }
}
