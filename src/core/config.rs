//! Application configuration management
//!
//! This module loads and validates the TOML configuration and the
//! `keys.json` credential file. All values are validated at startup so a
//! misconfigured run fails before any request is sent.

use crate::core::constants::{USER_AGENT, limit, url};
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "sm-research.toml";

/// Credential file looked up in the working directory by default
pub const DEFAULT_KEYS_FILE: &str = "keys.json";

/// Default request timeout in seconds
const DEFAULT_REQUEST_TIMEOUT: u64 = 30;

/// Default interval between rate-limit checks while the window is full
const DEFAULT_POLL_INTERVAL: u64 = 10;

/// Default fixed UTC offset for rendered timestamps (Pacific Standard Time)
const DEFAULT_UTC_OFFSET_HOURS: i32 = -8;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedditSection {
    pub user_agent: String,
    pub auth_url: String,
    pub api_base_url: String,
    pub web_base_url: String,
    pub keys_path: PathBuf,
}

impl Default for RedditSection {
    fn default() -> Self {
        Self {
            user_agent: USER_AGENT.to_string(),
            auth_url: url::ACCESS_TOKEN.to_string(),
            api_base_url: url::OAUTH_BASE.to_string(),
            web_base_url: url::WEB_BASE.to_string(),
            keys_path: PathBuf::from(DEFAULT_KEYS_FILE),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitSection {
    pub window_secs: u64,
    pub max_requests: usize,
    pub poll_interval_secs: u64,
}

impl Default for RateLimitSection {
    fn default() -> Self {
        Self {
            window_secs: limit::MAX_WINDOW_SECS,
            max_requests: limit::MAX_REQUESTS_PER_WINDOW,
            poll_interval_secs: DEFAULT_POLL_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RequestSection {
    pub timeout_secs: u64,
}

impl Default for RequestSection {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    pub utc_offset_hours: i32,
    pub directory: PathBuf,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            utc_offset_hours: DEFAULT_UTC_OFFSET_HOURS,
            directory: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub reddit: RedditSection,
    pub rate_limit: RateLimitSection,
    pub request: RequestSection,
    pub output: OutputSection,
    pub logging: LoggingSection,
}

/// Validated application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// User agent sent with every request
    pub user_agent: String,

    /// OAuth token endpoint
    pub auth_url: String,

    /// Base URL for API requests (no trailing slash)
    pub api_base_url: String,

    /// Base URL prepended to permalinks in exports
    pub web_base_url: String,

    /// Location of the credential file
    pub keys_path: PathBuf,

    /// Sliding rate-limit window
    pub window: Duration,

    /// Requests allowed per window
    pub max_requests: usize,

    /// Sleep step while waiting for the window to drain
    pub poll_interval: Duration,

    /// Request timeout in seconds
    pub request_timeout: u64,

    /// Fixed offset for rendered timestamps, in hours east of UTC
    pub utc_offset_hours: i32,

    /// Directory receiving harvest output
    pub output_dir: PathBuf,

    /// Logging level
    pub log_level: String,

    /// Values adjusted during validation, reported once logging is up
    pub notices: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default()).expect("Default configuration is within bounds")
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed, or if a value is
    /// out of range.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig =
            toml::from_str(content).context("Failed to parse TOML configuration")?;
        Self::from_toml(config)
    }

    /// Resolve the configuration to use for this run
    ///
    /// An explicitly named file must exist. Without one, `sm-research.toml`
    /// in the working directory is used when present, otherwise defaults.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match explicit_path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(DEFAULT_CONFIG_FILE),
            None => Ok(Self::default()),
        }
    }

    fn from_toml(config: TomlConfig) -> Result<Self> {
        let mut notices = Vec::new();

        let mut window_secs = config.rate_limit.window_secs;
        if window_secs == 0 {
            bail!("rate_limit.window_secs must be greater than zero");
        }
        if window_secs > limit::MAX_WINDOW_SECS {
            notices.push(format!(
                "rate_limit.window_secs needs to be <= {}, flooring to {}",
                limit::MAX_WINDOW_SECS,
                limit::MAX_WINDOW_SECS
            ));
            window_secs = limit::MAX_WINDOW_SECS;
        }

        let mut max_requests = config.rate_limit.max_requests;
        if max_requests == 0 {
            bail!("rate_limit.max_requests must be greater than zero");
        }
        if max_requests > limit::MAX_REQUESTS_PER_WINDOW {
            notices.push(format!(
                "rate_limit.max_requests needs to be <= {}, flooring to {}",
                limit::MAX_REQUESTS_PER_WINDOW,
                limit::MAX_REQUESTS_PER_WINDOW
            ));
            max_requests = limit::MAX_REQUESTS_PER_WINDOW;
        }

        if config.rate_limit.poll_interval_secs == 0 {
            bail!("rate_limit.poll_interval_secs must be greater than zero");
        }
        if config.request.timeout_secs == 0 {
            bail!("request.timeout_secs must be greater than zero");
        }
        if !(-23..=23).contains(&config.output.utc_offset_hours) {
            bail!(
                "output.utc_offset_hours must be between -23 and 23, got {}",
                config.output.utc_offset_hours
            );
        }

        Ok(Config {
            user_agent: config.reddit.user_agent,
            auth_url: config.reddit.auth_url,
            api_base_url: config.reddit.api_base_url.trim_end_matches('/').to_string(),
            web_base_url: config.reddit.web_base_url.trim_end_matches('/').to_string(),
            keys_path: config.reddit.keys_path,
            window: Duration::from_secs(window_secs),
            max_requests,
            poll_interval: Duration::from_secs(config.rate_limit.poll_interval_secs),
            request_timeout: config.request.timeout_secs,
            utc_offset_hours: config.output.utc_offset_hours,
            output_dir: config.output.directory,
            log_level: config.logging.level,
            notices,
        })
    }
}

/// Layout of `keys.json`; unknown fields are ignored
#[derive(Deserialize)]
struct KeysFile {
    #[serde(rename = "CLIENT_ID")]
    client_id: String,
    #[serde(rename = "SECRET_ID")]
    secret_id: String,
}

/// Application credentials for the client-credentials OAuth flow
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub secret_id: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("secret_id", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Read `CLIENT_ID` and `SECRET_ID` from a keys file
    pub fn from_keys_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            let cwd = std::env::current_dir()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| "<unknown>".to_string());
            bail!(
                "File `{}` was not found (working directory {}). \
                 Place the keys file there or point reddit.keys_path / --keys at it.",
                path.display(),
                cwd
            );
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read keys file {}", path.display()))?;
        let keys: KeysFile = serde_json::from_str(&content).with_context(|| {
            format!(
                "Keys file {} must be a JSON object with string fields CLIENT_ID and SECRET_ID",
                path.display()
            )
        })?;

        Ok(Self {
            client_id: keys.client_id,
            secret_id: keys.secret_id,
        })
    }

    /// Resolve credentials, letting `REDDIT_CLIENT_ID` / `REDDIT_SECRET_ID`
    /// override the keys file
    pub fn resolve<P: AsRef<Path>>(keys_path: P) -> Result<Self> {
        Self::resolve_with(
            keys_path,
            std::env::var("REDDIT_CLIENT_ID").ok(),
            std::env::var("REDDIT_SECRET_ID").ok(),
        )
    }

    fn resolve_with<P: AsRef<Path>>(
        keys_path: P,
        client_id: Option<String>,
        secret_id: Option<String>,
    ) -> Result<Self> {
        match (client_id, secret_id) {
            (Some(client_id), Some(secret_id)) => Ok(Self {
                client_id,
                secret_id,
            }),
            (client_id, secret_id) => {
                let from_file = Self::from_keys_file(keys_path)?;
                Ok(Self {
                    client_id: client_id.unwrap_or(from_file.client_id),
                    secret_id: secret_id.unwrap_or(from_file.secret_id),
                })
            }
        }
    }
}
