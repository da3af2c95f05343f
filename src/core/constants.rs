//! Constants for the Reddit API surface
//!
//! This module defines endpoint URLs, request limits, thing kinds and
//! rate-limit header names used throughout the application.

/// User agent sent with every request
pub const USER_AGENT: &str = "CNU Social Media Research Client";

/// Endpoint URL constants
pub mod url {
    /// OAuth token endpoint (application-only flow)
    pub const ACCESS_TOKEN: &str = "https://www.reddit.com/api/v1/access_token";

    /// Base URL for authenticated API requests
    pub const OAUTH_BASE: &str = "https://oauth.reddit.com";

    /// Base URL prepended to relative permalinks
    pub const WEB_BASE: &str = "https://www.reddit.com";
}

/// Request size limits
pub mod limit {
    /// Maximum ids per /api/morechildren request
    pub const MORECHILDREN_BATCH_SIZE: usize = 100;

    /// Posts per search page
    pub const SEARCH_PAGE: u32 = 100;

    /// Comments per comment-tree request
    pub const COMMENT_PAGE: u32 = 500;

    /// Reply depth requested for whole-post comment trees
    pub const COMMENT_DEPTH: u32 = 10;

    /// Longest rate-limit window the API accounts for, in seconds
    pub const MAX_WINDOW_SECS: u64 = 600;

    /// Most requests the API allows per window
    pub const MAX_REQUESTS_PER_WINDOW: usize = 1000;
}

/// Thing kind constants
pub mod kind {
    /// Comment
    pub const COMMENT: &str = "t1";

    /// Placeholder for comments not inlined in a response
    pub const MORE: &str = "more";

    /// Fullname prefix for comments
    pub const COMMENT_PREFIX: &str = "t1_";

    /// Fullname prefix for links
    pub const LINK_PREFIX: &str = "t3_";
}

/// Rate-limit response header names
pub mod header {
    pub const RATELIMIT_USED: &str = "x-ratelimit-used";
    pub const RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
    pub const RATELIMIT_RESET: &str = "x-ratelimit-reset";
}
