//! API endpoint URL builders
//!
//! This module builds the URLs for subreddit search, comment trees and
//! `/api/morechildren` expansion relative to a configurable base URL.

use crate::core::constants::{kind, limit};
use crate::core::fetcher::RedditError;
use clap::ValueEnum;
use reqwest::Url;

/// Search result ordering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SortBy {
    Relevance,
    Hot,
    Top,
    #[default]
    New,
    Comments,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Relevance => "relevance",
            SortBy::Hot => "hot",
            SortBy::Top => "top",
            SortBy::New => "new",
            SortBy::Comments => "comments",
        }
    }
}

/// Append `segments` to the base path, percent-encoding each one so an id
/// can never add path levels, a query or a fragment
fn endpoint(base: &str, segments: &[&str]) -> Result<Url, RedditError> {
    let mut url = Url::parse(base).map_err(|e| RedditError::InvalidUrl(format!("{}: {}", base, e)))?;
    url.path_segments_mut()
        .map_err(|_| RedditError::InvalidUrl(format!("{}: cannot be a base URL", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// `GET /r/{subreddit}/search`, restricted to the subreddit
pub fn search_url(
    base: &str,
    subreddit: &str,
    query: &str,
    sort: SortBy,
    after: Option<&str>,
) -> Result<String, RedditError> {
    let mut url = endpoint(base, &["r", subreddit, "search"])?;
    {
        let mut pairs = url.query_pairs_mut();
        pairs
            .append_pair("q", query)
            .append_pair("sort", sort.as_str())
            .append_pair("limit", &limit::SEARCH_PAGE.to_string())
            .append_pair("restrict_sr", "true");
        if let Some(after) = after {
            pairs.append_pair("after", after);
        }
    }
    Ok(url.into())
}

/// `GET /comments/{post}` for a whole post, or
/// `GET /comments/{post}/comment/{comment}` for one comment's subtree
pub fn comments_url(
    base: &str,
    post_id: &str,
    comment_id: Option<&str>,
) -> Result<String, RedditError> {
    let mut url = match comment_id {
        Some(comment_id) => endpoint(base, &["comments", post_id, "comment", comment_id])?,
        None => endpoint(base, &["comments", post_id])?,
    };
    {
        let mut pairs = url.query_pairs_mut();
        pairs
            .append_pair("limit", &limit::COMMENT_PAGE.to_string())
            .append_pair("sort", "old");
        if comment_id.is_none() {
            pairs.append_pair("depth", &limit::COMMENT_DEPTH.to_string());
        }
    }
    Ok(url.into())
}

/// `GET /api/morechildren` for a batch of comment ids
pub fn more_children_url(
    base: &str,
    post_id: &str,
    comment_ids: &[String],
) -> Result<String, RedditError> {
    let mut url = endpoint(base, &["api", "morechildren"])?;
    url.query_pairs_mut()
        .append_pair("link_id", &format!("{}{}", kind::LINK_PREFIX, post_id))
        .append_pair("limit_children", "false")
        .append_pair("sort", "old")
        .append_pair("api_type", "json")
        .append_pair("children", &comment_ids.join(","));
    Ok(url.into())
}
