//! Subreddit search with cursor pagination

use crate::api::endpoints::{SortBy, search_url};
use crate::core::fetcher::{Fetcher, RedditError};
use crate::models::listing::Listing;
use serde_json::Value;
use std::collections::HashSet;
use tracing::info;

/// Default number of posts requested per search
pub const DEFAULT_NUM_RESULTS: usize = 1000;

/// Search `subreddit` for `query`, following `after` cursors
///
/// Paging stops once `num_results` distinct posts are in hand, the listing
/// has no further page, or a page brings nothing new. Every returned post
/// is the raw `data` object of its listing entry with a `query` field added.
///
/// # Errors
///
/// Propagates fetch errors; a page that is not a listing yields
/// `RedditError::UnexpectedShape`.
pub async fn search_posts(
    fetcher: &dyn Fetcher,
    subreddit: &str,
    query: &str,
    num_results: usize,
    sort: SortBy,
) -> Result<Vec<Value>, RedditError> {
    let mut posts = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut after: Option<String> = None;

    while seen.len() < num_results {
        let url = search_url(
            fetcher.api_base_url(),
            subreddit,
            query,
            sort,
            after.as_deref(),
        )?;
        let page = fetcher.fetch_json(&url).await?;
        let listing: Listing = serde_json::from_value(page)
            .map_err(|e| RedditError::UnexpectedShape(format!("search listing: {}", e)))?;

        let mut added = 0usize;
        for thing in listing.data.children {
            let Value::Object(mut data) = thing.data else {
                continue;
            };
            let Some(id) = data.get("id").and_then(Value::as_str).map(str::to_string) else {
                continue;
            };
            if !seen.insert(id) {
                continue;
            }
            data.insert("query".to_string(), Value::String(query.to_string()));
            posts.push(Value::Object(data));
            added += 1;
        }

        // The API caps how far a listing can be paged, so a search may end
        // well short of `num_results`.
        match listing.data.after {
            Some(next) if added > 0 => after = Some(next),
            _ => break,
        }
    }

    posts.truncate(num_results);
    info!(
        subreddit,
        query,
        posts = posts.len(),
        "Submissions query finished"
    );
    Ok(posts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harvest::testing::ScriptedFetcher;
    use serde_json::json;

    fn page(ids: &[&str], after: Option<&str>) -> Value {
        let children: Vec<Value> = ids
            .iter()
            .map(|id| json!({"kind": "t3", "data": {"id": id, "title": format!("post {}", id)}}))
            .collect();
        json!({"kind": "Listing", "data": {"after": after, "children": children}})
    }

    fn url(after: Option<&str>) -> String {
        search_url(ScriptedFetcher::BASE, "rust", "async", SortBy::New, after).unwrap()
    }

    #[tokio::test]
    async fn test_follows_after_cursor_until_exhausted() {
        let fetcher = ScriptedFetcher::new()
            .with(url(None), page(&["a", "b"], Some("t3_b")))
            .with(url(Some("t3_b")), page(&["c"], None));

        let posts = search_posts(&fetcher, "rust", "async", 10, SortBy::New)
            .await
            .unwrap();
        let ids: Vec<&str> = posts.iter().map(|p| p["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(posts.iter().all(|p| p["query"] == "async"));
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_stops_at_num_results() {
        let fetcher = ScriptedFetcher::new()
            .with(url(None), page(&["a", "b", "c"], Some("t3_c")));

        let posts = search_posts(&fetcher, "rust", "async", 2, SortBy::New)
            .await
            .unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_page_without_new_posts_ends_search() {
        let fetcher = ScriptedFetcher::new()
            .with(url(None), page(&["a"], Some("t3_a")))
            .with(url(Some("t3_a")), page(&["a"], Some("t3_a")));

        let posts = search_posts(&fetcher, "rust", "async", 100, SortBy::New)
            .await
            .unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_zero_results_sends_nothing() {
        let fetcher = ScriptedFetcher::new();
        let posts = search_posts(&fetcher, "rust", "async", 0, SortBy::New)
            .await
            .unwrap();
        assert!(posts.is_empty());
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_malformed_listing() {
        let fetcher = ScriptedFetcher::new().with(url(None), json!({"error": 403}));
        let err = search_posts(&fetcher, "rust", "async", 10, SortBy::New)
            .await
            .unwrap_err();
        assert!(matches!(err, RedditError::UnexpectedShape(_)));
    }
}
