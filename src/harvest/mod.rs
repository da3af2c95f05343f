//! Data collection on top of the fetch layer
//!
//! `search` pages through subreddit search results, `comments` expands full
//! comment trees, and [`collect_posts`] / [`collect_comments`] run both
//! over a set of subreddits and query terms.

pub mod comments;
pub mod search;

#[cfg(test)]
pub(crate) mod testing;

use crate::api::endpoints::SortBy;
use crate::core::fetcher::{Fetcher, RedditError};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{info, warn};

pub use comments::get_comments;
pub use search::{DEFAULT_NUM_RESULTS, search_posts};

/// What to collect in one harvest run
#[derive(Debug, Clone)]
pub struct HarvestPlan {
    pub subreddits: Vec<String>,
    pub queries: Vec<String>,
    pub num_results: usize,
    pub sort: SortBy,
}

/// Distinct posts found by the search phase
#[derive(Debug, Default)]
pub struct PostHarvest {
    pub posts: Vec<Value>,
    /// Posts matched by more than one query; each is kept once
    pub duplicate_posts: usize,
}

/// Comments collected for a set of posts
#[derive(Debug, Default)]
pub struct CommentHarvest {
    pub comments: Vec<Value>,
    /// Posts whose comments could not be retrieved
    pub skipped_posts: Vec<String>,
}

/// Search every (subreddit, query) pair and merge the results by post id
pub async fn collect_posts(fetcher: &dyn Fetcher, plan: &HarvestPlan) -> Result<PostHarvest, RedditError> {
    let mut result = PostHarvest::default();
    let mut post_ids: HashSet<String> = HashSet::new();

    for subreddit in &plan.subreddits {
        for query in &plan.queries {
            let posts = search_posts(fetcher, subreddit, query, plan.num_results, plan.sort).await?;
            for post in posts {
                let Some(id) = post.get("id").and_then(Value::as_str) else {
                    continue;
                };
                if post_ids.insert(id.to_string()) {
                    result.posts.push(post);
                } else {
                    result.duplicate_posts += 1;
                }
            }
        }
    }

    info!(
        posts = result.posts.len(),
        duplicates = result.duplicate_posts,
        "Search phase finished"
    );
    Ok(result)
}

/// Fetch the comments of each post
///
/// A post that disappears between search and comment retrieval is skipped
/// with a warning; any other error aborts the phase.
pub async fn collect_comments(fetcher: &dyn Fetcher, posts: &[Value]) -> Result<CommentHarvest, RedditError> {
    let mut result = CommentHarvest::default();
    let mut comment_ids: HashSet<String> = HashSet::new();
    let total = posts.len();

    for (index, post) in posts.iter().enumerate() {
        let Some(post_id) = post.get("id").and_then(Value::as_str) else {
            continue;
        };
        info!("Fetching comments for post {} ({}/{})", post_id, index + 1, total);

        match get_comments(fetcher, post_id, None).await {
            Ok(comments) => {
                for comment in comments {
                    let fresh = comment
                        .get("id")
                        .and_then(Value::as_str)
                        .is_some_and(|id| comment_ids.insert(id.to_string()));
                    if fresh {
                        result.comments.push(comment);
                    }
                }
            }
            Err(RedditError::NotFound(detail)) => {
                warn!(post_id, "Post no longer available, skipping comments: {}", detail);
                result.skipped_posts.push(post_id.to_string());
            }
            Err(e) => return Err(e),
        }
    }

    info!(
        comments = result.comments.len(),
        skipped = result.skipped_posts.len(),
        "Comment phase finished"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::endpoints::{comments_url, search_url};
    use crate::harvest::testing::ScriptedFetcher;
    use serde_json::json;

    const BASE: &str = ScriptedFetcher::BASE;

    fn search_page(ids: &[&str]) -> Value {
        let children: Vec<Value> = ids
            .iter()
            .map(|id| json!({"kind": "t3", "data": {"id": id}}))
            .collect();
        json!({"data": {"after": null, "children": children}})
    }

    fn comment_tree(post: &str, comment_ids: &[&str]) -> Value {
        let children: Vec<Value> = comment_ids
            .iter()
            .map(|id| json!({"kind": "t1", "data": {"id": id, "parent_id": format!("t3_{}", post), "replies": ""}}))
            .collect();
        json!([
            {"data": {"children": [{"kind": "t3", "data": {"id": post}}]}},
            {"data": {"children": children}}
        ])
    }

    #[tokio::test]
    async fn test_harvest_merges_queries_and_collects_comments() {
        let fetcher = ScriptedFetcher::new()
            .with(search_url(BASE, "rust", "tokio", SortBy::New, None).unwrap(), search_page(&["p1", "p2"]))
            .with(search_url(BASE, "rust", "async", SortBy::New, None).unwrap(), search_page(&["p2", "p3"]))
            .with(comments_url(BASE, "p1", None).unwrap(), comment_tree("p1", &["c1"]))
            .with(comments_url(BASE, "p2", None).unwrap(), comment_tree("p2", &["c2", "c3"]));

        let plan = HarvestPlan {
            subreddits: vec!["rust".to_string()],
            queries: vec!["tokio".to_string(), "async".to_string()],
            num_results: 10,
            sort: SortBy::New,
        };
        let found = collect_posts(&fetcher, &plan).await.unwrap();

        let post_ids: Vec<&str> = found.posts.iter().map(|p| p["id"].as_str().unwrap()).collect();
        assert_eq!(post_ids, vec!["p1", "p2", "p3"]);
        assert_eq!(found.posts[1]["query"], "tokio");
        assert_eq!(found.duplicate_posts, 1);

        let collected = collect_comments(&fetcher, &found.posts).await.unwrap();
        assert_eq!(collected.comments.len(), 3);
        // p3 has no scripted comment tree and is reported as skipped.
        assert_eq!(collected.skipped_posts, vec!["p3".to_string()]);
    }

    #[tokio::test]
    async fn test_comment_phase_aborts_on_server_error() {
        let fetcher = ScriptedFetcher::new()
            .with(comments_url(BASE, "p1", None).unwrap(), comment_tree("p1", &["c1"]))
            .failing(comments_url(BASE, "p2", None).unwrap(), 500);

        let posts = vec![json!({"id": "p1"}), json!({"id": "p2"})];
        let err = collect_comments(&fetcher, &posts).await.unwrap_err();
        assert!(matches!(err, RedditError::Api { status: 500, .. }));
        assert_eq!(fetcher.calls(), 2);
    }
}
