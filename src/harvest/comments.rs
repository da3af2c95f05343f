//! Full comment-tree retrieval
//!
//! A single `/comments/{post}` response only inlines part of a large
//! thread. The rest shows up as `more` stubs, which come in two flavours:
//!
//! - stubs listing comment ids, expanded through `/api/morechildren` in
//!   batches of 100;
//! - "continue this thread" stubs (`count == 0`, no ids), which mark a
//!   subtree cut off at the depth limit and are fetched through
//!   `/comments/{post}/comment/{parent}`.
//!
//! Expansion repeats until no stub is left unexplored. Every comment is
//! returned once, in the order it was first reached.

use crate::api::endpoints::{comments_url, more_children_url};
use crate::core::constants::limit::MORECHILDREN_BATCH_SIZE;
use crate::core::fetcher::{Fetcher, RedditError};
use crate::models::listing::{Listing, MoreChildrenResponse, MoreStub, Thing};
use serde_json::Value;
use std::collections::{HashSet, VecDeque};
use tracing::{debug, info, warn};

#[derive(Default)]
struct CommentCollector {
    comments: Vec<Value>,
    seen: HashSet<String>,
    pending_more: VecDeque<String>,
    requested_more: HashSet<String>,
    pending_threads: VecDeque<String>,
    requested_threads: HashSet<String>,
}

impl CommentCollector {
    /// Depth-first, pre-order walk over a run of sibling things
    fn walk(&mut self, things: Vec<Thing>) {
        let mut stack: Vec<Thing> = things.into_iter().rev().collect();

        while let Some(thing) = stack.pop() {
            if thing.is_comment() {
                let Value::Object(mut data) = thing.data else {
                    continue;
                };
                let replies = data
                    .insert("replies".to_string(), Value::String(String::new()))
                    .and_then(|r| serde_json::from_value::<Listing>(r).ok());

                if let Some(id) = data.get("id").and_then(Value::as_str).map(str::to_string) {
                    if self.seen.insert(id) {
                        self.comments.push(Value::Object(data));
                    }
                }

                if let Some(replies) = replies {
                    stack.extend(replies.data.children.into_iter().rev());
                }
            } else if thing.is_more() {
                let stub: MoreStub = serde_json::from_value(thing.data).unwrap_or_default();
                self.queue_stub(stub);
            }
        }
    }

    fn queue_stub(&mut self, stub: MoreStub) {
        if stub.is_continue_thread() {
            match stub.parent_comment_id() {
                Some(parent) if !self.requested_threads.contains(parent) => {
                    debug!(parent, "Queued continue-thread fetch");
                    self.pending_threads.push_back(parent.to_string());
                }
                Some(_) => {}
                None => debug!(parent_id = %stub.parent_id, "Ignoring empty more stub"),
            }
            return;
        }

        for id in stub.children {
            if !self.requested_more.contains(&id) && !self.seen.contains(&id) {
                self.pending_more.push_back(id);
            }
        }
    }

    /// Next batch of ids for `/api/morechildren`, never repeating an id
    fn next_more_batch(&mut self) -> Vec<String> {
        let mut batch = Vec::with_capacity(MORECHILDREN_BATCH_SIZE);
        while batch.len() < MORECHILDREN_BATCH_SIZE {
            let Some(id) = self.pending_more.pop_front() else {
                break;
            };
            if self.requested_more.insert(id.clone()) {
                batch.push(id);
            }
        }
        batch
    }

    fn next_thread(&mut self) -> Option<String> {
        while let Some(id) = self.pending_threads.pop_front() {
            if self.requested_threads.insert(id.clone()) {
                return Some(id);
            }
        }
        None
    }
}

/// Fetch one comment tree and return the comment listing's children
async fn fetch_tree(
    fetcher: &dyn Fetcher,
    post_id: &str,
    comment_id: Option<&str>,
) -> Result<Vec<Thing>, RedditError> {
    let url = comments_url(fetcher.api_base_url(), post_id, comment_id)?;
    let response = fetcher.fetch_json(&url).await?;

    let Value::Array(mut parts) = response else {
        return Err(RedditError::UnexpectedShape(
            "comment response is not an array".to_string(),
        ));
    };
    if parts.len() != 2 {
        return Err(RedditError::UnexpectedShape(format!(
            "expected comment response to have 2 elements but got {}",
            parts.len()
        )));
    }

    let comments = parts.pop().unwrap_or_default();
    let listing: Listing = serde_json::from_value(comments)
        .map_err(|e| RedditError::UnexpectedShape(format!("comment listing: {}", e)))?;
    Ok(listing.data.children)
}

async fn fetch_more_children(
    fetcher: &dyn Fetcher,
    post_id: &str,
    batch: &[String],
) -> Result<Vec<Thing>, RedditError> {
    let url = more_children_url(fetcher.api_base_url(), post_id, batch)?;
    let response = fetcher.fetch_json(&url).await?;
    let parsed: MoreChildrenResponse = serde_json::from_value(response)
        .map_err(|e| RedditError::UnexpectedShape(format!("morechildren response: {}", e)))?;

    if !parsed.json.errors.is_empty() {
        warn!(errors = ?parsed.json.errors, "morechildren reported errors");
    }
    Ok(parsed.json.data.map(|d| d.things).unwrap_or_default())
}

/// Retrieve every comment under a post, or under one comment of a post
///
/// # Errors
///
/// Propagates fetch errors. A comment endpoint response that is not a
/// two-element `[post, comments]` array yields
/// `RedditError::UnexpectedShape`.
pub async fn get_comments(
    fetcher: &dyn Fetcher,
    post_id: &str,
    comment_id: Option<&str>,
) -> Result<Vec<Value>, RedditError> {
    let mut collector = CommentCollector::default();
    if let Some(comment_id) = comment_id {
        collector.requested_threads.insert(comment_id.to_string());
    }

    let root = fetch_tree(fetcher, post_id, comment_id).await?;
    collector.walk(root);

    loop {
        let batch = collector.next_more_batch();
        if !batch.is_empty() {
            debug!(post_id, ids = batch.len(), "Expanding more children");
            let things = fetch_more_children(fetcher, post_id, &batch).await?;
            collector.walk(things);
            continue;
        }

        match collector.next_thread() {
            Some(thread) => {
                debug!(post_id, comment_id = %thread, "Following continued thread");
                let things = fetch_tree(fetcher, post_id, Some(&thread)).await?;
                collector.walk(things);
            }
            None => break,
        }
    }

    info!(
        post_id,
        comment_id = comment_id.unwrap_or("-"),
        comments = collector.comments.len(),
        "Comments query finished"
    );
    Ok(collector.comments)
}
