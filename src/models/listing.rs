//! Listing and thing structures
//!
//! Reddit wraps every collection in a `Listing` whose children are
//! `{ "kind": ..., "data": {...} }` things. Only the envelope is typed; the
//! `data` of a post or comment is kept as raw JSON.

use crate::core::constants::kind;
use serde::Deserialize;
use serde_json::Value;

/// A single `{ kind, data }` entry
#[derive(Debug, Clone, Deserialize)]
pub struct Thing {
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

impl Thing {
    pub fn is_comment(&self) -> bool {
        self.kind == kind::COMMENT
    }

    pub fn is_more(&self) -> bool {
        self.kind == kind::MORE
    }
}

/// Paginated collection of things
#[derive(Debug, Clone, Deserialize)]
pub struct Listing {
    pub data: ListingData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListingData {
    /// Cursor for the next page; null on the last page
    #[serde(default)]
    pub after: Option<String>,
    pub children: Vec<Thing>,
}

/// Payload of a `more` thing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MoreStub {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default)]
    pub parent_id: String,
}

impl MoreStub {
    /// A "continue this thread" link: the subtree under `parent_id` was cut
    /// off at the depth limit and has to be fetched on its own.
    pub fn is_continue_thread(&self) -> bool {
        self.count == 0 && self.children.is_empty()
    }

    /// Parent comment id without its `t1_` prefix, when the parent is a
    /// comment
    pub fn parent_comment_id(&self) -> Option<&str> {
        self.parent_id.strip_prefix(kind::COMMENT_PREFIX)
    }
}

/// Response body of `/api/morechildren?api_type=json`
#[derive(Debug, Clone, Deserialize)]
pub struct MoreChildrenResponse {
    pub json: MoreChildrenJson,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MoreChildrenJson {
    #[serde(default)]
    pub errors: Vec<Value>,
    #[serde(default)]
    pub data: Option<MoreChildrenData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MoreChildrenData {
    #[serde(default)]
    pub things: Vec<Thing>,
}
