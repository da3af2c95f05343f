//! API data models
//!
//! This module contains the response structures of the Reddit API that the
//! harvester reads. Thing payloads stay as raw JSON so they can be dumped
//! unchanged.

pub mod listing;
pub mod oauth;
