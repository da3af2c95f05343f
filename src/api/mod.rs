//! Reddit API surface used by the harvester

pub mod endpoints;
