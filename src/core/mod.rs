//! Core application modules
//!
//! This module contains configuration, constants, logging, authentication,
//! rate limiting and the HTTP client.

pub mod auth;
pub mod client;
pub mod config;
pub mod constants;
pub mod fetcher;
pub mod logging;
pub mod rate_limiter;
