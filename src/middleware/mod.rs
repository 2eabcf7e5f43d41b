//! Middleware for observability and file-server metrics.
//!
//! This module provides:
//! - Request logging with latency tracking
//! - A hit counter for the static file server

pub mod hits;
pub mod logging;

pub use hits::count_hits;
pub use logging::request_logging_simple;
