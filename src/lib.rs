//! Chirpy Backend Library
//!
//! Exposes the auth subsystem, persistence and HTTP router for the binary
//! and integration tests.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod middleware;
pub mod models;
