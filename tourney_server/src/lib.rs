//! HTTP server around the tourney bracket engine.
//!
//! - [`api`]: axum router, handlers and middleware
//! - [`config`]: environment-driven server configuration
//! - [`identity`]: bearer token verification
//! - [`logging`]: tracing subscriber and structured log helpers
//! - [`metrics`]: Prometheus counters

pub mod api;
pub mod config;
pub mod identity;
pub mod logging;
pub mod metrics;
