//! HTTP API and command-line front ends for Moment Catcher.
//!
//! This crate provides:
//! - Multipart upload endpoint that analyzes a video and renders its trailer
//! - Download endpoint for rendered trailers
//! - Health and Prometheus metrics endpoints
//! - Shared tracing setup and per-run structured logging

pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use logging::{init_tracing, RunLogger};
pub use routes::create_router;
pub use state::AppState;
