//! # filestore-api
//!
//! HTTP API layer for filestore built on Axum.
//!
//! Provides the `/ws` upgrade that attaches clients to the real-time hub,
//! health endpoints, CORS, and the request-log middleware that streams every
//! request to subscribers as a `log_entry` update.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
