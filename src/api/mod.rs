//! HTTP API.
//!
//! Exposes triage, record lookup, import and publish as JSON endpoints
//! under `/api/`. `api_router()` returns a `Router` that can be mounted
//! on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod types;

pub use error::ApiError;
pub use router::api_router;
pub use types::ApiContext;
