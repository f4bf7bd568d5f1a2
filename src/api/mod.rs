//! HTTP API layer for Ensemble Shield.
//!
//! Provides the guard endpoints, the review queue and a health check.

pub mod handlers;
mod routes;
mod types;

pub use routes::build_router;
