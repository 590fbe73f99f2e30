//! LiftLog API server library.
//!
//! Exposes the building blocks (config, state, error handling, the
//! purchase-token extractor, request metrics, routes) so integration tests and the binary
//! entrypoint share them.

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod planner;
pub mod router;
pub mod routes;
pub mod state;
