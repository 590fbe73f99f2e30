//! Domain logic for the LiftLog purchase gate.
//!
//! This crate has zero internal dependencies so it can be shared by the
//! database layer, the verification strategies, and the HTTP server.

pub mod authorization;
pub mod clock;
pub mod error;
pub mod hashing;
pub mod memory_store;
pub mod platform;
pub mod rate_limit;
pub mod types;
pub mod verification;
pub mod web_token;
