//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods
//! that accept a Postgres executor (pool, connection, or transaction) as
//! the first argument.

pub mod rate_limit_repo;

pub use rate_limit_repo::RateLimitRepo;
