/// Domain errors surfaced to callers.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

/// Failure of the consumption store backing the rate limiter.
///
/// Unlike verification failures these are never folded into a decision:
/// the caller must fail the gated request.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A query against the store failed.
    #[error("Consumption store query failed: {0}")]
    Query(String),

    /// The store could not be reached (pool exhausted, connection refused).
    #[error("Consumption store unavailable: {0}")]
    Unavailable(String),
}
