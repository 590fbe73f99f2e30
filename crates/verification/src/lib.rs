//! Purchase-token verification against the platforms LiftLog sells through.
//!
//! Each platform has a [`VerificationStrategy`](strategy::VerificationStrategy)
//! implementation. [`PurchaseVerifier`](facade::PurchaseVerifier) owns one
//! strategy per platform and dispatches to it.
//!
//! Verification never fails with an error: every problem, from a malformed
//! token to a remote outage, becomes an invalid
//! [`VerificationResult`](liftlog_core::verification::VerificationResult).

pub mod apple;
pub mod config;
pub mod error;
pub mod facade;
pub mod google;
pub mod revenuecat;
pub mod strategy;
pub mod web;

pub use facade::PurchaseVerifier;
