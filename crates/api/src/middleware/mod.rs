//! Request extractors that gate handlers.
//!
//! - [`purchase_token::PurchaseTokenAuth`] -- Requires a verified purchase token.

pub mod purchase_token;
