//! Checkout error taxonomy
//!
//! A closed set of failure kinds returned by the engine. The HTTP boundary
//! maps these to transport codes; the engine itself never shapes responses.

use thiserror::Error;

/// Why a checkout was rejected.
///
/// Every variant except `Internal` and `DeadlineExceeded` is a clean
/// validation outcome: the transaction was rolled back, no stock moved,
/// and retrying with a corrected cart is safe.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("authentication required")]
    Unauthenticated,

    /// Malformed cart or customer payload
    #[error("invalid request: {0}")]
    InvalidArgument(String),

    /// Referenced product does not exist (or is no longer sold)
    #[error("product not found: {0}")]
    ProductNotFound(String),

    /// Valid product, not enough stock
    #[error("insufficient stock for {name}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: String,
        name: String,
        requested: i64,
        available: i64,
    },

    #[error("checkout deadline exceeded")]
    DeadlineExceeded,

    /// Store failure or retry budget exhausted; details are logged
    /// server-side and never reach the caller
    #[error("internal checkout error: {0}")]
    Internal(String),
}

impl CheckoutError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Stable kind name, used in logs and tests
    pub fn kind(&self) -> &'static str {
        match self {
            CheckoutError::Unauthenticated => "unauthenticated",
            CheckoutError::InvalidArgument(_) => "invalid_argument",
            CheckoutError::ProductNotFound(_) => "not_found",
            CheckoutError::InsufficientStock { .. } => "failed_precondition",
            CheckoutError::DeadlineExceeded => "deadline_exceeded",
            CheckoutError::Internal(_) => "internal",
        }
    }
}
