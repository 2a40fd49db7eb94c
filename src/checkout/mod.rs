//! Checkout Module
//!
//! The order-creation transaction: re-validate prices and stock against
//! the catalog, reject invalid or under-stocked carts, compute the total,
//! decrement inventory and persist the order, all atomically.
//!
//! This is the one path allowed to mutate `product.stock` downwards.
//! Everything else (catalog admin, order listing) lives in the repository
//! layer and never touches stock outside a validating transaction.

pub mod engine;
pub mod error;
pub mod types;

pub use engine::{CheckoutPolicy, create_order};
pub use error::CheckoutError;
pub use types::{CartItem, LineSnapshot, OrderRequest, OrderSnapshot};
