//! Database models

pub mod order;
pub mod product;

pub use order::{Address, CustomerInfo, OrderItemRecord, OrderRecord, OrderStatus};
pub use product::{Product, ProductCreate, ProductUpdate};
