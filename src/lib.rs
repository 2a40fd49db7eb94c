//! Storefront Server - e-commerce catalog, checkout and order backend
//!
//! # Architecture overview
//!
//! - **Checkout engine** (`checkout`): the order-creation transaction
//!   with atomic price/stock re-validation, total computation, inventory
//!   decrement and order persistence
//! - **Database** (`db`): embedded SQLite store (catalog + orders)
//! - **Authentication** (`auth`): JWT bearer tokens
//! - **HTTP API** (`api`): RESTful storefront and admin endpoints
//!
//! # Module structure
//!
//! ```text
//! src/
//! ├── core/          # configuration, state, server
//! ├── auth/          # JWT service and extractor
//! ├── checkout/      # order transaction engine (the core)
//! ├── api/           # HTTP routes and handlers
//! ├── db/            # models and repositories
//! └── utils/         # errors, logging, validation
//! ```

pub mod api;
pub mod auth;
pub mod checkout;
pub mod core;
pub mod db;
pub mod utils;

// Re-export common types
pub use auth::{CurrentUser, JwtService};
pub use checkout::{CheckoutError, CheckoutPolicy, OrderRequest, OrderSnapshot};
pub use core::{Config, Server, ServerState};
pub use utils::{AppError, AppResult};

// Re-export logger functions
pub use utils::logger::init_logger_with_file;
