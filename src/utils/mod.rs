//! Utility module - shared helpers and types
//!
//! # Contents
//!
//! - [`AppError`] / [`AppResult`] - application error type and result alias
//! - [`AppResponse`] - error response envelope
//! - logging and validation helpers

pub mod error;
pub mod logger;
pub mod result;
pub mod time;
pub mod validation;

pub use error::{AppError, AppResponse};
pub use result::AppResult;
pub use time::now_millis;
