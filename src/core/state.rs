//! Shared server state

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::auth::JwtService;
use crate::checkout::CheckoutPolicy;
use crate::core::Config;
use crate::db::DbService;
use crate::utils::AppError;

/// Server state: shared references held by every handler
///
/// Cloning is cheap: the pool is internally reference-counted and the
/// remaining fields sit behind `Arc`.
#[derive(Clone)]
pub struct ServerState {
    pub config: Arc<Config>,
    pub db: SqlitePool,
    pub jwt_service: Arc<JwtService>,
}

impl ServerState {
    /// Open the database, run migrations and build the shared state
    pub async fn initialize(config: &Config) -> Result<Self, AppError> {
        let db_service = DbService::new(&config.database_path).await?;

        Ok(Self {
            config: Arc::new(config.clone()),
            db: db_service.pool,
            jwt_service: Arc::new(JwtService::with_config(config.jwt.clone())),
        })
    }

    pub fn checkout_policy(&self) -> &CheckoutPolicy {
        &self.config.checkout
    }
}
