//! Product API Handlers
//!
//! Catalog reads are public (the storefront lists products without a
//! session); writes require an admin caller. Stock is only ever edited
//! here as an explicit admin restock/correction; checkout decrements go
//! through the transaction engine.

use axum::{
    Json,
    extract::{Path, State},
};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::models::{Product, ProductCreate, ProductUpdate};
use crate::db::repository::{self, RepoError};
use crate::utils::validation::{
    MAX_NAME_LEN, MAX_URL_LEN, validate_required_text,
};
use crate::utils::{AppError, AppResult};

fn repo_error(err: RepoError) -> AppError {
    match err {
        RepoError::NotFound(msg) => AppError::not_found(msg),
        RepoError::Duplicate(msg) => AppError::Conflict(msg),
        RepoError::Validation(msg) => AppError::validation(msg),
        RepoError::Database(msg) => AppError::database(msg),
    }
}

fn validate_image_urls(urls: &Option<Vec<String>>) -> AppResult<()> {
    if let Some(urls) = urls {
        for url in urls {
            validate_required_text(url, "image url", MAX_URL_LEN)?;
        }
    }
    Ok(())
}

/// GET /api/products - list active products
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<Product>>> {
    let products = repository::product::find_all(&state.db)
        .await
        .map_err(repo_error)?;
    Ok(Json(products))
}

/// GET /api/products/{id} - single product
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<Product>> {
    let product = repository::product::find_by_id(&state.db, &id)
        .await
        .map_err(repo_error)?
        .ok_or_else(|| AppError::not_found(format!("Product {id}")))?;
    Ok(Json(product))
}

/// POST /api/products - create product (admin)
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(data): Json<ProductCreate>,
) -> AppResult<Json<Product>> {
    require_admin(&user)?;
    validate_required_text(&data.name, "product name", MAX_NAME_LEN)?;
    validate_image_urls(&data.image_urls)?;

    let product = repository::product::create(&state.db, data)
        .await
        .map_err(repo_error)?;

    tracing::info!(product_id = %product.id, admin = %user.id, "product created");
    Ok(Json(product))
}

/// PUT /api/products/{id} - update product (admin)
pub async fn update(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(data): Json<ProductUpdate>,
) -> AppResult<Json<Product>> {
    require_admin(&user)?;
    if let Some(name) = &data.name {
        validate_required_text(name, "product name", MAX_NAME_LEN)?;
    }
    validate_image_urls(&data.image_urls)?;

    let product = repository::product::update(&state.db, &id, data)
        .await
        .map_err(repo_error)?;

    tracing::info!(product_id = %id, admin = %user.id, "product updated");
    Ok(Json(product))
}

/// DELETE /api/products/{id} - deactivate product (admin)
pub async fn delete(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    require_admin(&user)?;
    repository::product::deactivate(&state.db, &id)
        .await
        .map_err(repo_error)?;

    tracing::info!(product_id = %id, admin = %user.id, "product deactivated");
    Ok(Json(serde_json::json!({ "deleted": id })))
}

fn require_admin(user: &CurrentUser) -> AppResult<()> {
    if !user.is_admin() {
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }
    Ok(())
}
