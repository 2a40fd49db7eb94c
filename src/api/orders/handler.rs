//! Order API Handlers
//!
//! The checkout handler is a thin invocation boundary: it authenticates
//! the caller, hands the parsed request to the transaction engine and
//! maps the engine's error taxonomy to transport codes. No business
//! rules live here.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::checkout::{self, CheckoutError, OrderRequest, OrderSnapshot};
use crate::core::ServerState;
use crate::db::models::OrderStatus;
use crate::db::repository::{self, RepoError};
use crate::utils::{AppError, AppResult};

/// Engine error taxonomy -> transport mapping. Internal detail has
/// already been logged by the engine; only clean messages cross here.
fn checkout_error(err: CheckoutError) -> AppError {
    match err {
        CheckoutError::Unauthenticated => AppError::Unauthorized,
        CheckoutError::InvalidArgument(msg) => AppError::validation(msg),
        CheckoutError::ProductNotFound(id) => AppError::not_found(format!("Product {id}")),
        CheckoutError::InsufficientStock { name, available, .. } => AppError::InsufficientStock(
            format!("insufficient stock for {name} ({available} available)"),
        ),
        CheckoutError::DeadlineExceeded => {
            AppError::internal("checkout deadline exceeded".to_string())
        }
        CheckoutError::Internal(msg) => AppError::internal(msg),
    }
}

fn repo_error(err: RepoError) -> AppError {
    match err {
        RepoError::NotFound(msg) => AppError::not_found(msg),
        RepoError::Duplicate(msg) => AppError::Conflict(msg),
        RepoError::Validation(msg) => AppError::validation(msg),
        RepoError::Database(msg) => AppError::database(msg),
    }
}

/// POST /api/orders - checkout
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(request): Json<OrderRequest>,
) -> AppResult<Json<OrderSnapshot>> {
    let snapshot = checkout::create_order(&state.db, state.checkout_policy(), &user.id, request)
        .await
        .map_err(checkout_error)?;
    Ok(Json(snapshot))
}

/// GET /api/orders - caller's orders; admins see all
pub async fn list(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<OrderSnapshot>>> {
    let orders = if user.is_admin() {
        repository::order::find_all(&state.db).await
    } else {
        repository::order::find_by_user(&state.db, &user.id).await
    }
    .map_err(repo_error)?;

    let mut snapshots = Vec::with_capacity(orders.len());
    for order in orders {
        let items = repository::order::find_items(&state.db, &order.id)
            .await
            .map_err(repo_error)?;
        snapshots.push(OrderSnapshot::from_records(order, items));
    }
    Ok(Json(snapshots))
}

/// GET /api/orders/{id} - one order (owner or admin)
pub async fn get_by_id(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<OrderSnapshot>> {
    let (order, items) = repository::order::find_by_id(&state.db, &id)
        .await
        .map_err(repo_error)?
        .ok_or_else(|| AppError::not_found(format!("Order {id}")))?;

    if order.user_id != user.id && !user.is_admin() {
        return Err(AppError::Forbidden("Not your order".to_string()));
    }

    Ok(Json(OrderSnapshot::from_records(order, items)))
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

/// PUT /api/orders/{id}/status - admin transition pending -> shipped/cancelled
pub async fn update_status(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<StatusUpdate>,
) -> AppResult<Json<OrderSnapshot>> {
    if !user.is_admin() {
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }

    let order = repository::order::update_status(&state.db, &id, body.status)
        .await
        .map_err(repo_error)?;
    let items = repository::order::find_items(&state.db, &id)
        .await
        .map_err(repo_error)?;

    tracing::info!(order_id = %id, status = body.status.as_str(), admin = %user.id, "order status updated");
    Ok(Json(OrderSnapshot::from_records(order, items)))
}
