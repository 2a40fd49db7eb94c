//! Order Repository
//!
//! Read and status-update access to persisted orders. Order creation goes
//! through the checkout engine only, so the insert path lives there:
//! stock decrements and the order write must share one transaction.

use super::{RepoError, RepoResult};
use crate::db::models::{OrderItemRecord, OrderRecord, OrderStatus};
use sqlx::SqlitePool;

const ORDER_COLUMNS: &str = "id, user_id, total, status, customer_name, phone, email, \
     street, number, complement, neighborhood, city, state, cep, created_at";

/// Find one order with its line items
pub async fn find_by_id(
    pool: &SqlitePool,
    id: &str,
) -> RepoResult<Option<(OrderRecord, Vec<OrderItemRecord>)>> {
    let order = sqlx::query_as::<_, OrderRecord>(&format!(
        "SELECT {ORDER_COLUMNS} FROM customer_order WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    let Some(order) = order else {
        return Ok(None);
    };

    let items = find_items(pool, id).await?;
    Ok(Some((order, items)))
}

/// Line items for an order, in the position the customer submitted them
pub async fn find_items(pool: &SqlitePool, order_id: &str) -> RepoResult<Vec<OrderItemRecord>> {
    let items = sqlx::query_as::<_, OrderItemRecord>(
        "SELECT order_id, position, product_id, name, unit_price, qty, image_url \
         FROM order_item WHERE order_id = ? ORDER BY position",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await?;
    Ok(items)
}

/// Orders created by one caller, newest first
pub async fn find_by_user(pool: &SqlitePool, user_id: &str) -> RepoResult<Vec<OrderRecord>> {
    let orders = sqlx::query_as::<_, OrderRecord>(&format!(
        "SELECT {ORDER_COLUMNS} FROM customer_order WHERE user_id = ? ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(orders)
}

/// All orders, newest first (admin listing)
pub async fn find_all(pool: &SqlitePool) -> RepoResult<Vec<OrderRecord>> {
    let orders = sqlx::query_as::<_, OrderRecord>(&format!(
        "SELECT {ORDER_COLUMNS} FROM customer_order ORDER BY created_at DESC"
    ))
    .fetch_all(pool)
    .await?;
    Ok(orders)
}

/// Transition an order's status (admin action).
///
/// Only pending orders may move; cancelling does not restock, restocking
/// is a deliberate manual catalog operation.
pub async fn update_status(
    pool: &SqlitePool,
    id: &str,
    status: OrderStatus,
) -> RepoResult<OrderRecord> {
    if status == OrderStatus::Pending {
        return Err(RepoError::Validation(
            "cannot transition an order back to pending".into(),
        ));
    }

    let result = sqlx::query("UPDATE customer_order SET status = ? WHERE id = ? AND status = ?")
        .bind(status.as_str())
        .bind(id)
        .bind(OrderStatus::Pending.as_str())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        // Either the order is missing or it already left pending
        return match find_by_id(pool, id).await? {
            Some(_) => Err(RepoError::Validation(format!(
                "Order {id} is no longer pending"
            ))),
            None => Err(RepoError::NotFound(format!("Order {id} not found"))),
        };
    }

    find_by_id(pool, id)
        .await?
        .map(|(order, _)| order)
        .ok_or_else(|| RepoError::NotFound(format!("Order {id} not found")))
}
