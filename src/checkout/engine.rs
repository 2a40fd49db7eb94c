//! Order Transaction Engine
//!
//! Given a cart of product references and quantities, atomically:
//! re-read the catalog, validate every line, compute the total, decrement
//! stock and persist the order. All of it commits together or not at all.
//!
//! Prices are always taken from the catalog row read inside the
//! transaction, never from client input. Stock checks and decrements
//! share that same transaction, so two concurrent checkouts can never
//! both pass validation against a stale count: the losing transaction
//! surfaces a write conflict, is retried with backoff, and re-validates
//! against the committed state.

use std::collections::HashMap;
use std::time::Duration;

use rand::Rng;
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::checkout::error::CheckoutError;
use crate::checkout::types::{LineSnapshot, OrderRequest, OrderSnapshot};
use crate::db::models::{CustomerInfo, OrderStatus};
use crate::utils::now_millis;
use crate::utils::validation::{
    MAX_ADDRESS_LEN, MAX_EMAIL_LEN, MAX_NAME_LEN, MAX_SHORT_TEXT_LEN, validate_checkout_optional,
    validate_checkout_text,
};

/// Sanity cap on a single line's quantity, applied after merging
/// duplicate product ids
pub const MAX_LINE_QTY: i64 = 10_000;

/// Retry and deadline policy for one checkout invocation
#[derive(Debug, Clone)]
pub struct CheckoutPolicy {
    /// Covers the whole read-validate-write attempt loop
    pub deadline: Duration,
    /// Write-conflict retries before giving up with an internal error
    pub max_retries: u32,
    /// Base delay for exponential backoff between retries
    pub retry_base_delay: Duration,
}

impl Default for CheckoutPolicy {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(10),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(50),
        }
    }
}

/// A validated cart line: product id plus coerced quantity
type ResolvedLine = (String, i64);

/// Create an order from a validated caller identity and a raw cart.
///
/// Returns the committed order's full snapshot. On any error the
/// transaction is rolled back: no stock moves and no order rows exist.
pub async fn create_order(
    pool: &SqlitePool,
    policy: &CheckoutPolicy,
    caller_id: &str,
    request: OrderRequest,
) -> Result<OrderSnapshot, CheckoutError> {
    let lines = validate_request(caller_id, &request)?;

    let attempt_loop = run_with_retries(pool, policy, caller_id, &lines, &request.customer);
    match tokio::time::timeout(policy.deadline, attempt_loop).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(caller_id, "checkout deadline exceeded");
            Err(CheckoutError::DeadlineExceeded)
        }
    }
}

// ── Pre-transaction validation ──────────────────────────────────────

/// Shape-check the request and merge duplicate product ids by summing
/// their quantities (first occurrence keeps its position).
fn validate_request(
    caller_id: &str,
    request: &OrderRequest,
) -> Result<Vec<ResolvedLine>, CheckoutError> {
    if caller_id.trim().is_empty() {
        return Err(CheckoutError::Unauthenticated);
    }
    if request.items.is_empty() {
        return Err(CheckoutError::invalid("cart is empty"));
    }

    let mut merged: Vec<ResolvedLine> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for item in &request.items {
        if item.id.trim().is_empty() {
            return Err(CheckoutError::invalid("missing product id"));
        }
        let qty = coerce_qty(item.qty, &item.id)?;
        if let Some(&pos) = index.get(item.id.as_str()) {
            merged[pos].1 += qty;
        } else {
            index.insert(item.id.as_str(), merged.len());
            merged.push((item.id.clone(), qty));
        }
    }
    for (id, qty) in &merged {
        if *qty > MAX_LINE_QTY {
            return Err(CheckoutError::invalid(format!(
                "quantity for product {id} exceeds the limit of {MAX_LINE_QTY}"
            )));
        }
    }

    validate_customer(&request.customer)?;

    Ok(merged)
}

/// Coerce a wire quantity to a positive integer. Non-integral values are
/// rejected, never rounded.
fn coerce_qty(qty: f64, product_id: &str) -> Result<i64, CheckoutError> {
    if !qty.is_finite() || qty.fract() != 0.0 || qty < 1.0 || qty > MAX_LINE_QTY as f64 {
        return Err(CheckoutError::invalid(format!(
            "invalid quantity for product {product_id}"
        )));
    }
    Ok(qty as i64)
}

fn validate_customer(customer: &CustomerInfo) -> Result<(), CheckoutError> {
    validate_checkout_text(&customer.name, "customer name", MAX_NAME_LEN)?;
    validate_checkout_text(&customer.phone, "phone", MAX_SHORT_TEXT_LEN)?;
    validate_checkout_optional(&customer.email, "email", MAX_EMAIL_LEN)?;

    let address = &customer.address;
    validate_checkout_text(&address.street, "street", MAX_ADDRESS_LEN)?;
    validate_checkout_text(&address.number, "number", MAX_SHORT_TEXT_LEN)?;
    validate_checkout_optional(&address.complement, "complement", MAX_ADDRESS_LEN)?;
    validate_checkout_text(&address.neighborhood, "neighborhood", MAX_ADDRESS_LEN)?;
    validate_checkout_text(&address.city, "city", MAX_ADDRESS_LEN)?;
    validate_checkout_text(&address.state, "state", MAX_SHORT_TEXT_LEN)?;
    validate_checkout_text(&address.cep, "cep", MAX_SHORT_TEXT_LEN)?;
    Ok(())
}

// ── Transaction attempt loop ────────────────────────────────────────

/// Internal per-attempt error: separates clean rejections from store
/// failures so only conflicts are retried.
enum TxError {
    Rejected(CheckoutError),
    Busy(sqlx::Error),
    Db(sqlx::Error),
}

impl From<sqlx::Error> for TxError {
    fn from(err: sqlx::Error) -> Self {
        if is_write_conflict(&err) {
            TxError::Busy(err)
        } else {
            TxError::Db(err)
        }
    }
}

impl From<CheckoutError> for TxError {
    fn from(err: CheckoutError) -> Self {
        TxError::Rejected(err)
    }
}

/// SQLITE_BUSY family: another writer holds the lock or committed past
/// our read snapshot. Safe to retry the whole transaction.
fn is_write_conflict(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            let code_is_busy = db
                .code()
                .map(|c| matches!(c.as_ref(), "5" | "261" | "517"))
                .unwrap_or(false);
            code_is_busy || db.message().contains("database is locked")
        }
        _ => false,
    }
}

async fn run_with_retries(
    pool: &SqlitePool,
    policy: &CheckoutPolicy,
    caller_id: &str,
    lines: &[ResolvedLine],
    customer: &CustomerInfo,
) -> Result<OrderSnapshot, CheckoutError> {
    let mut attempt: u32 = 0;
    loop {
        match run_transaction(pool, caller_id, lines, customer).await {
            Ok(snapshot) => {
                tracing::info!(
                    order_id = %snapshot.order_id,
                    caller_id,
                    total = snapshot.total,
                    "order created"
                );
                return Ok(snapshot);
            }
            Err(TxError::Rejected(err)) => {
                tracing::info!(caller_id, kind = err.kind(), %err, "checkout rejected");
                return Err(err);
            }
            Err(TxError::Busy(err)) => {
                attempt += 1;
                if attempt > policy.max_retries {
                    tracing::error!(caller_id, error = %err, "checkout retry budget exhausted");
                    return Err(CheckoutError::Internal(format!(
                        "retry budget exhausted: {err}"
                    )));
                }
                let backoff = policy.retry_base_delay * 2u32.pow(attempt - 1);
                let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..20));
                tracing::debug!(caller_id, attempt, "write conflict, retrying checkout");
                tokio::time::sleep(backoff + jitter).await;
            }
            Err(TxError::Db(err)) => {
                tracing::error!(caller_id, error = %err, "checkout store failure");
                return Err(CheckoutError::Internal(err.to_string()));
            }
        }
    }
}

// ── One transactional attempt ───────────────────────────────────────

/// Catalog columns the engine needs inside the transaction
#[derive(Debug, FromRow)]
struct CatalogRow {
    id: String,
    name: String,
    price: f64,
    stock: i64,
    image_urls: String,
}

async fn run_transaction(
    pool: &SqlitePool,
    caller_id: &str,
    lines: &[ResolvedLine],
    customer: &CustomerInfo,
) -> Result<OrderSnapshot, TxError> {
    let mut tx = pool.begin().await?;

    // 1. Batched read of every referenced product
    let placeholders = lines.iter().map(|_| "?").collect::<Vec<_>>().join(",");
    let sql = format!(
        "SELECT id, name, price, stock, image_urls FROM product \
         WHERE is_active = 1 AND id IN ({placeholders})"
    );
    let mut query = sqlx::query_as::<_, CatalogRow>(&sql);
    for (id, _) in lines {
        query = query.bind(id);
    }
    let rows = query.fetch_all(&mut *tx).await?;
    let catalog: HashMap<&str, &CatalogRow> =
        rows.iter().map(|row| (row.id.as_str(), row)).collect();

    // First missing id (in request order) fails the whole cart
    for (id, _) in lines {
        if !catalog.contains_key(id.as_str()) {
            return Err(CheckoutError::ProductNotFound(id.clone()).into());
        }
    }

    // 2. Validate each line in request order, accumulate the total and
    //    build the snapshot
    let mut total = 0.0;
    let mut snapshot_items = Vec::with_capacity(lines.len());
    for (id, qty) in lines {
        let product = catalog[id.as_str()];
        if *qty > product.stock {
            return Err(CheckoutError::InsufficientStock {
                product_id: id.clone(),
                name: product.name.clone(),
                requested: *qty,
                available: product.stock,
            }
            .into());
        }
        total += product.price * *qty as f64;
        let image_url = serde_json::from_str::<Vec<String>>(&product.image_urls)
            .ok()
            .and_then(|urls| urls.into_iter().next());
        snapshot_items.push(LineSnapshot {
            id: id.clone(),
            name: product.name.clone(),
            price: product.price,
            qty: *qty,
            image_url,
        });
    }

    let now = now_millis();

    // 3. Apply the decrements. The guard re-states the invariant; with a
    //    stale snapshot the UPDATE surfaces a busy error instead, which
    //    the caller retries against fresh state.
    for (id, qty) in lines {
        let result = sqlx::query(
            "UPDATE product SET stock = stock - ?1, updated_at = ?2 \
             WHERE id = ?3 AND stock >= ?1",
        )
        .bind(qty)
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            let product = catalog[id.as_str()];
            return Err(CheckoutError::InsufficientStock {
                product_id: id.clone(),
                name: product.name.clone(),
                requested: *qty,
                available: product.stock,
            }
            .into());
        }
    }

    // 4. Persist the order and its line items
    let order_id = Uuid::new_v4().simple().to_string();
    sqlx::query(
        "INSERT INTO customer_order \
         (id, user_id, total, status, customer_name, phone, email, street, number, \
          complement, neighborhood, city, state, cep, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&order_id)
    .bind(caller_id)
    .bind(total)
    .bind(OrderStatus::Pending.as_str())
    .bind(&customer.name)
    .bind(&customer.phone)
    .bind(&customer.email)
    .bind(&customer.address.street)
    .bind(&customer.address.number)
    .bind(&customer.address.complement)
    .bind(&customer.address.neighborhood)
    .bind(&customer.address.city)
    .bind(&customer.address.state)
    .bind(&customer.address.cep)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    for (position, item) in snapshot_items.iter().enumerate() {
        sqlx::query(
            "INSERT INTO order_item \
             (order_id, position, product_id, name, unit_price, qty, image_url) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&order_id)
        .bind(position as i64)
        .bind(&item.id)
        .bind(&item.name)
        .bind(item.price)
        .bind(item.qty)
        .bind(&item.image_url)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(OrderSnapshot {
        order_id,
        user_id: caller_id.to_string(),
        items: snapshot_items,
        total,
        status: OrderStatus::Pending,
        created_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::types::CartItem;
    use crate::db::models::Address;

    fn customer() -> CustomerInfo {
        CustomerInfo {
            name: "Maria Silva".to_string(),
            phone: "+55 11 91234-5678".to_string(),
            email: Some("maria@example.com".to_string()),
            address: Address {
                street: "Rua das Flores".to_string(),
                number: "123".to_string(),
                complement: None,
                neighborhood: "Centro".to_string(),
                city: "São Paulo".to_string(),
                state: "SP".to_string(),
                cep: "01000-000".to_string(),
            },
        }
    }

    fn request(items: Vec<CartItem>) -> OrderRequest {
        OrderRequest {
            items,
            customer: customer(),
        }
    }

    fn item(id: &str, qty: f64) -> CartItem {
        CartItem {
            id: id.to_string(),
            qty,
        }
    }

    #[test]
    fn rejects_anonymous_caller() {
        let err = validate_request("", &request(vec![item("p1", 1.0)])).unwrap_err();
        assert_eq!(err.kind(), "unauthenticated");
        let err = validate_request("   ", &request(vec![item("p1", 1.0)])).unwrap_err();
        assert_eq!(err.kind(), "unauthenticated");
    }

    #[test]
    fn rejects_empty_cart() {
        let err = validate_request("user-1", &request(vec![])).unwrap_err();
        assert_eq!(err.kind(), "invalid_argument");
    }

    #[test]
    fn rejects_bad_quantities() {
        for qty in [0.0, -1.0, 1.5, f64::NAN, f64::INFINITY] {
            let err = validate_request("user-1", &request(vec![item("p1", qty)])).unwrap_err();
            assert_eq!(err.kind(), "invalid_argument", "qty {qty} should be rejected");
        }
    }

    #[test]
    fn accepts_integral_float_quantity() {
        let lines = validate_request("user-1", &request(vec![item("p1", 3.0)])).unwrap();
        assert_eq!(lines, vec![("p1".to_string(), 3)]);
    }

    #[test]
    fn merges_duplicate_product_ids() {
        let lines = validate_request(
            "user-1",
            &request(vec![item("p1", 2.0), item("p2", 1.0), item("p1", 3.0)]),
        )
        .unwrap();
        // First occurrence keeps its position, quantities are summed
        assert_eq!(
            lines,
            vec![("p1".to_string(), 5), ("p2".to_string(), 1)]
        );
    }

    #[test]
    fn rejects_merged_quantity_over_cap() {
        let half = (MAX_LINE_QTY / 2 + 1) as f64;
        let err = validate_request("user-1", &request(vec![item("p1", half), item("p1", half)]))
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_argument");
    }

    #[test]
    fn rejects_missing_customer_fields() {
        let mut req = request(vec![item("p1", 1.0)]);
        req.customer.name = String::new();
        let err = validate_request("user-1", &req).unwrap_err();
        assert_eq!(err.kind(), "invalid_argument");

        let mut req = request(vec![item("p1", 1.0)]);
        req.customer.address.cep = "  ".to_string();
        let err = validate_request("user-1", &req).unwrap_err();
        assert_eq!(err.kind(), "invalid_argument");
    }

    #[test]
    fn same_invalid_input_fails_the_same_way() {
        let req = request(vec![item("p1", -2.0)]);
        let first = validate_request("user-1", &req).unwrap_err();
        let second = validate_request("user-1", &req).unwrap_err();
        assert_eq!(first.kind(), second.kind());
    }
}
