//! Checkout wire types
//!
//! Request shape submitted by the storefront client and the snapshot
//! returned on success. Field names follow the public JSON contract
//! (camelCase), which is why these are separate from the db models.

use crate::db::models::{CustomerInfo, OrderItemRecord, OrderRecord, OrderStatus};
use serde::{Deserialize, Serialize};

/// One requested cart line: a product reference plus a quantity.
///
/// `qty` arrives as a JSON number and is coerced to an integer by the
/// engine; non-integral or non-positive values are rejected, never rounded.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CartItem {
    pub id: String,
    pub qty: f64,
}

/// Checkout request body. Caller identity comes from the session, not
/// from this payload.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrderRequest {
    pub items: Vec<CartItem>,
    pub customer: CustomerInfo,
}

/// Line item captured at order time: a point-in-time copy, decoupled
/// from future catalog edits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LineSnapshot {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub qty: i64,
    pub image_url: Option<String>,
}

/// The committed order as returned to the caller: id plus the full
/// snapshot, so downstream consumers get the authoritative total and
/// line items without a second read.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSnapshot {
    pub order_id: String,
    pub user_id: String,
    pub items: Vec<LineSnapshot>,
    pub total: f64,
    pub status: OrderStatus,
    pub created_at: i64,
}

impl OrderSnapshot {
    /// Rebuild a snapshot from persisted rows (order listing endpoints)
    pub fn from_records(order: OrderRecord, items: Vec<OrderItemRecord>) -> Self {
        // Unrecognized persisted statuses indicate a corrupted row; report
        // the order as pending rather than failing the whole listing, but
        // never silently
        let status = OrderStatus::parse(&order.status).unwrap_or_else(|| {
            tracing::error!(
                order_id = %order.id,
                status = %order.status,
                "unrecognized persisted order status"
            );
            OrderStatus::Pending
        });
        Self {
            order_id: order.id,
            user_id: order.user_id,
            items: items
                .into_iter()
                .map(|item| LineSnapshot {
                    id: item.product_id,
                    name: item.name,
                    price: item.unit_price,
                    qty: item.qty,
                    image_url: item.image_url,
                })
                .collect(),
            total: order.total,
            status,
            created_at: order.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: &str) -> OrderRecord {
        OrderRecord {
            id: "o1".to_string(),
            user_id: "user-1".to_string(),
            total: 10.0,
            status: status.to_string(),
            customer_name: "Maria Silva".to_string(),
            phone: "+55 11 91234-5678".to_string(),
            email: None,
            street: "Rua das Flores".to_string(),
            number: "123".to_string(),
            complement: None,
            neighborhood: "Centro".to_string(),
            city: "São Paulo".to_string(),
            state: "SP".to_string(),
            cep: "01000-000".to_string(),
            created_at: 0,
        }
    }

    #[test]
    fn from_records_keeps_persisted_status() {
        let snapshot = OrderSnapshot::from_records(record("shipped"), vec![]);
        assert_eq!(snapshot.status, OrderStatus::Shipped);
    }

    #[test]
    fn from_records_reports_corrupted_status_as_pending() {
        // The error branch logs; the listing still renders
        let snapshot = OrderSnapshot::from_records(record("refunded"), vec![]);
        assert_eq!(snapshot.status, OrderStatus::Pending);
    }
}
