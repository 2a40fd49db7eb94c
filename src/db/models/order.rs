//! Order Model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Order status lifecycle: pending -> shipped | cancelled
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Shipped,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "shipped" => Some(OrderStatus::Shipped),
            "cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

/// Customer delivery address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub number: String,
    pub complement: Option<String>,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
    pub cep: String,
}

/// Customer contact payload, validated before any order is written
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Address,
}

/// Order row as persisted (customer fields flattened into columns)
#[derive(Debug, Clone, FromRow)]
pub struct OrderRecord {
    pub id: String,
    pub user_id: String,
    pub total: f64,
    pub status: String,
    pub customer_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub street: String,
    pub number: String,
    pub complement: Option<String>,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
    pub cep: String,
    pub created_at: i64,
}

/// Line item row, a snapshot of the product at order time
#[derive(Debug, Clone, FromRow)]
pub struct OrderItemRecord {
    pub order_id: String,
    pub position: i64,
    pub product_id: String,
    pub name: String,
    pub unit_price: f64,
    pub qty: i64,
    pub image_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_as_str() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Shipped,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn status_rejects_unknown_values() {
        assert_eq!(OrderStatus::parse("refunded"), None);
        assert_eq!(OrderStatus::parse("Pending"), None);
        assert_eq!(OrderStatus::parse(""), None);
    }
}
