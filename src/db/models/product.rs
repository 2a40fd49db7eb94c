//! Product Model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Product entity: the authoritative catalog record.
///
/// `price` and `stock` are server truth; client input never overwrites
/// them outside the admin API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    /// Price in currency unit
    pub price: f64,
    /// Inventory count, never negative
    pub stock: i64,
    /// Ordered image URLs (may be empty)
    pub image_urls: Vec<String>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Raw product row; `image_urls` is stored as a JSON text column
#[derive(Debug, FromRow)]
pub struct ProductRow {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub stock: i64,
    pub image_urls: String,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        let image_urls = serde_json::from_str(&row.image_urls).unwrap_or_default();
        Self {
            id: row.id,
            name: row.name,
            price: row.price,
            stock: row.stock,
            image_urls,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Create product payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCreate {
    /// Optional explicit id; a uuid is generated when absent
    pub id: Option<String>,
    pub name: String,
    pub price: f64,
    pub stock: i64,
    pub image_urls: Option<Vec<String>>,
}

/// Update product payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i64>,
    pub image_urls: Option<Vec<String>>,
    pub is_active: Option<bool>,
}
