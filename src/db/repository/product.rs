//! Product Repository

use super::{RepoError, RepoResult};
use crate::db::models::product::ProductRow;
use crate::db::models::{Product, ProductCreate, ProductUpdate};
use crate::utils::now_millis;
use sqlx::SqlitePool;

const PRODUCT_COLUMNS: &str =
    "id, name, price, stock, image_urls, is_active, created_at, updated_at";

/// Find all active products
pub async fn find_all(pool: &SqlitePool) -> RepoResult<Vec<Product>> {
    let rows = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM product WHERE is_active = 1 ORDER BY name"
    ))
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Product::from).collect())
}

/// Find a product by id (active or not)
pub async fn find_by_id(pool: &SqlitePool, id: &str) -> RepoResult<Option<Product>> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM product WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(Product::from))
}

/// Create a new product
pub async fn create(pool: &SqlitePool, data: ProductCreate) -> RepoResult<Product> {
    if data.price < 0.0 {
        return Err(RepoError::Validation("price must not be negative".into()));
    }
    if data.stock < 0 {
        return Err(RepoError::Validation("stock must not be negative".into()));
    }

    let id = data
        .id
        .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
    let image_urls = serde_json::to_string(&data.image_urls.unwrap_or_default())
        .map_err(|e| RepoError::Database(e.to_string()))?;
    let now = now_millis();

    let result = sqlx::query(
        "INSERT INTO product (id, name, price, stock, image_urls, is_active, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, 1, ?, ?)",
    )
    .bind(&id)
    .bind(&data.name)
    .bind(data.price)
    .bind(data.stock)
    .bind(&image_urls)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await;

    match result {
        Ok(_) => {}
        Err(sqlx::Error::Database(e)) if e.message().contains("UNIQUE") => {
            return Err(RepoError::Duplicate(format!("Product {id} already exists")));
        }
        Err(e) => return Err(e.into()),
    }

    find_by_id(pool, &id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create product".to_string()))
}

/// Update a product
pub async fn update(pool: &SqlitePool, id: &str, data: ProductUpdate) -> RepoResult<Product> {
    if let Some(price) = data.price
        && price < 0.0
    {
        return Err(RepoError::Validation("price must not be negative".into()));
    }
    if let Some(stock) = data.stock
        && stock < 0
    {
        return Err(RepoError::Validation("stock must not be negative".into()));
    }

    // Build dynamic SET clauses, binding only the provided fields
    let mut set_parts: Vec<&str> = Vec::new();
    if data.name.is_some() {
        set_parts.push("name = ?");
    }
    if data.price.is_some() {
        set_parts.push("price = ?");
    }
    if data.stock.is_some() {
        set_parts.push("stock = ?");
    }
    if data.image_urls.is_some() {
        set_parts.push("image_urls = ?");
    }
    if data.is_active.is_some() {
        set_parts.push("is_active = ?");
    }

    if set_parts.is_empty() {
        // No fields to update
        return find_by_id(pool, id)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("Product {id} not found")));
    }
    set_parts.push("updated_at = ?");

    let sql = format!("UPDATE product SET {} WHERE id = ?", set_parts.join(", "));
    let mut query = sqlx::query(&sql);
    if let Some(v) = data.name {
        query = query.bind(v);
    }
    if let Some(v) = data.price {
        query = query.bind(v);
    }
    if let Some(v) = data.stock {
        query = query.bind(v);
    }
    if let Some(v) = data.image_urls {
        let json = serde_json::to_string(&v).map_err(|e| RepoError::Database(e.to_string()))?;
        query = query.bind(json);
    }
    if let Some(v) = data.is_active {
        query = query.bind(v);
    }
    query = query.bind(now_millis()).bind(id.to_string());

    let result = query.execute(pool).await?;
    if result.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Product {id} not found")));
    }

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Product {id} not found")))
}

/// Soft-delete a product: catalog reads skip it, existing orders keep
/// their snapshots untouched.
pub async fn deactivate(pool: &SqlitePool, id: &str) -> RepoResult<()> {
    let result = sqlx::query("UPDATE product SET is_active = 0, updated_at = ? WHERE id = ?")
        .bind(now_millis())
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Product {id} not found")));
    }
    Ok(())
}
