//! Checkout engine integration tests
//!
//! Exercise the order-creation transaction against a real temp-file
//! SQLite database: atomicity, oversell protection, snapshot semantics
//! and the concurrent-race behavior.

use std::time::Duration;

use sqlx::SqlitePool;
use tempfile::TempDir;

use storefront_server::checkout::{
    self, CartItem, CheckoutError, CheckoutPolicy, OrderRequest,
};
use storefront_server::db::DbService;
use storefront_server::db::models::{Address, CustomerInfo, ProductCreate, ProductUpdate};
use storefront_server::db::repository;

async fn setup() -> (TempDir, SqlitePool) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.db");
    let db = DbService::new(path.to_str().unwrap()).await.unwrap();
    (dir, db.pool)
}

async fn seed_product(pool: &SqlitePool, id: &str, price: f64, stock: i64) {
    repository::product::create(
        pool,
        ProductCreate {
            id: Some(id.to_string()),
            name: format!("Product {id}"),
            price,
            stock,
            image_urls: Some(vec![format!("https://img.example/{id}.jpg")]),
        },
    )
    .await
    .unwrap();
}

async fn stock_of(pool: &SqlitePool, id: &str) -> i64 {
    repository::product::find_by_id(pool, id)
        .await
        .unwrap()
        .unwrap()
        .stock
}

async fn order_count(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM customer_order")
        .fetch_one(pool)
        .await
        .unwrap()
}

fn customer() -> CustomerInfo {
    CustomerInfo {
        name: "Maria Silva".to_string(),
        phone: "+55 11 91234-5678".to_string(),
        email: None,
        address: Address {
            street: "Rua das Flores".to_string(),
            number: "123".to_string(),
            complement: Some("ap 42".to_string()),
            neighborhood: "Centro".to_string(),
            city: "São Paulo".to_string(),
            state: "SP".to_string(),
            cep: "01000-000".to_string(),
        },
    }
}

fn request(items: &[(&str, f64)]) -> OrderRequest {
    OrderRequest {
        items: items
            .iter()
            .map(|(id, qty)| CartItem {
                id: id.to_string(),
                qty: *qty,
            })
            .collect(),
        customer: customer(),
    }
}

#[tokio::test]
async fn happy_path_decrements_stock_and_persists_order() {
    let (_dir, pool) = setup().await;
    seed_product(&pool, "p1", 10.0, 5).await;

    let policy = CheckoutPolicy::default();
    let snapshot = checkout::create_order(&pool, &policy, "user-1", request(&[("p1", 2.0)]))
        .await
        .unwrap();

    assert_eq!(snapshot.total, 20.0);
    assert_eq!(snapshot.user_id, "user-1");
    assert_eq!(snapshot.items.len(), 1);
    assert_eq!(snapshot.items[0].qty, 2);
    assert_eq!(snapshot.items[0].price, 10.0);
    assert_eq!(
        snapshot.items[0].image_url.as_deref(),
        Some("https://img.example/p1.jpg")
    );
    assert_eq!(stock_of(&pool, "p1").await, 3);

    // The persisted order matches the returned snapshot
    let (order, items) = repository::order::find_by_id(&pool, &snapshot.order_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.status, "pending");
    assert_eq!(order.total, 20.0);
    assert_eq!(order.customer_name, "Maria Silva");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].unit_price, 10.0);
}

#[tokio::test]
async fn total_equals_sum_of_line_totals() {
    let (_dir, pool) = setup().await;
    seed_product(&pool, "p1", 10.0, 10).await;
    seed_product(&pool, "p2", 3.5, 10).await;

    let policy = CheckoutPolicy::default();
    let snapshot = checkout::create_order(
        &pool,
        &policy,
        "user-1",
        request(&[("p1", 2.0), ("p2", 4.0)]),
    )
    .await
    .unwrap();

    let computed: f64 = snapshot
        .items
        .iter()
        .map(|item| item.price * item.qty as f64)
        .sum();
    assert_eq!(snapshot.total, computed);
    assert_eq!(snapshot.total, 34.0);
}

#[tokio::test]
async fn insufficient_stock_rejects_and_leaves_everything_untouched() {
    let (_dir, pool) = setup().await;
    seed_product(&pool, "p1", 10.0, 1).await;

    let policy = CheckoutPolicy::default();
    let err = checkout::create_order(&pool, &policy, "user-1", request(&[("p1", 5.0)]))
        .await
        .unwrap_err();

    match err {
        CheckoutError::InsufficientStock {
            product_id,
            requested,
            available,
            ..
        } => {
            assert_eq!(product_id, "p1");
            assert_eq!(requested, 5);
            assert_eq!(available, 1);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }
    assert_eq!(stock_of(&pool, "p1").await, 1);
    assert_eq!(order_count(&pool).await, 0);
}

#[tokio::test]
async fn unknown_product_fails_whole_cart() {
    let (_dir, pool) = setup().await;
    seed_product(&pool, "p1", 10.0, 5).await;

    let policy = CheckoutPolicy::default();
    let err = checkout::create_order(
        &pool,
        &policy,
        "user-1",
        request(&[("p1", 1.0), ("ghost", 1.0)]),
    )
    .await
    .unwrap_err();

    match err {
        CheckoutError::ProductNotFound(id) => assert_eq!(id, "ghost"),
        other => panic!("expected ProductNotFound, got {other:?}"),
    }
    // No partial order: p1 stock is untouched
    assert_eq!(stock_of(&pool, "p1").await, 5);
    assert_eq!(order_count(&pool).await, 0);
}

#[tokio::test]
async fn deactivated_product_is_not_purchasable() {
    let (_dir, pool) = setup().await;
    seed_product(&pool, "p1", 10.0, 5).await;
    repository::product::deactivate(&pool, "p1").await.unwrap();

    let policy = CheckoutPolicy::default();
    let err = checkout::create_order(&pool, &policy, "user-1", request(&[("p1", 1.0)]))
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::ProductNotFound(_)));
}

#[tokio::test]
async fn failure_on_later_item_rolls_back_earlier_decrements() {
    let (_dir, pool) = setup().await;
    seed_product(&pool, "p1", 10.0, 5).await;
    seed_product(&pool, "p2", 4.0, 1).await;

    let policy = CheckoutPolicy::default();
    let err = checkout::create_order(
        &pool,
        &policy,
        "user-1",
        request(&[("p1", 2.0), ("p2", 3.0)]),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, CheckoutError::InsufficientStock { .. }));
    assert_eq!(stock_of(&pool, "p1").await, 5);
    assert_eq!(stock_of(&pool, "p2").await, 1);
    assert_eq!(order_count(&pool).await, 0);
}

#[tokio::test]
async fn duplicate_ids_are_merged_into_one_line() {
    let (_dir, pool) = setup().await;
    seed_product(&pool, "p1", 2.0, 10).await;

    let policy = CheckoutPolicy::default();
    let snapshot = checkout::create_order(
        &pool,
        &policy,
        "user-1",
        request(&[("p1", 2.0), ("p1", 3.0)]),
    )
    .await
    .unwrap();

    assert_eq!(snapshot.items.len(), 1);
    assert_eq!(snapshot.items[0].qty, 5);
    assert_eq!(snapshot.total, 10.0);
    assert_eq!(stock_of(&pool, "p1").await, 5);
}

#[tokio::test]
async fn order_snapshot_survives_later_catalog_edits() {
    let (_dir, pool) = setup().await;
    seed_product(&pool, "p1", 10.0, 5).await;

    let policy = CheckoutPolicy::default();
    let snapshot = checkout::create_order(&pool, &policy, "user-1", request(&[("p1", 1.0)]))
        .await
        .unwrap();

    // Reprice and rename the product after the sale
    repository::product::update(
        &pool,
        "p1",
        ProductUpdate {
            name: Some("Renamed".to_string()),
            price: Some(99.0),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let (order, items) = repository::order::find_by_id(&pool, &snapshot.order_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.total, 10.0);
    assert_eq!(items[0].unit_price, 10.0);
    assert_eq!(items[0].name, "Product p1");
}

#[tokio::test]
async fn repeated_invalid_request_never_mutates_stock() {
    let (_dir, pool) = setup().await;
    seed_product(&pool, "p1", 10.0, 5).await;

    let policy = CheckoutPolicy::default();
    for _ in 0..2 {
        let err = checkout::create_order(&pool, &policy, "user-1", request(&[("p1", -1.0)]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_argument");
    }
    assert_eq!(stock_of(&pool, "p1").await, 5);
    assert_eq!(order_count(&pool).await, 0);
}

#[tokio::test]
async fn concurrent_checkouts_never_oversell() {
    let (_dir, pool) = setup().await;
    seed_product(&pool, "p1", 10.0, 1).await;

    let policy = CheckoutPolicy::default();
    let a = tokio::spawn({
        let pool = pool.clone();
        let policy = policy.clone();
        async move { checkout::create_order(&pool, &policy, "user-a", request(&[("p1", 1.0)])).await }
    });
    let b = tokio::spawn({
        let pool = pool.clone();
        let policy = policy.clone();
        async move { checkout::create_order(&pool, &policy, "user-b", request(&[("p1", 1.0)])).await }
    });

    let (result_a, result_b) = (a.await.unwrap(), b.await.unwrap());

    let successes = [&result_a, &result_b]
        .iter()
        .filter(|r| r.is_ok())
        .count();
    assert_eq!(successes, 1, "exactly one of the two checkouts must win");

    let loser = if result_a.is_err() { result_a } else { result_b };
    assert!(matches!(
        loser.unwrap_err(),
        CheckoutError::InsufficientStock { .. }
    ));

    assert_eq!(stock_of(&pool, "p1").await, 0);
    assert_eq!(order_count(&pool).await, 1);
}

#[tokio::test]
async fn many_concurrent_checkouts_respect_available_stock() {
    let (_dir, pool) = setup().await;
    seed_product(&pool, "p1", 1.0, 3).await;

    let policy = CheckoutPolicy {
        max_retries: 10,
        ..CheckoutPolicy::default()
    };

    let mut handles = Vec::new();
    for i in 0..6 {
        let pool = pool.clone();
        let policy = policy.clone();
        handles.push(tokio::spawn(async move {
            let user = format!("user-{i}");
            checkout::create_order(&pool, &policy, &user, request(&[("p1", 1.0)])).await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(CheckoutError::InsufficientStock { .. }) => {}
            Err(other) => panic!("unexpected checkout error: {other:?}"),
        }
    }

    assert_eq!(successes, 3);
    assert_eq!(stock_of(&pool, "p1").await, 0);
    assert_eq!(order_count(&pool).await, 3);
}

#[tokio::test]
async fn zero_deadline_reports_deadline_exceeded_without_effects() {
    let (_dir, pool) = setup().await;
    seed_product(&pool, "p1", 10.0, 5).await;

    let policy = CheckoutPolicy {
        deadline: Duration::from_nanos(1),
        ..CheckoutPolicy::default()
    };
    let err = checkout::create_order(&pool, &policy, "user-1", request(&[("p1", 1.0)]))
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::DeadlineExceeded));
    assert_eq!(stock_of(&pool, "p1").await, 5);
    assert_eq!(order_count(&pool).await, 0);
}
