//! 目录、购物车与订单的端到端测试
//!
//! 需要 PostgreSQL：`TEST_DATABASE_URL=... cargo test -- --ignored`

use axum::http::StatusCode;
use serde_json::{json, Value};
use serial_test::serial;
use shop_api::models::user::Role;

mod common;
use common::DbTestApp;

fn shipping() -> Value {
    json!({
        "shipping_address": "1 Main Street",
        "shipping_city": "Springfield",
        "shipping_country": "US",
        "shipping_postal_code": "12345"
    })
}

/// 创建分类与一个商品，返回商品 ID
async fn seed_product(app: &DbTestApp, admin: &str, price: i64, stock: i32) -> String {
    let (status, category) = app
        .request(
            "POST",
            "/api/v1/categories",
            Some(admin),
            Some(json!({"name": "Books", "slug": "books"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", category);

    let (status, product) = app
        .request(
            "POST",
            "/api/v1/products",
            Some(admin),
            Some(json!({
                "name": "Rust in Action",
                "slug": "rust-in-action",
                "sku": "BOOK-001",
                "price": price,
                "stock_quantity": stock,
                "category_id": category["id"]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", product);

    product["id"].as_str().unwrap().to_string()
}

async fn stock_of(app: &DbTestApp, product_id: &str) -> i64 {
    let (status, product) = app
        .request("GET", &format!("/api/v1/products/{}", product_id), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    product["stock_quantity"].as_i64().unwrap()
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL"]
async fn test_checkout_and_cancel_restore_stock() {
    let app = DbTestApp::new().await;
    let admin = app.user_token("admin", Role::Admin).await;
    let buyer = app.user_token("buyer", Role::User).await;
    let product_id = seed_product(&app, &admin, 4000, 5).await;

    let (status, cart) = app
        .request(
            "POST",
            "/api/v1/cart/items",
            Some(&buyer),
            Some(json!({"product_id": product_id, "quantity": 3})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", cart);
    assert_eq!(cart["total_amount"], 12000);

    // 合并后超过库存
    let (status, _) = app
        .request(
            "POST",
            "/api/v1/cart/items",
            Some(&buyer),
            Some(json!({"product_id": product_id, "quantity": 3})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, order) = app
        .request("POST", "/api/v1/orders", Some(&buyer), Some(shipping()))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", order);
    assert_eq!(order["subtotal"], 12000);
    assert_eq!(order["tax_amount"], 2520);
    assert_eq!(order["shipping_amount"], 0);
    assert_eq!(order["total_amount"], 14520);
    assert_eq!(order["status"], "pending");
    assert_eq!(order["billing_city"], "Springfield");
    assert!(order["order_number"].as_str().unwrap().starts_with("ORD-"));
    assert_eq!(stock_of(&app, &product_id).await, 2);

    // 结算后购物车关闭
    let (_, summary) = app
        .request("GET", "/api/v1/cart/summary", Some(&buyer), None)
        .await;
    assert_eq!(summary["total_items"], 0);

    let order_id = order["id"].as_str().unwrap();

    // 其他用户不能查看
    let other = app.user_token("other", Role::User).await;
    let (status, _) = app
        .request("GET", &format!("/api/v1/orders/{}", order_id), Some(&other), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, cancelled) = app
        .request(
            "POST",
            &format!("/api/v1/orders/{}/cancel", order_id),
            Some(&buyer),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", cancelled);
    assert_eq!(cancelled["status"], "cancelled");
    assert_eq!(stock_of(&app, &product_id).await, 5);

    // 已取消的订单不能再次取消
    let (status, _) = app
        .request(
            "POST",
            &format!("/api/v1/orders/{}/cancel", order_id),
            Some(&buyer),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL"]
async fn test_direct_order_pays_flat_shipping() {
    let app = DbTestApp::new().await;
    let admin = app.user_token("admin", Role::Admin).await;
    let buyer = app.user_token("buyer", Role::User).await;
    let product_id = seed_product(&app, &admin, 20000, 3).await;

    let mut body = shipping();
    body["items"] = json!([{"product_id": product_id, "quantity": 1}]);

    let (status, order) = app
        .request("POST", "/api/v1/orders/direct", Some(&buyer), Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", order);
    assert_eq!(order["subtotal"], 20000);
    assert_eq!(order["tax_amount"], 4200);
    assert_eq!(order["shipping_amount"], 1000);
    assert_eq!(order["total_amount"], 25200);
    assert_eq!(order["items"].as_array().unwrap().len(), 1);

    // 库存不足时整单失败，库存不变
    body["items"] = json!([{"product_id": product_id, "quantity": 5}]);
    let (status, _) = app
        .request("POST", "/api/v1/orders/direct", Some(&buyer), Some(body))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(stock_of(&app, &product_id).await, 2);
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL"]
async fn test_payment_confirms_pending_order() {
    let app = DbTestApp::new().await;
    let admin = app.user_token("admin", Role::Admin).await;
    let buyer = app.user_token("buyer", Role::User).await;
    let product_id = seed_product(&app, &admin, 1000, 10).await;

    let mut body = shipping();
    body["items"] = json!([{"product_id": product_id, "quantity": 2}]);
    let (_, order) = app
        .request("POST", "/api/v1/orders/direct", Some(&buyer), Some(body))
        .await;
    let order_id = order["id"].as_str().unwrap();

    // 普通用户不能修改支付状态
    let (status, _) = app
        .request(
            "PUT",
            &format!("/api/v1/orders/{}/payment-status", order_id),
            Some(&buyer),
            Some(json!({"payment_status": "paid"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, paid) = app
        .request(
            "PUT",
            &format!("/api/v1/orders/{}/payment-status", order_id),
            Some(&admin),
            Some(json!({"payment_status": "paid"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", paid);
    assert_eq!(paid["payment_status"], "paid");
    assert_eq!(paid["status"], "confirmed");

    // 非法的状态迁移
    let (status, _) = app
        .request(
            "PUT",
            &format!("/api/v1/orders/{}/status", order_id),
            Some(&admin),
            Some(json!({"status": "delivered"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL"]
async fn test_duplicate_sku_conflicts() {
    let app = DbTestApp::new().await;
    let admin = app.user_token("admin", Role::Admin).await;
    let product_id = seed_product(&app, &admin, 1000, 1).await;

    let (_, existing) = app
        .request("GET", &format!("/api/v1/products/{}", product_id), None, None)
        .await;

    let (status, body) = app
        .request(
            "POST",
            "/api/v1/products",
            Some(&admin),
            Some(json!({
                "name": "Another",
                "slug": "another",
                "sku": "BOOK-001",
                "price": 500,
                "category_id": existing["category_id"]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{}", body);
}
