//! 输入校验、健康检查与错误响应格式的集成测试
//! 这些请求都在访问数据库之前被处理

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use shop_api::models::user::Role;
use tower::ServiceExt;
use uuid::Uuid;

mod common;
use common::TestApp;

fn field_names(body: &Value) -> Vec<String> {
    body["error"]["fields"]
        .as_array()
        .map(|fields| {
            fields
                .iter()
                .filter_map(|f| f["field"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

async fn admin_token(app: &TestApp) -> String {
    app.create_user("admin", "Secret123", Role::Admin).await;
    app.login("admin", "Secret123").await.0
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();

    let (status, body) = app.request("GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_error_body_carries_response_request_id() {
    let app = TestApp::new();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/auth/me")
                .header("x-trace-id", "trace-abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()["x-trace-id"], "trace-abc");
    let request_id = response.headers()["x-request-id"]
        .to_str()
        .unwrap()
        .to_string();

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"]["code"], 401);
    assert_eq!(body["error"]["request_id"], request_id);
}

#[tokio::test]
async fn test_product_negative_price_rejected() {
    let app = TestApp::new();
    let token = admin_token(&app).await;

    let (status, body) = app
        .request(
            "POST",
            "/api/v1/products",
            Some(&token),
            Some(json!({
                "name": "Widget",
                "slug": "widget",
                "sku": "W-1",
                "price": -5,
                "category_id": Uuid::new_v4()
            })),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["kind"], "validation_error");
    assert!(field_names(&body).contains(&"price".to_string()));
}

#[tokio::test]
async fn test_product_errors_are_collected() {
    let app = TestApp::new();
    let token = admin_token(&app).await;

    let (status, body) = app
        .request(
            "POST",
            "/api/v1/products",
            Some(&token),
            Some(json!({
                "name": "   ",
                "slug": "Not A Slug",
                "sku": "W-2",
                "price": 1000,
                "sale_price": 1500,
                "category_id": Uuid::new_v4()
            })),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let fields = field_names(&body);
    for expected in ["name", "slug", "sale_price"] {
        assert!(fields.contains(&expected.to_string()), "missing {expected}: {fields:?}");
    }
    assert!(!fields.contains(&"price".to_string()));
}

#[tokio::test]
async fn test_malformed_json_rejected() {
    let app = TestApp::new();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/auth/login")
                .header("content-type", "application/json")
                .body(Body::from("{\"username\": "))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(field_names(&body), vec!["body".to_string()]);
}

#[tokio::test]
async fn test_page_size_over_limit_rejected() {
    let app = TestApp::new();

    let (status, body) = app
        .request("GET", "/api/v1/products?page_size=1000", None, None)
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(field_names(&body), vec!["page_size".to_string()]);

    let (status, _) = app
        .request("GET", "/api/v1/products?page=0", None, None)
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_register_collects_field_errors() {
    let app = TestApp::new();

    let (status, body) = app
        .request(
            "POST",
            "/api/v1/auth/register",
            None,
            Some(json!({
                "email": "not-an-email",
                "username": "a b",
                "first_name": "",
                "last_name": "Doe",
                "password": "password"
            })),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let fields = field_names(&body);
    for expected in ["email", "username", "first_name", "password"] {
        assert!(fields.contains(&expected.to_string()), "missing {expected}: {fields:?}");
    }
}

#[tokio::test]
async fn test_cart_quantity_must_be_positive() {
    let app = TestApp::new();
    app.create_user("shopper", "Secret123", Role::User).await;
    let (token, _) = app.login("shopper", "Secret123").await;

    let (status, body) = app
        .request(
            "POST",
            "/api/v1/cart/items",
            Some(&token),
            Some(json!({"product_id": Uuid::new_v4(), "quantity": 0})),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(field_names(&body).contains(&"quantity".to_string()));
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = TestApp::new();

    let (status, _) = app.request("GET", "/api/v1/nothing-here", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
