//! HTTP 中间件与应用状态
//! 请求追踪（trace_id / request_id、请求指标）

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    auth::{AuthGate, JwtService, PasswordHasher},
    config::AppConfig,
    error::AppError,
    repository::CredentialStore,
    services::{
        AuthService, CartService, CategoryService, OrderService, ProductService, UserService,
    },
};

/// 应用状态
///
/// 服务以 Arc 共享；凭据存储通过 trait 对象注入，测试中可替换为内存实现。
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: PgPool,
    pub jwt_service: Arc<JwtService>,
    pub hasher: Arc<PasswordHasher>,
    pub auth_gate: Arc<AuthGate>,
    pub auth_service: Arc<AuthService>,
    pub user_service: Arc<UserService>,
    pub category_service: Arc<CategoryService>,
    pub product_service: Arc<ProductService>,
    pub cart_service: Arc<CartService>,
    pub order_service: Arc<OrderService>,
}

impl AppState {
    /// 组装所有服务
    pub fn build(
        config: AppConfig,
        db: PgPool,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self, AppError> {
        let config = Arc::new(config);
        let jwt_service = Arc::new(JwtService::from_config(&config.security)?);
        let hasher = Arc::new(PasswordHasher::from_config(&config.security)?);

        Ok(Self {
            auth_gate: Arc::new(AuthGate::new(jwt_service.clone(), store.clone())),
            auth_service: Arc::new(AuthService::new(
                store.clone(),
                hasher.clone(),
                jwt_service.clone(),
            )),
            user_service: Arc::new(UserService::new(store, hasher.clone(), config.clone())),
            category_service: Arc::new(CategoryService::new(db.clone(), config.clone())),
            product_service: Arc::new(ProductService::new(db.clone(), config.clone())),
            cart_service: Arc::new(CartService::new(db.clone())),
            order_service: Arc::new(OrderService::new(db.clone(), config.clone())),
            config,
            db,
            jwt_service,
            hasher,
        })
    }
}

tokio::task_local! {
    static REQUEST_ID: String;
}

/// 当前请求的 request_id；不在请求上下文中时生成新的
pub fn current_request_id() -> String {
    REQUEST_ID
        .try_with(|id| id.clone())
        .unwrap_or_else(|_| Uuid::new_v4().to_string())
}

/// 请求追踪中间件
/// 为每个请求生成 trace_id 和 request_id，并记录指标
pub async fn request_tracking_middleware(req: Request, next: Next) -> Response {
    let trace_id = extract_or_generate_trace_id(req.headers());
    let request_id = Uuid::new_v4().to_string();

    let method = req.method().clone();
    let uri = req.uri().path().to_string();

    let span = tracing::info_span!(
        "http_request",
        trace_id = %trace_id,
        request_id = %request_id,
        method = %method,
        uri = %uri,
    );

    let tracked = async move {
        let start = Instant::now();

        let mut response = next.run(req).await;

        let elapsed = start.elapsed();
        let status = response.status().as_u16();

        // 指标标签使用有限取值
        let method_name = match method.as_str() {
            "GET" => "GET",
            "POST" => "POST",
            "PUT" => "PUT",
            "DELETE" => "DELETE",
            "PATCH" => "PATCH",
            _ => "OTHER",
        };
        let status_class = match status {
            200..=299 => "2xx",
            300..=399 => "3xx",
            400..=499 => "4xx",
            _ => "5xx",
        };

        metrics::counter!("http_requests_total", "method" => method_name, "status" => status_class)
            .increment(1);
        metrics::histogram!("http_request_duration_seconds").record(elapsed.as_secs_f64());

        tracing::info!(
            status = status,
            elapsed_ms = elapsed.as_millis() as u64,
            "Request completed"
        );

        let headers = response.headers_mut();
        if let Ok(value) = HeaderValue::from_str(&trace_id) {
            headers.insert("x-trace-id", value);
        }
        if let Ok(value) = HeaderValue::from_str(&current_request_id()) {
            headers.insert("x-request-id", value);
        }

        response
    }
    .instrument(span);

    REQUEST_ID.scope(request_id, tracked).await
}

/// 从请求头中提取或生成 trace_id
fn extract_or_generate_trace_id(headers: &HeaderMap) -> String {
    headers
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty() && s.len() <= 128)
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}
