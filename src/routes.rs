//! 路由注册
//! 创建所有 API 路由并应用中间件

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer, limit::RequestBodyLimitLayer, trace::TraceLayer,
};

use crate::{auth::require_auth, handlers, middleware::AppState};

/// 请求体上限
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// 创建应用路由
pub fn create_router(state: Arc<AppState>) -> Router {
    // 公开端点（健康检查）
    let health_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check));

    // 无需认证的 API
    let public_routes = Router::new()
        .route("/api/v1/auth/register", post(handlers::auth::register))
        .route("/api/v1/auth/login", post(handlers::auth::login))
        .route("/api/v1/auth/refresh", post(handlers::auth::refresh_token))
        // 商品目录只读接口
        .route("/api/v1/categories", get(handlers::category::list_categories))
        .route("/api/v1/categories/{id}", get(handlers::category::get_category))
        .route(
            "/api/v1/categories/{id}/subcategories",
            get(handlers::category::list_subcategories),
        )
        .route("/api/v1/products", get(handlers::product::search_products))
        .route("/api/v1/products/{id}", get(handlers::product::get_product))
        .route(
            "/api/v1/products/slug/{slug}",
            get(handlers::product::get_product_by_slug),
        );

    // 需要认证的路由；管理员接口在 handler 中通过 AdminPrincipal 检查角色
    let authenticated_routes = Router::new()
        .route("/api/v1/auth/me", get(handlers::auth::get_current_user))
        // 用户
        .route(
            "/api/v1/users",
            get(handlers::user::list_users).post(handlers::user::create_user),
        )
        .route(
            "/api/v1/users/me",
            get(handlers::user::get_me).put(handlers::user::update_me),
        )
        .route(
            "/api/v1/users/me/password",
            put(handlers::user::change_password),
        )
        .route(
            "/api/v1/users/{id}",
            get(handlers::user::get_user)
                .put(handlers::user::update_user)
                .delete(handlers::user::delete_user),
        )
        .route("/api/v1/users/{id}/role", put(handlers::user::update_role))
        .route(
            "/api/v1/users/{id}/activate",
            post(handlers::user::activate_user),
        )
        .route(
            "/api/v1/users/{id}/deactivate",
            post(handlers::user::deactivate_user),
        )
        // 分类管理
        .route(
            "/api/v1/categories",
            post(handlers::category::create_category),
        )
        .route(
            "/api/v1/categories/{id}",
            put(handlers::category::update_category).delete(handlers::category::delete_category),
        )
        // 商品管理
        .route("/api/v1/products", post(handlers::product::create_product))
        .route(
            "/api/v1/products/low-stock",
            get(handlers::product::list_low_stock),
        )
        .route(
            "/api/v1/products/{id}",
            put(handlers::product::update_product).delete(handlers::product::delete_product),
        )
        .route(
            "/api/v1/products/{id}/stock",
            put(handlers::product::update_stock),
        )
        // 购物车
        .route(
            "/api/v1/cart",
            get(handlers::cart::get_cart).delete(handlers::cart::clear_cart),
        )
        .route("/api/v1/cart/summary", get(handlers::cart::get_summary))
        .route("/api/v1/cart/validate", get(handlers::cart::validate_cart))
        .route("/api/v1/cart/items", post(handlers::cart::add_item))
        .route(
            "/api/v1/cart/items/{item_id}",
            put(handlers::cart::update_item).delete(handlers::cart::remove_item),
        )
        // 订单
        .route(
            "/api/v1/orders",
            get(handlers::order::list_my_orders).post(handlers::order::create_order),
        )
        .route(
            "/api/v1/orders/direct",
            post(handlers::order::create_direct_order),
        )
        .route("/api/v1/orders/all", get(handlers::order::list_all_orders))
        .route("/api/v1/orders/stats", get(handlers::order::order_stats))
        .route("/api/v1/orders/{id}", get(handlers::order::get_order))
        .route(
            "/api/v1/orders/{id}/cancel",
            post(handlers::order::cancel_order),
        )
        .route(
            "/api/v1/orders/{id}/status",
            put(handlers::order::update_order_status),
        )
        .route(
            "/api/v1/orders/{id}/payment-status",
            put(handlers::order::update_payment_status),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    // 组合所有路由
    Router::new()
        .merge(health_routes)
        .merge(public_routes)
        .merge(authenticated_routes)
        .layer(CompressionLayer::new())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(
            crate::middleware::request_tracking_middleware,
        ))
        .with_state(state)
}
