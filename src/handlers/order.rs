//! 订单相关的 HTTP 处理器

use crate::{
    auth::{AdminPrincipal, Principal},
    error::AppError,
    middleware::AppState,
    models::order::*,
    validation::{ValidatedJson, ValidatedQuery},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

/// 购物车结算下单
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    ValidatedJson(req): ValidatedJson<CheckoutRequest>,
) -> Result<impl IntoResponse, AppError> {
    let order = state
        .order_service
        .create_from_cart(principal.id, req)
        .await?;

    Ok((StatusCode::CREATED, Json(order)))
}

/// 直接下单
pub async fn create_direct_order(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    ValidatedJson(req): ValidatedJson<DirectOrderRequest>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.order_service.create_direct(principal.id, req).await?;

    Ok((StatusCode::CREATED, Json(order)))
}

/// 本人订单
pub async fn list_my_orders(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    ValidatedQuery(query): ValidatedQuery<OrderListQuery>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.order_service.list_mine(principal.id, &query).await?))
}

pub async fn get_order(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.order_service.get(&principal, id).await?))
}

pub async fn cancel_order(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.order_service.cancel(&principal, id).await?))
}

/// 全部订单（管理员）
pub async fn list_all_orders(
    State(state): State<Arc<AppState>>,
    _admin: AdminPrincipal,
    ValidatedQuery(query): ValidatedQuery<OrderListQuery>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.order_service.list_all(&query).await?))
}

pub async fn update_order_status(
    State(state): State<Arc<AppState>>,
    _admin: AdminPrincipal,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateOrderStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.order_service.update_status(id, req.status).await?))
}

pub async fn update_payment_status(
    State(state): State<Arc<AppState>>,
    _admin: AdminPrincipal,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdatePaymentStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(
        state
            .order_service
            .update_payment_status(id, req.payment_status)
            .await?,
    ))
}

pub async fn order_stats(
    State(state): State<Arc<AppState>>,
    _admin: AdminPrincipal,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.order_service.stats().await?))
}
