//! 购物车的 HTTP 处理器，所有操作都作用于当前用户的活动购物车

use crate::{
    auth::Principal, error::AppError, middleware::AppState, models::cart::*,
    validation::ValidatedJson,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

pub async fn get_cart(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.cart_service.get(principal.id).await?))
}

pub async fn get_summary(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.cart_service.summary(principal.id).await?))
}

pub async fn validate_cart(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.cart_service.validate(principal.id).await?))
}

pub async fn add_item(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    ValidatedJson(req): ValidatedJson<AddCartItemRequest>,
) -> Result<impl IntoResponse, AppError> {
    let cart = state.cart_service.add_item(principal.id, req).await?;

    Ok((StatusCode::CREATED, Json(cart)))
}

pub async fn update_item(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(item_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateCartItemRequest>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(
        state
            .cart_service
            .update_item(principal.id, item_id, req)
            .await?,
    ))
}

pub async fn remove_item(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(item_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.cart_service.remove_item(principal.id, item_id).await?))
}

pub async fn clear_cart(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> Result<impl IntoResponse, AppError> {
    state.cart_service.clear(principal.id).await?;

    Ok(StatusCode::NO_CONTENT)
}
