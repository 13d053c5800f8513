//! 商品相关的 HTTP 处理器

use crate::{
    auth::AdminPrincipal,
    error::AppError,
    middleware::AppState,
    models::{product::*, PageQuery},
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

/// 搜索商品
pub async fn search_products(
    State(state): State<Arc<AppState>>,
    ValidatedQuery(query): ValidatedQuery<ProductSearchQuery>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.product_service.search(&query).await?))
}

pub async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let product = state.product_service.get(id).await?;

    Ok(Json(ProductResponse::from(product)))
}

pub async fn get_product_by_slug(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let product = state.product_service.get_by_slug(&slug).await?;

    Ok(Json(ProductResponse::from(product)))
}

/// 低库存商品
pub async fn list_low_stock(
    State(state): State<Arc<AppState>>,
    _admin: AdminPrincipal,
    ValidatedQuery(query): ValidatedQuery<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = state
        .product_service
        .low_stock(query.page, query.page_size)
        .await?;

    Ok(Json(page))
}

pub async fn create_product(
    State(state): State<Arc<AppState>>,
    _admin: AdminPrincipal,
    ValidatedJson(req): ValidatedJson<CreateProductRequest>,
) -> Result<impl IntoResponse, AppError> {
    let product = state.product_service.create(req).await?;

    Ok((StatusCode::CREATED, Json(ProductResponse::from(product))))
}

pub async fn update_product(
    State(state): State<Arc<AppState>>,
    _admin: AdminPrincipal,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateProductRequest>,
) -> Result<impl IntoResponse, AppError> {
    let product = state.product_service.update(id, req).await?;

    Ok(Json(ProductResponse::from(product)))
}

/// 调整库存
pub async fn update_stock(
    State(state): State<Arc<AppState>>,
    _admin: AdminPrincipal,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<StockUpdateRequest>,
) -> Result<impl IntoResponse, AppError> {
    let product = state.product_service.update_stock(id, req).await?;

    Ok(Json(ProductResponse::from(product)))
}

pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    _admin: AdminPrincipal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.product_service.delete(id).await?;

    Ok(StatusCode::NO_CONTENT)
}
