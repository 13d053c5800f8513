//! 分类相关的 HTTP 处理器

use crate::{
    auth::AdminPrincipal,
    error::AppError,
    middleware::AppState,
    models::category::*,
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

pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    ValidatedQuery(query): ValidatedQuery<CategoryListQuery>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.category_service.list(&query).await?))
}

pub async fn get_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.category_service.get(id).await?))
}

/// 直接子分类
pub async fn list_subcategories(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.category_service.subcategories(id).await?))
}

pub async fn create_category(
    State(state): State<Arc<AppState>>,
    _admin: AdminPrincipal,
    ValidatedJson(req): ValidatedJson<CreateCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    let category = state.category_service.create(req).await?;

    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    State(state): State<Arc<AppState>>,
    _admin: AdminPrincipal,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.category_service.update(id, req).await?))
}

/// 删除分类，`?force=true` 时连同商品一起删除
pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    _admin: AdminPrincipal,
    Path(id): Path<Uuid>,
    ValidatedQuery(query): ValidatedQuery<DeleteCategoryQuery>,
) -> Result<impl IntoResponse, AppError> {
    state.category_service.delete(id, query.force).await?;

    Ok(StatusCode::NO_CONTENT)
}
