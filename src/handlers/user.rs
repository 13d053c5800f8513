//! 用户管理的 HTTP 处理器

use crate::{
    auth::{AdminPrincipal, Principal},
    error::AppError,
    middleware::AppState,
    models::user::*,
    validation::{ValidatedJson, ValidatedQuery},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// 列出用户
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    _admin: AdminPrincipal,
    ValidatedQuery(query): ValidatedQuery<UserListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = state.user_service.list(&query).await?;

    Ok(Json(page))
}

/// 创建用户
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    AdminPrincipal(principal): AdminPrincipal,
    ValidatedJson(req): ValidatedJson<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.user_service.create(&principal, req).await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// 获取本人资料
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> Result<impl IntoResponse, AppError> {
    let user = state.user_service.get(principal.id).await?;

    Ok(Json(UserResponse::from(user)))
}

/// 修改本人资料
pub async fn update_me(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    ValidatedJson(req): ValidatedJson<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.user_service.update(principal.id, req).await?;

    Ok(Json(UserResponse::from(user)))
}

/// 修改本人密码
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    ValidatedJson(req): ValidatedJson<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.user_service.change_password(principal.id, req).await?;

    Ok(Json(json!({"message": "Password updated"})))
}

/// 获取用户详情；普通用户只能查看自己
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    principal.require_self_or_admin(id)?;

    let user = state.user_service.get(id).await?;

    Ok(Json(UserResponse::from(user)))
}

/// 更新用户
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    _admin: AdminPrincipal,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.user_service.update(id, req).await?;

    Ok(Json(UserResponse::from(user)))
}

/// 修改角色
pub async fn update_role(
    State(state): State<Arc<AppState>>,
    AdminPrincipal(principal): AdminPrincipal,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.user_service.set_role(&principal, id, req.role).await?;

    Ok(Json(UserResponse::from(user)))
}

/// 启用用户
pub async fn activate_user(
    State(state): State<Arc<AppState>>,
    AdminPrincipal(principal): AdminPrincipal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.user_service.set_active(&principal, id, true).await?;

    Ok(Json(UserResponse::from(user)))
}

/// 停用用户
pub async fn deactivate_user(
    State(state): State<Arc<AppState>>,
    AdminPrincipal(principal): AdminPrincipal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.user_service.set_active(&principal, id, false).await?;

    Ok(Json(UserResponse::from(user)))
}

/// 删除用户
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    AdminPrincipal(principal): AdminPrincipal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.user_service.delete(&principal, id).await?;

    Ok(StatusCode::NO_CONTENT)
}
