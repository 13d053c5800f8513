//! 认证服务：注册、登录、令牌刷新

use crate::{
    auth::{
        jwt::{JwtService, TokenKind, TokenPair},
        password::PasswordHasher,
    },
    error::AppError,
    models::{auth::*, user::*},
    repository::CredentialStore,
};
use std::sync::Arc;

pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    hasher: Arc<PasswordHasher>,
    jwt_service: Arc<JwtService>,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: Arc<PasswordHasher>,
        jwt_service: Arc<JwtService>,
    ) -> Self {
        Self {
            store,
            hasher,
            jwt_service,
        }
    }

    /// 自助注册，总是创建普通用户
    pub async fn register(&self, req: RegisterRequest) -> Result<User, AppError> {
        let email = req.email.trim().to_lowercase();

        // 先查重以返回明确的冲突原因；并发插入由唯一约束兜底
        if self.store.find_by_email(&email).await?.is_some() {
            return Err(AppError::conflict("Email already registered"));
        }
        if self.store.find_by_username(&req.username).await?.is_some() {
            return Err(AppError::conflict("Username already taken"));
        }

        let password_hash = self.hasher.hash_blocking(req.password).await?;

        let user = self
            .store
            .create(NewUser {
                email,
                username: req.username,
                first_name: req.first_name.trim().to_string(),
                last_name: req.last_name.trim().to_string(),
                password_hash,
                role: Role::User,
                is_active: true,
            })
            .await?;

        tracing::info!(user_id = %user.id, username = %user.username, "User registered");

        Ok(user)
    }

    /// 用户登录
    ///
    /// 用户不存在与密码错误返回同一个错误，且都执行一次完整的哈希校验。
    pub async fn login(&self, req: LoginRequest) -> Result<TokenPair, AppError> {
        let identifier = req.username.trim();

        let user = match self.store.find_by_identifier(identifier).await? {
            Some(user) => {
                let matched = self
                    .hasher
                    .verify_blocking(req.password, user.password_hash.clone())
                    .await?;
                matched.then_some(user)
            }
            None => {
                self.hasher.verify_dummy_blocking(req.password).await?;
                None
            }
        };

        let Some(user) = user else {
            tracing::warn!("Login failed: invalid credentials");
            return Err(AppError::InvalidCredentials);
        };

        if !user.is_active {
            tracing::warn!(user_id = %user.id, "Login rejected: account disabled");
            return Err(AppError::AccountDisabled);
        }

        let tokens = self.jwt_service.issue_pair(&user.id, user.role)?;

        tracing::info!(user_id = %user.id, "User logged in");

        Ok(tokens)
    }

    /// 用刷新令牌换取新的令牌对（刷新令牌随之轮换）
    pub async fn refresh(&self, req: RefreshTokenRequest) -> Result<TokenPair, AppError> {
        let claims = self
            .jwt_service
            .validate_kind(&req.refresh_token, TokenKind::Refresh)?;
        let user_id = claims.user_id()?;

        let user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !user.is_active {
            return Err(AppError::AccountDisabled);
        }

        // 角色以存储中的当前值为准
        self.jwt_service.issue_pair(&user.id, user.role)
    }
}
