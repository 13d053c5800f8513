//! 授权网关
//! 访问令牌 -> Principal（以存储中的当前账户状态为准）-> 角色检查

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::{
    auth::jwt::{JwtService, TokenKind},
    error::AppError,
    models::user::{Role, User},
    repository::CredentialStore,
};

/// 已认证的请求主体
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
}

impl Principal {
    /// 要求至少具备指定角色
    pub fn require(&self, required: Role) -> Result<(), AppError> {
        AuthGate::authorize(self, required)
    }

    pub fn is_admin(&self) -> bool {
        self.role.satisfies(Role::Admin)
    }

    /// 本人或管理员
    pub fn require_self_or_admin(&self, owner_id: Uuid) -> Result<(), AppError> {
        if self.id == owner_id || self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            is_active: user.is_active,
        }
    }
}

pub struct AuthGate {
    jwt_service: Arc<JwtService>,
    store: Arc<dyn CredentialStore>,
}

impl AuthGate {
    pub fn new(jwt_service: Arc<JwtService>, store: Arc<dyn CredentialStore>) -> Self {
        Self { jwt_service, store }
    }

    /// 校验访问令牌并解析出 Principal
    ///
    /// 角色与启用状态取自存储中的当前记录，而不是令牌签发时的快照，
    /// 因此停用账户或降级角色对已签发的令牌立即生效。
    pub async fn authenticate(&self, token: &str) -> Result<Principal, AppError> {
        let claims = self.jwt_service.validate_kind(token, TokenKind::Access)?;
        let user_id = claims.user_id()?;

        let user = self.store.find_by_id(user_id).await?.ok_or_else(|| {
            tracing::debug!(user_id = %user_id, "Token subject no longer exists");
            AppError::Unauthorized
        })?;

        if !user.is_active {
            tracing::warn!(user_id = %user.id, "Disabled account presented a valid token");
            return Err(AppError::AccountDisabled);
        }

        Ok(Principal::from(&user))
    }

    /// 角色检查：`User < Admin`
    pub fn authorize(principal: &Principal, required: Role) -> Result<(), AppError> {
        if principal.role.satisfies(required) {
            Ok(())
        } else {
            tracing::warn!(
                user_id = %principal.id,
                role = %principal.role,
                required = %required,
                "Insufficient role"
            );
            Err(AppError::Forbidden)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: Role) -> Principal {
        Principal {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            role,
            is_active: true,
        }
    }

    #[test]
    fn test_user_forbidden_on_admin_operation() {
        let user = principal(Role::User);
        assert!(matches!(user.require(Role::Admin), Err(AppError::Forbidden)));
        assert!(user.require(Role::User).is_ok());
    }

    #[test]
    fn test_admin_passes_every_requirement() {
        let admin = principal(Role::Admin);
        assert!(admin.require(Role::User).is_ok());
        assert!(admin.require(Role::Admin).is_ok());
    }

    #[test]
    fn test_self_or_admin() {
        let user = principal(Role::User);
        assert!(user.require_self_or_admin(user.id).is_ok());
        assert!(matches!(
            user.require_self_or_admin(Uuid::new_v4()),
            Err(AppError::Forbidden)
        ));
        assert!(principal(Role::Admin).require_self_or_admin(Uuid::new_v4()).is_ok());
    }
}
