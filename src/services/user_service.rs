//! 用户管理服务

use std::sync::Arc;

use secrecy::ExposeSecret;
use uuid::Uuid;

use crate::{
    auth::{password::PasswordHasher, Principal},
    config::{AppConfig, BootstrapConfig},
    error::AppError,
    models::{user::*, PageRequest, Paginated},
    repository::{CredentialStore, UserFilter},
    validation::PasswordPolicy,
};

pub struct UserService {
    store: Arc<dyn CredentialStore>,
    hasher: Arc<PasswordHasher>,
    config: Arc<AppConfig>,
}

impl UserService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: Arc<PasswordHasher>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            store,
            hasher,
            config,
        }
    }

    pub async fn list(&self, query: &UserListQuery) -> Result<Paginated<UserResponse>, AppError> {
        let page = PageRequest::resolve(query.page, query.page_size, &self.config.pagination);
        let filter = UserFilter {
            role: query.role,
            is_active: query.is_active,
        };

        let users = self.store.list(filter, page.limit(), page.offset()).await?;
        let total = self.store.count(filter).await?;

        Ok(Paginated::new(users, total, page).map(UserResponse::from))
    }

    pub async fn get(&self, id: Uuid) -> Result<User, AppError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))
    }

    /// 邮箱/用户名不能被其他账户占用
    async fn ensure_unique(
        &self,
        email: Option<&str>,
        username: Option<&str>,
        exclude: Option<Uuid>,
    ) -> Result<(), AppError> {
        if let Some(email) = email {
            if let Some(existing) = self.store.find_by_email(email).await? {
                if Some(existing.id) != exclude {
                    return Err(AppError::conflict("Email already registered"));
                }
            }
        }

        if let Some(username) = username {
            if let Some(existing) = self.store.find_by_username(username).await? {
                if Some(existing.id) != exclude {
                    return Err(AppError::conflict("Username already taken"));
                }
            }
        }

        Ok(())
    }

    /// 管理员创建用户，可指定角色
    pub async fn create(&self, actor: &Principal, req: CreateUserRequest) -> Result<User, AppError> {
        let email = req.email.trim().to_lowercase();
        self.ensure_unique(Some(&email), Some(&req.username), None)
            .await?;

        let password_hash = self.hasher.hash_blocking(req.password).await?;

        let user = self
            .store
            .create(NewUser {
                email,
                username: req.username,
                first_name: req.first_name.trim().to_string(),
                last_name: req.last_name.trim().to_string(),
                password_hash,
                role: req.role,
                is_active: req.is_active,
            })
            .await?;

        tracing::info!(
            user_id = %user.id,
            role = %user.role,
            created_by = %actor.id,
            "User created"
        );

        Ok(user)
    }

    pub async fn update(&self, id: Uuid, mut req: UpdateUserRequest) -> Result<User, AppError> {
        req.email = req.email.map(|e| e.trim().to_lowercase());
        self.ensure_unique(req.email.as_deref(), req.username.as_deref(), Some(id))
            .await?;

        self.store
            .update(id, &req)
            .await?
            .ok_or_else(|| AppError::not_found("User"))
    }

    /// 修改本人密码，需要校验当前密码
    pub async fn change_password(
        &self,
        user_id: Uuid,
        req: ChangePasswordRequest,
    ) -> Result<(), AppError> {
        let user = self.get(user_id).await?;

        let matched = self
            .hasher
            .verify_blocking(req.current_password.clone(), user.password_hash)
            .await?;
        if !matched {
            return Err(AppError::invalid_field(
                "current_password",
                "mismatch",
                "current password is incorrect",
            ));
        }

        if req.current_password == req.new_password {
            return Err(AppError::invalid_field(
                "new_password",
                "unchanged",
                "must differ from the current password",
            ));
        }

        let password_hash = self.hasher.hash_blocking(req.new_password).await?;
        self.store.update_password(user_id, &password_hash).await?;

        tracing::info!(user_id = %user_id, "Password changed");

        Ok(())
    }

    /// 启用/停用账户；管理员不能停用自己
    pub async fn set_active(
        &self,
        actor: &Principal,
        id: Uuid,
        is_active: bool,
    ) -> Result<User, AppError> {
        if actor.id == id && !is_active {
            return Err(AppError::bad_request("Cannot deactivate your own account"));
        }

        let user = self
            .store
            .set_active(id, is_active)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;

        tracing::info!(user_id = %id, is_active, changed_by = %actor.id, "Account status changed");

        Ok(user)
    }

    /// 修改角色；管理员不能修改自己的角色
    pub async fn set_role(&self, actor: &Principal, id: Uuid, role: Role) -> Result<User, AppError> {
        if actor.id == id {
            return Err(AppError::bad_request("Cannot change your own role"));
        }

        let user = self
            .store
            .set_role(id, role)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;

        tracing::info!(user_id = %id, role = %role, changed_by = %actor.id, "Role changed");

        Ok(user)
    }

    pub async fn delete(&self, actor: &Principal, id: Uuid) -> Result<(), AppError> {
        if actor.id == id {
            return Err(AppError::bad_request("Cannot delete your own account"));
        }

        if !self.store.delete(id).await? {
            return Err(AppError::not_found("User"));
        }

        tracing::info!(user_id = %id, deleted_by = %actor.id, "User deleted");

        Ok(())
    }

    /// 确保引导管理员账户存在且为启用的管理员
    pub async fn ensure_bootstrap_admin(&self, bootstrap: &BootstrapConfig) -> Result<(), AppError> {
        let (Some(email), Some(password)) = (&bootstrap.admin_email, &bootstrap.admin_password)
        else {
            return Ok(());
        };
        let email = email.trim().to_lowercase();

        if let Some(existing) = self.store.find_by_email(&email).await? {
            if existing.role != Role::Admin {
                self.store.set_role(existing.id, Role::Admin).await?;
            }
            if !existing.is_active {
                self.store.set_active(existing.id, true).await?;
            }
            tracing::info!(user_id = %existing.id, "Bootstrap admin already present");
            return Ok(());
        }

        let violations = PasswordPolicy::from_config(&self.config.security)
            .violations(password.expose_secret());
        if !violations.is_empty() {
            return Err(AppError::Config(
                "bootstrap.admin_password does not satisfy the password policy".to_string(),
            ));
        }

        let username = bootstrap
            .admin_username
            .clone()
            .unwrap_or_else(|| "admin".to_string());
        let password_hash = self
            .hasher
            .hash_blocking(password.expose_secret().clone())
            .await?;

        let user = self
            .store
            .create(NewUser {
                email,
                username,
                first_name: "Admin".to_string(),
                last_name: "User".to_string(),
                password_hash,
                role: Role::Admin,
                is_active: true,
            })
            .await?;

        tracing::info!(user_id = %user.id, "Bootstrap admin created");

        Ok(())
    }
}
