//! User domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::AppConfig,
    validation::{
        check_page_size, validate_alphanumeric, validate_not_blank, FieldErrors, Payload,
        PasswordPolicy,
    },
};

/// 用户角色，`User < Admin`，管理员满足所有角色要求
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    /// 当前角色是否满足要求的角色
    pub fn satisfies(self, required: Role) -> bool {
        self >= required
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// User account
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,

    #[serde(skip_serializing)]
    pub password_hash: String,

    pub role: Role,
    pub is_active: bool,

    // Profile
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 新建账户所需字段（已完成哈希）
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
}

/// 注册请求
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 3, max = 50), custom(function = "validate_alphanumeric"))]
    pub username: String,

    #[validate(length(min = 1, max = 100), custom(function = "validate_not_blank"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 100), custom(function = "validate_not_blank"))]
    pub last_name: String,

    #[validate(length(max = 128))]
    pub password: String,
}

impl Payload for RegisterRequest {
    fn check_rules(&self, config: &AppConfig, errors: &mut FieldErrors) {
        PasswordPolicy::from_config(&config.security).check("password", &self.password, errors);
    }
}

/// 管理员创建用户请求
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 3, max = 50), custom(function = "validate_alphanumeric"))]
    pub username: String,

    #[validate(length(min = 1, max = 100), custom(function = "validate_not_blank"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 100), custom(function = "validate_not_blank"))]
    pub last_name: String,

    #[validate(length(max = 128))]
    pub password: String,

    #[serde(default = "default_role")]
    pub role: Role,

    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_role() -> Role {
    Role::User
}

fn default_active() -> bool {
    true
}

impl Payload for CreateUserRequest {
    fn check_rules(&self, config: &AppConfig, errors: &mut FieldErrors) {
        PasswordPolicy::from_config(&config.security).check("password", &self.password, errors);
    }
}

/// Update user request（未提供的字段保持不变）
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(email)]
    pub email: Option<String>,

    #[validate(length(min = 3, max = 50), custom(function = "validate_alphanumeric"))]
    pub username: Option<String>,

    #[validate(length(min = 1, max = 100), custom(function = "validate_not_blank"))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, max = 100), custom(function = "validate_not_blank"))]
    pub last_name: Option<String>,

    #[validate(length(max = 20))]
    pub phone: Option<String>,

    #[validate(length(max = 500))]
    pub address: Option<String>,

    #[validate(length(max = 100))]
    pub city: Option<String>,

    #[validate(length(max = 100))]
    pub country: Option<String>,

    #[validate(length(max = 20))]
    pub postal_code: Option<String>,
}

impl Payload for UpdateUserRequest {}

/// Change password request
#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1))]
    pub current_password: String,

    #[validate(length(max = 128))]
    pub new_password: String,
}

impl Payload for ChangePasswordRequest {
    fn check_rules(&self, config: &AppConfig, errors: &mut FieldErrors) {
        PasswordPolicy::from_config(&config.security).check(
            "new_password",
            &self.new_password,
            errors,
        );
    }
}

/// 修改角色请求
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRoleRequest {
    pub role: Role,
}

impl Payload for UpdateRoleRequest {}

/// 用户列表查询参数
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UserListQuery {
    #[validate(range(min = 1))]
    pub page: Option<u32>,

    #[validate(range(min = 1))]
    pub page_size: Option<u32>,

    pub role: Option<Role>,

    pub is_active: Option<bool>,
}

impl Payload for UserListQuery {
    fn check_rules(&self, config: &AppConfig, errors: &mut FieldErrors) {
        check_page_size(self.page_size, &config.pagination, errors);
    }
}

/// User response (without sensitive data)
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub role: Role,
    pub is_active: bool,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            full_name: format!("{} {}", user.first_name, user.last_name),
            email: user.email,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
            is_active: user.is_active,
            phone: user.phone,
            address: user.address,
            city: user.city,
            country: user.country,
            postal_code: user.postal_code,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_ordering() {
        assert!(Role::User < Role::Admin);
        assert!(Role::Admin.satisfies(Role::User));
        assert!(Role::Admin.satisfies(Role::Admin));
        assert!(Role::User.satisfies(Role::User));
        assert!(!Role::User.satisfies(Role::Admin));
    }

    #[test]
    fn test_role_serde_is_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        let role: Role = serde_json::from_str("\"user\"").unwrap();
        assert_eq!(role, Role::User);
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            email: "a@example.com".to_string(),
            username: "alice".to_string(),
            first_name: "Alice".to_string(),
            last_name: "Doe".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            role: Role::User,
            is_active: true,
            phone: None,
            address: None,
            city: None,
            country: None,
            postal_code: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(!json.contains("password_hash"));

        let response = serde_json::to_value(UserResponse::from(user)).unwrap();
        assert_eq!(response["full_name"], "Alice Doe");
        assert!(response.get("password_hash").is_none());
    }
}
