//! 请求校验
//! 声明式规则（validator derive）+ 跨字段/依赖配置的业务规则，
//! 所有字段错误收集完毕后一次性返回

use std::{borrow::Cow, fmt, sync::Arc};

use axum::{
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
    Json,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{de::DeserializeOwned, Serialize};
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::{
    config::{AppConfig, PaginationConfig, SecurityConfig},
    error::AppError,
    middleware::AppState,
};

static SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("slug pattern is valid"));

/// 单个字段的校验错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub constraint: String,
    pub message: String,
}

/// 一次校验收集到的全部字段错误
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, constraint: &str, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.to_string(),
            constraint: constraint.to_string(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    pub fn merge(&mut self, other: FieldErrors) {
        self.0.extend(other.0);
    }

    /// 按字段名排序后输出，保证响应稳定
    pub fn into_vec(mut self) -> Vec<FieldError> {
        self.0.sort_by(|a, b| a.field.cmp(&b.field).then(a.constraint.cmp(&b.constraint)));
        self.0
    }

    pub fn into_result(self) -> Result<(), AppError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.0.iter().map(|e| e.field.as_str()).collect();
        write!(f, "{} invalid field(s): {}", self.0.len(), fields.join(", "))
    }
}

impl From<ValidationErrors> for FieldErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut out = FieldErrors::default();
        flatten("", &errors, &mut out);
        out
    }
}

/// 嵌套结构与列表展开为 `shipping.city`、`items[0].quantity` 形式的路径
fn flatten(prefix: &str, errors: &ValidationErrors, out: &mut FieldErrors) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };

        match kind {
            ValidationErrorsKind::Field(list) => {
                for error in list {
                    out.add(&path, error.code.as_ref(), describe(error));
                }
            }
            ValidationErrorsKind::Struct(inner) => flatten(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    flatten(&format!("{}[{}]", path, index), inner, out);
                }
            }
        }
    }
}

/// 没有自定义消息时，根据规则参数生成可读描述
fn describe(error: &ValidationError) -> String {
    if let Some(message) = &error.message {
        return message.to_string();
    }

    let param = |name: &str| error.params.get(name).map(|v| v.to_string());

    match error.code.as_ref() {
        "length" => match (param("min"), param("max")) {
            (Some(min), Some(max)) => format!("length must be between {} and {}", min, max),
            (Some(min), None) => format!("must be at least {} characters", min),
            (None, Some(max)) => format!("must be at most {} characters", max),
            _ => "has an invalid length".to_string(),
        },
        "range" => match (param("min"), param("max")) {
            (Some(min), Some(max)) => format!("must be between {} and {}", min, max),
            (Some(min), None) => format!("must be greater than or equal to {}", min),
            (None, Some(max)) => format!("must be less than or equal to {}", max),
            _ => match (param("exclusive_min"), param("exclusive_max")) {
                (Some(min), _) => format!("must be greater than {}", min),
                (None, Some(max)) => format!("must be less than {}", max),
                _ => "is out of range".to_string(),
            },
        },
        "email" => "must be a valid email address".to_string(),
        _ => "is invalid".to_string(),
    }
}

/// 请求体/查询参数的校验入口
///
/// 静态规则由 `#[validate(...)]` 声明；需要比较多个字段或读取配置的规则
/// 放在 `check_rules` 中，两者的错误合并后返回。
pub trait Payload: Validate {
    fn check_rules(&self, _config: &AppConfig, _errors: &mut FieldErrors) {}
}

/// 校验载荷，收集所有字段错误
pub fn check<T: Payload>(payload: &T, config: &AppConfig) -> Result<(), AppError> {
    let mut errors = match payload.validate() {
        Ok(()) => FieldErrors::default(),
        Err(e) => FieldErrors::from(e),
    };
    payload.check_rules(config, &mut errors);
    errors.into_result()
}

/// 密码策略
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub require_uppercase: bool,
    pub require_digit: bool,
    pub require_special: bool,
}

impl PasswordPolicy {
    pub fn from_config(security: &SecurityConfig) -> Self {
        Self {
            min_length: security.password_min_length,
            require_uppercase: security.password_require_uppercase,
            require_digit: security.password_require_digit,
            require_special: security.password_require_special,
        }
    }

    /// 返回所有不满足的规则 (constraint, message)
    pub fn violations(&self, password: &str) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();

        if password.chars().count() < self.min_length {
            out.push((
                "length",
                format!("must be at least {} characters", self.min_length),
            ));
        }

        if self.require_uppercase && !password.chars().any(|c| c.is_uppercase()) {
            out.push((
                "uppercase",
                "must contain at least one uppercase letter".to_string(),
            ));
        }

        if self.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            out.push(("digit", "must contain at least one digit".to_string()));
        }

        if self.require_special && !password.chars().any(|c| !c.is_alphanumeric()) {
            out.push((
                "special",
                "must contain at least one special character".to_string(),
            ));
        }

        out
    }

    pub fn check(&self, field: &str, password: &str, errors: &mut FieldErrors) {
        for (constraint, message) in self.violations(password) {
            errors.add(field, constraint, message);
        }
    }
}

/// 校验每页条数不超过配置上限
pub fn check_page_size(page_size: Option<u32>, config: &PaginationConfig, errors: &mut FieldErrors) {
    if let Some(size) = page_size {
        if size > config.max_page_size {
            errors.add(
                "page_size",
                "range",
                format!("must be less than or equal to {}", config.max_page_size),
            );
        }
    }
}

pub fn validate_slug(value: &str) -> Result<(), ValidationError> {
    if SLUG_RE.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::new("slug").with_message(Cow::Borrowed(
            "must contain only lowercase letters, digits and single hyphens",
        )))
    }
}

pub fn validate_alphanumeric(value: &str) -> Result<(), ValidationError> {
    if value.chars().all(|c| c.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        Err(ValidationError::new("alphanumeric")
            .with_message(Cow::Borrowed("must contain only letters and digits")))
    }
}

pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new("blank").with_message(Cow::Borrowed("must not be blank")))
    } else {
        Ok(())
    }
}

/// 先反序列化再校验的 JSON 提取器
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

impl<T> FromRequest<Arc<AppState>> for ValidatedJson<T>
where
    T: DeserializeOwned + Payload + Send,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|rejection| {
            AppError::invalid_field("body", "parse", &rejection.body_text())
        })?;

        check(&value, &state.config)?;
        Ok(ValidatedJson(value))
    }
}

/// 先反序列化再校验的查询参数提取器
#[derive(Debug)]
pub struct ValidatedQuery<T>(pub T);

impl<T> FromRequestParts<Arc<AppState>> for ValidatedQuery<T>
where
    T: DeserializeOwned + Payload + Send,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                AppError::invalid_field("query", "parse", &rejection.body_text())
            })?;

        check(&value, &state.config)?;
        Ok(ValidatedQuery(value))
    }
}
