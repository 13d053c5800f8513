//! Category domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::AppConfig,
    validation::{check_page_size, validate_not_blank, validate_slug, FieldErrors, Payload},
};

/// 商品分类，可通过 parent_id 组成树
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 2, max = 100), custom(function = "validate_not_blank"))]
    pub name: String,

    #[validate(length(min = 1, max = 120), custom(function = "validate_slug"))]
    pub slug: String,

    #[validate(length(max = 1000))]
    pub description: Option<String>,

    pub parent_id: Option<Uuid>,

    #[validate(length(max = 500))]
    pub image_url: Option<String>,

    #[serde(default = "default_true")]
    pub is_active: bool,

    #[serde(default)]
    #[validate(range(min = 0))]
    pub sort_order: i32,
}

fn default_true() -> bool {
    true
}

impl Payload for CreateCategoryRequest {}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 2, max = 100), custom(function = "validate_not_blank"))]
    pub name: Option<String>,

    #[validate(length(min = 1, max = 120), custom(function = "validate_slug"))]
    pub slug: Option<String>,

    #[validate(length(max = 1000))]
    pub description: Option<String>,

    pub parent_id: Option<Uuid>,

    #[validate(length(max = 500))]
    pub image_url: Option<String>,

    pub is_active: Option<bool>,

    #[validate(range(min = 0))]
    pub sort_order: Option<i32>,
}

impl Payload for UpdateCategoryRequest {}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct CategoryListQuery {
    #[validate(range(min = 1))]
    pub page: Option<u32>,

    #[validate(range(min = 1))]
    pub page_size: Option<u32>,

    /// 默认只返回启用的分类
    pub active_only: Option<bool>,
}

impl Payload for CategoryListQuery {
    fn check_rules(&self, config: &AppConfig, errors: &mut FieldErrors) {
        check_page_size(self.page_size, &config.pagination, errors);
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct DeleteCategoryQuery {
    #[serde(default)]
    pub force: bool,
}

impl Payload for DeleteCategoryQuery {}
