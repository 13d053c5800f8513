//! Cart domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    models::{line_amount, sum_amounts},
    validation::Payload,
};

/// 单行最大购买数量
pub const MAX_LINE_QUANTITY: i32 = 1000;

/// 每个用户最多一个活动购物车
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Cart {
    pub id: Uuid,
    pub user_id: Uuid,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CartItem {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    /// 加入购物车时的单价快照
    pub unit_price: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 购物车行，连同商品当前状态一起查询
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CartLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_sku: String,
    pub product_slug: String,
    pub quantity: i32,
    pub unit_price: i64,
    pub stock_quantity: i32,
    pub product_active: bool,
}

impl CartLine {
    pub fn line_total(&self) -> Result<i64, AppError> {
        line_amount(self.unit_price, self.quantity)
    }

    /// 检查该行是否可以下单
    pub fn issue(&self) -> Option<CartIssue> {
        let reason = if !self.product_active {
            "product is no longer available"
        } else if self.quantity > self.stock_quantity {
            "insufficient stock"
        } else {
            return None;
        };

        Some(CartIssue {
            item_id: self.id,
            product_id: self.product_id,
            product_name: self.product_name.clone(),
            requested: self.quantity,
            available: self.stock_quantity.max(0),
            reason: reason.to_string(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct CartLineResponse {
    #[serde(flatten)]
    pub line: CartLine,
    pub line_total: i64,
}

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub id: Uuid,
    pub items: Vec<CartLineResponse>,
    pub total_items: i64,
    pub total_amount: i64,
}

impl CartResponse {
    pub fn new(cart: &Cart, lines: Vec<CartLine>) -> Result<Self, AppError> {
        let summary = CartSummary::from_lines(&lines)?;
        let items = lines
            .into_iter()
            .map(|line| {
                Ok(CartLineResponse {
                    line_total: line.line_total()?,
                    line,
                })
            })
            .collect::<Result<Vec<_>, AppError>>()?;

        Ok(Self {
            id: cart.id,
            items,
            total_items: summary.total_items,
            total_amount: summary.total_amount,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartSummary {
    /// 所有行的件数之和
    pub total_items: i64,
    pub total_amount: i64,
    /// 行数
    pub items_count: i64,
}

impl CartSummary {
    pub fn from_lines(lines: &[CartLine]) -> Result<Self, AppError> {
        let line_totals = lines
            .iter()
            .map(CartLine::line_total)
            .collect::<Result<Vec<_>, AppError>>()?;

        Ok(Self {
            total_items: lines.iter().map(|l| i64::from(l.quantity)).sum(),
            total_amount: sum_amounts(line_totals)?,
            items_count: lines.len() as i64,
        })
    }
}

/// 下单前校验发现的问题行
#[derive(Debug, Clone, Serialize)]
pub struct CartIssue {
    pub item_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub requested: i32,
    pub available: i32,
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct CartValidation {
    pub valid: bool,
    pub issues: Vec<CartIssue>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddCartItemRequest {
    pub product_id: Uuid,

    #[validate(range(min = 1, max = 1000))]
    pub quantity: i32,
}

impl Payload for AddCartItemRequest {}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCartItemRequest {
    #[validate(range(min = 1, max = 1000))]
    pub quantity: i32,
}

impl Payload for UpdateCartItemRequest {}
