//! 数据模型模块

pub mod auth;
pub mod cart;
pub mod category;
pub mod order;
pub mod product;
pub mod user;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::config::{AppConfig, PaginationConfig};
use crate::error::AppError;
use crate::validation::{check_page_size, FieldErrors, Payload};

fn amount_overflow() -> AppError {
    AppError::bad_request("Amount exceeds the supported range")
}

/// 单价 × 数量（分），溢出时返回 400
pub fn line_amount(unit_price: i64, quantity: i32) -> Result<i64, AppError> {
    unit_price
        .checked_mul(i64::from(quantity))
        .ok_or_else(amount_overflow)
}

/// 金额求和，溢出时返回 400
pub fn sum_amounts<I>(amounts: I) -> Result<i64, AppError>
where
    I: IntoIterator<Item = i64>,
{
    amounts
        .into_iter()
        .try_fold(0i64, |acc, amount| acc.checked_add(amount))
        .ok_or_else(amount_overflow)
}

/// 按百分比计算并四舍五入，溢出时返回 400
pub fn percent_of(amount: i64, percent: i64) -> Result<i64, AppError> {
    amount
        .checked_mul(percent)
        .and_then(|v| v.checked_add(50))
        .map(|v| v / 100)
        .ok_or_else(amount_overflow)
}

/// 仅含分页参数的查询
#[derive(Debug, Default, Deserialize, Validate)]
pub struct PageQuery {
    #[validate(range(min = 1))]
    pub page: Option<u32>,

    #[validate(range(min = 1))]
    pub page_size: Option<u32>,
}

impl Payload for PageQuery {
    fn check_rules(&self, config: &AppConfig, errors: &mut FieldErrors) {
        check_page_size(self.page_size, &config.pagination, errors);
    }
}

/// 已解析的分页参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    /// 缺省值取自配置，每页条数不超过上限
    pub fn resolve(page: Option<u32>, page_size: Option<u32>, config: &PaginationConfig) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            page_size: page_size
                .unwrap_or(config.default_page_size)
                .clamp(1, config.max_page_size),
        }
    }

    pub fn limit(&self) -> i64 {
        self.page_size as i64
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.page_size as i64
    }
}

/// 分页响应
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
    pub pages: i64,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total: i64, page: PageRequest) -> Self {
        let size = page.page_size as i64;
        Self {
            items,
            total,
            page: page.page,
            page_size: page.page_size,
            pages: (total + size - 1) / size,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
            pages: self.pages,
        }
    }
}
