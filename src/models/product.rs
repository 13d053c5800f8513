//! Product domain models
//!
//! 金额统一使用最小货币单位（分）存储为 i64。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::AppConfig,
    validation::{check_page_size, validate_not_blank, validate_slug, FieldErrors, Payload},
};

/// 默认低库存阈值
pub const DEFAULT_MIN_STOCK_LEVEL: i32 = 5;

/// 单价上限（分），与价格字段的校验规则一致
pub const MAX_PRICE: i64 = 10_000_000_000;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub sku: String,
    pub price: i64,
    pub sale_price: Option<i64>,
    pub cost_price: Option<i64>,
    pub stock_quantity: i32,
    pub min_stock_level: i32,
    pub category_id: Uuid,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub is_featured: bool,
    pub is_digital: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// 有促销价时取促销价
    pub fn current_price(&self) -> i64 {
        self.sale_price.unwrap_or(self.price)
    }

    pub fn is_in_stock(&self) -> bool {
        self.stock_quantity > 0
    }

    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity <= self.min_stock_level
    }
}

/// 商品响应，附带派生字段
#[derive(Debug, Serialize)]
pub struct ProductResponse {
    #[serde(flatten)]
    pub product: Product,
    pub current_price: i64,
    pub is_in_stock: bool,
    pub is_low_stock: bool,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            current_price: product.current_price(),
            is_in_stock: product.is_in_stock(),
            is_low_stock: product.is_low_stock(),
            product,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 200), custom(function = "validate_not_blank"))]
    pub name: String,

    #[validate(length(min = 1, max = 220), custom(function = "validate_slug"))]
    pub slug: String,

    #[validate(length(max = 5000))]
    pub description: Option<String>,

    #[validate(length(max = 500))]
    pub short_description: Option<String>,

    #[validate(length(min = 1, max = 100), custom(function = "validate_not_blank"))]
    pub sku: String,

    #[validate(range(min = 0, max = 10_000_000_000_i64))]
    pub price: i64,

    #[validate(range(min = 0, max = 10_000_000_000_i64))]
    pub sale_price: Option<i64>,

    #[validate(range(min = 0, max = 10_000_000_000_i64))]
    pub cost_price: Option<i64>,

    #[serde(default)]
    #[validate(range(min = 0))]
    pub stock_quantity: i32,

    #[serde(default = "default_min_stock_level")]
    #[validate(range(min = 0))]
    pub min_stock_level: i32,

    pub category_id: Uuid,

    #[validate(length(max = 500))]
    pub image_url: Option<String>,

    #[serde(default = "default_true")]
    pub is_active: bool,

    #[serde(default)]
    pub is_featured: bool,

    #[serde(default)]
    pub is_digital: bool,
}

fn default_min_stock_level() -> i32 {
    DEFAULT_MIN_STOCK_LEVEL
}

fn default_true() -> bool {
    true
}

impl Payload for CreateProductRequest {
    fn check_rules(&self, _config: &AppConfig, errors: &mut FieldErrors) {
        check_sale_price(Some(self.price), self.sale_price, errors);
    }
}

/// 促销价必须低于原价
pub fn check_sale_price(price: Option<i64>, sale_price: Option<i64>, errors: &mut FieldErrors) {
    if let (Some(price), Some(sale)) = (price, sale_price) {
        if sale >= price {
            errors.add("sale_price", "less_than_price", "must be less than price");
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 200), custom(function = "validate_not_blank"))]
    pub name: Option<String>,

    #[validate(length(min = 1, max = 220), custom(function = "validate_slug"))]
    pub slug: Option<String>,

    #[validate(length(max = 5000))]
    pub description: Option<String>,

    #[validate(length(max = 500))]
    pub short_description: Option<String>,

    #[validate(length(min = 1, max = 100), custom(function = "validate_not_blank"))]
    pub sku: Option<String>,

    #[validate(range(min = 0, max = 10_000_000_000_i64))]
    pub price: Option<i64>,

    #[validate(range(min = 0, max = 10_000_000_000_i64))]
    pub sale_price: Option<i64>,

    #[validate(range(min = 0, max = 10_000_000_000_i64))]
    pub cost_price: Option<i64>,

    #[validate(range(min = 0))]
    pub stock_quantity: Option<i32>,

    #[validate(range(min = 0))]
    pub min_stock_level: Option<i32>,

    pub category_id: Option<Uuid>,

    #[validate(length(max = 500))]
    pub image_url: Option<String>,

    pub is_active: Option<bool>,

    pub is_featured: Option<bool>,

    pub is_digital: Option<bool>,
}

impl Payload for UpdateProductRequest {
    fn check_rules(&self, _config: &AppConfig, errors: &mut FieldErrors) {
        check_sale_price(self.price, self.sale_price, errors);
    }
}

/// 库存调整方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockOperation {
    Add,
    Subtract,
    Set,
}

#[derive(Debug, Deserialize, Validate)]
pub struct StockUpdateRequest {
    pub operation: StockOperation,

    #[validate(range(min = 0, max = 1000000))]
    pub quantity: i32,
}

impl Payload for StockUpdateRequest {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    Name,
    Price,
    #[default]
    CreatedAt,
    StockQuantity,
}

impl ProductSort {
    pub fn column(self) -> &'static str {
        match self {
            ProductSort::Name => "name",
            ProductSort::Price => "price",
            ProductSort::CreatedAt => "created_at",
            ProductSort::StockQuantity => "stock_quantity",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn keyword(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// 商品搜索条件
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ProductSearchQuery {
    #[validate(length(max = 200))]
    pub q: Option<String>,

    pub category_id: Option<Uuid>,

    #[validate(range(min = 0))]
    pub min_price: Option<i64>,

    #[validate(range(min = 0))]
    pub max_price: Option<i64>,

    pub featured: Option<bool>,

    pub in_stock: Option<bool>,

    pub sort_by: Option<ProductSort>,

    pub sort_order: Option<SortOrder>,

    #[validate(range(min = 1))]
    pub page: Option<u32>,

    #[validate(range(min = 1))]
    pub page_size: Option<u32>,
}

impl Payload for ProductSearchQuery {
    fn check_rules(&self, config: &AppConfig, errors: &mut FieldErrors) {
        check_page_size(self.page_size, &config.pagination, errors);

        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            if max < min {
                errors.add(
                    "max_price",
                    "range",
                    "must be greater than or equal to min_price",
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: i32, sale_price: Option<i64>) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: "Laptop".to_string(),
            slug: "laptop".to_string(),
            description: None,
            short_description: None,
            sku: "LAP-001".to_string(),
            price: 99900,
            sale_price,
            cost_price: None,
            stock_quantity: stock,
            min_stock_level: DEFAULT_MIN_STOCK_LEVEL,
            category_id: Uuid::new_v4(),
            image_url: None,
            is_active: true,
            is_featured: false,
            is_digital: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_derived_fields() {
        let regular = product(10, None);
        assert_eq!(regular.current_price(), 99900);
        assert!(regular.is_in_stock());
        assert!(!regular.is_low_stock());

        let discounted = product(5, Some(89900));
        assert_eq!(discounted.current_price(), 89900);
        assert!(discounted.is_low_stock());

        let empty = product(0, None);
        assert!(!empty.is_in_stock());
        assert!(empty.is_low_stock());
    }

    #[test]
    fn test_response_flattens_product() {
        let json = serde_json::to_value(ProductResponse::from(product(3, Some(500)))).unwrap();
        assert_eq!(json["sku"], "LAP-001");
        assert_eq!(json["current_price"], 500);
        assert_eq!(json["is_low_stock"], true);
    }

    #[test]
    fn test_sale_price_must_be_below_price() {
        let mut errors = FieldErrors::default();
        check_sale_price(Some(1000), Some(1000), &mut errors);
        assert!(errors.has_field("sale_price"));

        let mut errors = FieldErrors::default();
        check_sale_price(Some(1000), Some(999), &mut errors);
        check_sale_price(None, Some(5000), &mut errors);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_price_ceiling() {
        let request = |price: i64| -> CreateProductRequest {
            serde_json::from_value(serde_json::json!({
                "name": "Laptop",
                "slug": "laptop",
                "sku": "LAP-001",
                "price": price,
                "category_id": Uuid::new_v4(),
            }))
            .unwrap()
        };

        assert!(request(MAX_PRICE).validate().is_ok());

        let errors = request(MAX_PRICE + 1).validate().unwrap_err();
        assert!(errors.field_errors().contains_key("price"));
    }
}
