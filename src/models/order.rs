//! Order domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::{AppConfig, OrderConfig},
    error::AppError,
    models::{line_amount, percent_of, sum_amounts},
    validation::{check_page_size, validate_not_blank, FieldErrors, Payload},
};

/// 订单状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "order_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    /// 合法的状态流转
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Processing)
                | (Confirmed, Cancelled)
                | (Processing, Shipped)
                | (Processing, Cancelled)
                | (Shipped, Delivered)
        )
    }

    pub fn is_cancellable(self) -> bool {
        self.can_transition_to(OrderStatus::Cancelled)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        };
        write!(f, "{}", s)
    }
}

/// 支付状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<String>,

    // 金额（分）
    pub subtotal: i64,
    pub tax_amount: i64,
    pub shipping_amount: i64,
    pub discount_amount: i64,
    pub total_amount: i64,

    pub shipping_address: String,
    pub shipping_city: String,
    pub shipping_country: String,
    pub shipping_postal_code: String,
    pub shipping_phone: Option<String>,
    pub billing_address: String,
    pub billing_city: String,
    pub billing_country: String,
    pub billing_postal_code: String,

    pub notes: Option<String>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 订单行，保存下单时的商品名称、SKU 与单价快照
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub product_sku: String,
    pub quantity: i32,
    pub unit_price: i64,
    pub total_price: i64,
}

#[derive(Debug, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// 待写入的订单行
#[derive(Debug, Clone)]
pub struct NewOrderLine {
    pub product_id: Uuid,
    pub product_name: String,
    pub product_sku: String,
    pub quantity: i32,
    pub unit_price: i64,
}

impl NewOrderLine {
    pub fn total(&self) -> Result<i64, AppError> {
        line_amount(self.unit_price, self.quantity)
    }
}

/// 订单金额
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderTotals {
    pub subtotal: i64,
    pub tax_amount: i64,
    pub shipping_amount: i64,
    pub discount_amount: i64,
    pub total_amount: i64,
}

impl OrderTotals {
    /// 税额按百分比四舍五入；`free_shipping_eligible` 时满额免运费
    pub fn compute(
        subtotal: i64,
        config: &OrderConfig,
        free_shipping_eligible: bool,
    ) -> Result<Self, AppError> {
        let tax_amount = percent_of(subtotal, config.tax_rate_percent)?;
        let shipping_amount =
            if free_shipping_eligible && subtotal >= config.free_shipping_threshold {
                0
            } else {
                config.shipping_flat
            };

        Ok(Self {
            subtotal,
            tax_amount,
            shipping_amount,
            discount_amount: 0,
            total_amount: sum_amounts([subtotal, tax_amount, shipping_amount])?,
        })
    }
}

/// 收货/账单信息；账单地址缺省时沿用收货地址
#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutRequest {
    #[validate(length(min = 1, max = 500), custom(function = "validate_not_blank"))]
    pub shipping_address: String,

    #[validate(length(min = 1, max = 100), custom(function = "validate_not_blank"))]
    pub shipping_city: String,

    #[validate(length(min = 1, max = 100), custom(function = "validate_not_blank"))]
    pub shipping_country: String,

    #[validate(length(min = 1, max = 20), custom(function = "validate_not_blank"))]
    pub shipping_postal_code: String,

    #[validate(length(max = 20))]
    pub shipping_phone: Option<String>,

    #[validate(length(min = 1, max = 500))]
    pub billing_address: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub billing_city: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub billing_country: Option<String>,

    #[validate(length(min = 1, max = 20))]
    pub billing_postal_code: Option<String>,

    #[validate(length(max = 1000))]
    pub notes: Option<String>,

    #[validate(length(max = 50))]
    pub payment_method: Option<String>,
}

impl Payload for CheckoutRequest {}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct OrderLineRequest {
    pub product_id: Uuid,

    #[validate(range(min = 1, max = 1000))]
    pub quantity: i32,
}

/// 直接下单（不经过购物车）
#[derive(Debug, Deserialize, Validate)]
pub struct DirectOrderRequest {
    #[validate(length(min = 1, max = 100), nested)]
    pub items: Vec<OrderLineRequest>,

    /// 字段与 CheckoutRequest 平铺在同一层
    #[serde(flatten)]
    pub checkout: CheckoutRequest,
}

impl Payload for DirectOrderRequest {
    fn check_rules(&self, _config: &AppConfig, errors: &mut FieldErrors) {
        // 平铺字段的错误不加前缀
        if let Err(e) = self.checkout.validate() {
            errors.merge(FieldErrors::from(e));
        }

        let mut seen = std::collections::HashSet::new();
        for (index, line) in self.items.iter().enumerate() {
            if !seen.insert(line.product_id) {
                errors.add(
                    &format!("items[{}].product_id", index),
                    "unique",
                    "product appears more than once",
                );
            }
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

impl Payload for UpdateOrderStatusRequest {}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePaymentStatusRequest {
    pub payment_status: PaymentStatus,
}

impl Payload for UpdatePaymentStatusRequest {}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,

    pub payment_status: Option<PaymentStatus>,

    #[validate(range(min = 1))]
    pub page: Option<u32>,

    #[validate(range(min = 1))]
    pub page_size: Option<u32>,
}

impl Payload for OrderListQuery {
    fn check_rules(&self, config: &AppConfig, errors: &mut FieldErrors) {
        check_page_size(self.page_size, &config.pagination, errors);
    }
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct OrderStats {
    pub total_orders: i64,
    pub pending_orders: i64,
    pub completed_orders: i64,
    pub cancelled_orders: i64,
    pub total_revenue: i64,
    pub average_order_value: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> OrderConfig {
        OrderConfig {
            tax_rate_percent: 21,
            shipping_flat: 1000,
            free_shipping_threshold: 10000,
        }
    }

    #[test]
    fn test_status_transitions() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Shipped));
        assert!(Shipped.can_transition_to(Delivered));

        assert!(!Pending.can_transition_to(Shipped));
        assert!(!Shipped.can_transition_to(Cancelled));
        assert!(!Delivered.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Pending));
        assert!(!Refunded.can_transition_to(Pending));
    }

    #[test]
    fn test_cancellable_states() {
        use OrderStatus::*;
        assert!(Pending.is_cancellable());
        assert!(Confirmed.is_cancellable());
        assert!(Processing.is_cancellable());
        assert!(!Shipped.is_cancellable());
        assert!(!Delivered.is_cancellable());
        assert!(!Cancelled.is_cancellable());
    }

    #[test]
    fn test_totals_with_flat_shipping() {
        let totals = OrderTotals::compute(5000, &config(), true).unwrap();
        assert_eq!(totals.tax_amount, 1050);
        assert_eq!(totals.shipping_amount, 1000);
        assert_eq!(totals.total_amount, 7050);
    }

    #[test]
    fn test_totals_free_shipping_threshold() {
        let totals = OrderTotals::compute(10000, &config(), true).unwrap();
        assert_eq!(totals.shipping_amount, 0);
        assert_eq!(totals.total_amount, 12100);

        // 直接下单不享受免运费
        let direct = OrderTotals::compute(10000, &config(), false).unwrap();
        assert_eq!(direct.shipping_amount, 1000);
    }

    #[test]
    fn test_tax_rounds_half_up() {
        // 21% of 1050 = 220.5
        assert_eq!(OrderTotals::compute(1050, &config(), false).unwrap().tax_amount, 221);
        // 21% of 1 = 0.21
        assert_eq!(OrderTotals::compute(1, &config(), false).unwrap().tax_amount, 0);
    }

    fn order_line(unit_price: i64, quantity: i32) -> NewOrderLine {
        NewOrderLine {
            product_id: Uuid::new_v4(),
            product_name: "Widget".to_string(),
            product_sku: "W-1".to_string(),
            quantity,
            unit_price,
        }
    }

    #[test]
    fn test_line_total_at_price_ceiling() {
        use crate::models::{cart::MAX_LINE_QUANTITY, product::MAX_PRICE};

        let line = order_line(MAX_PRICE, MAX_LINE_QUANTITY);
        assert_eq!(line.total().unwrap(), MAX_PRICE * MAX_LINE_QUANTITY as i64);

        let totals = OrderTotals::compute(line.total().unwrap(), &config(), true).unwrap();
        assert_eq!(
            totals.total_amount,
            totals.subtotal + totals.tax_amount + totals.shipping_amount
        );
    }

    #[test]
    fn test_amount_overflow_is_rejected() {
        let err = order_line(i64::MAX / 2, 3).total().unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = OrderTotals::compute(i64::MAX / 20, &config(), false).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        // 税额不溢出但合计溢出
        let untaxed = OrderConfig {
            tax_rate_percent: 0,
            ..config()
        };
        let err = OrderTotals::compute(i64::MAX - 500, &untaxed, false).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_direct_order_item_rules() {
        let request = |items: serde_json::Value| -> DirectOrderRequest {
            serde_json::from_value(serde_json::json!({
                "items": items,
                "shipping_address": "1 Main Street",
                "shipping_city": "Springfield",
                "shipping_country": "US",
                "shipping_postal_code": "12345",
            }))
            .unwrap()
        };

        let ok = request(serde_json::json!([{"product_id": Uuid::new_v4(), "quantity": 2}]));
        assert!(ok.validate().is_ok());

        let empty = request(serde_json::json!([])).validate().unwrap_err();
        assert!(empty.field_errors().contains_key("items"));

        let zero = request(serde_json::json!([{"product_id": Uuid::new_v4(), "quantity": 0}]));
        assert!(zero.validate().is_err());
    }
}
