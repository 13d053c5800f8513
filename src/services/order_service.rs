//! Order service
//! 下单、取消与状态流转

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::Principal;
use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::models::order::*;
use crate::models::{sum_amounts, PageRequest, Paginated};
use crate::repository::{CartRepository, NewOrder, OrderRepository};

/// 生成订单号
/// Format: ORD-<YYYYMMDD>-<8-char-random>
pub fn generate_order_number() -> String {
    let random: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();

    format!(
        "ORD-{}-{}",
        Utc::now().format("%Y%m%d"),
        random.to_uppercase()
    )
}

/// 请求的一行：商品与数量
#[derive(Debug, Clone, Copy)]
struct LineRequest {
    product_id: Uuid,
    quantity: i32,
}

/// 锁定商品并生成订单行，校验商品可售且库存充足
async fn build_lines(conn: &mut PgConnection, requested: &[LineRequest]) -> Result<Vec<NewOrderLine>> {
    let ids: Vec<Uuid> = requested.iter().map(|l| l.product_id).collect();
    let products: HashMap<Uuid, _> = OrderRepository::lock_products(conn, &ids)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let mut lines = Vec::with_capacity(requested.len());
    for line in requested {
        let product = products
            .get(&line.product_id)
            .ok_or_else(|| AppError::bad_request(&format!("Product {} not found", line.product_id)))?;

        if !product.is_active {
            return Err(AppError::bad_request(&format!(
                "Product '{}' is not available",
                product.name
            )));
        }
        if product.stock_quantity < line.quantity {
            return Err(AppError::bad_request(&format!(
                "Insufficient stock for '{}': {} available, {} requested",
                product.name,
                product.stock_quantity.max(0),
                line.quantity
            )));
        }

        lines.push(NewOrderLine {
            product_id: product.id,
            product_name: product.name.clone(),
            product_sku: product.sku.clone(),
            quantity: line.quantity,
            unit_price: product.current_price(),
        });
    }

    Ok(lines)
}

/// 订单服务
pub struct OrderService {
    db: PgPool,
    orders: OrderRepository,
    carts: CartRepository,
    config: Arc<AppConfig>,
}

impl OrderService {
    pub fn new(db: PgPool, config: Arc<AppConfig>) -> Self {
        Self {
            orders: OrderRepository::new(db.clone()),
            carts: CartRepository::new(db.clone()),
            db,
            config,
        }
    }

    /// 写入订单头与订单行并扣减库存
    async fn place(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        lines: Vec<NewOrderLine>,
        checkout: &CheckoutRequest,
        free_shipping_eligible: bool,
    ) -> Result<OrderDetail> {
        let line_totals = lines
            .iter()
            .map(NewOrderLine::total)
            .collect::<Result<Vec<_>>>()?;
        let subtotal = sum_amounts(line_totals)?;
        let totals = OrderTotals::compute(subtotal, &self.config.orders, free_shipping_eligible)?;

        let order = OrderRepository::insert_order(
            &mut *conn,
            &NewOrder {
                order_number: generate_order_number(),
                user_id,
                totals,
                checkout,
            },
        )
        .await?;

        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            items.push(OrderRepository::insert_item(&mut *conn, order.id, line).await?);
            OrderRepository::decrement_stock(&mut *conn, line.product_id, line.quantity).await?;
        }

        Ok(OrderDetail { order, items })
    }

    /// 购物车结算
    #[instrument(skip(self, checkout))]
    pub async fn create_from_cart(
        &self,
        user_id: Uuid,
        checkout: CheckoutRequest,
    ) -> Result<OrderDetail> {
        let cart = self
            .carts
            .find_active(user_id)
            .await?
            .ok_or_else(|| AppError::bad_request("Cart is empty"))?;
        let cart_lines = self.carts.lines(cart.id).await?;
        if cart_lines.is_empty() {
            return Err(AppError::bad_request("Cart is empty"));
        }

        let requested: Vec<LineRequest> = cart_lines
            .iter()
            .map(|l| LineRequest {
                product_id: l.product_id,
                quantity: l.quantity,
            })
            .collect();

        let mut tx = self.db.begin().await?;

        let lines = build_lines(&mut *tx, &requested).await?;
        let detail = self.place(&mut *tx, user_id, lines, &checkout, true).await?;
        OrderRepository::close_cart(&mut *tx, cart.id).await?;

        tx.commit().await?;

        info!(
            order_id = %detail.order.id,
            order_number = %detail.order.order_number,
            total = detail.order.total_amount,
            "Order created from cart"
        );

        Ok(detail)
    }

    /// 不经过购物车直接下单
    #[instrument(skip(self, req))]
    pub async fn create_direct(&self, user_id: Uuid, req: DirectOrderRequest) -> Result<OrderDetail> {
        let requested: Vec<LineRequest> = req
            .items
            .iter()
            .map(|l| LineRequest {
                product_id: l.product_id,
                quantity: l.quantity,
            })
            .collect();

        let mut tx = self.db.begin().await?;

        let lines = build_lines(&mut *tx, &requested).await?;
        let detail = self
            .place(&mut *tx, user_id, lines, &req.checkout, false)
            .await?;

        tx.commit().await?;

        info!(
            order_id = %detail.order.id,
            order_number = %detail.order.order_number,
            total = detail.order.total_amount,
            "Direct order created"
        );

        Ok(detail)
    }

    async fn list_for(&self, user_id: Option<Uuid>, query: &OrderListQuery) -> Result<Paginated<Order>> {
        let page = PageRequest::resolve(query.page, query.page_size, &self.config.pagination);

        let orders = self
            .orders
            .list(
                user_id,
                query.status,
                query.payment_status,
                page.limit(),
                page.offset(),
            )
            .await?;
        let total = self
            .orders
            .count(user_id, query.status, query.payment_status)
            .await?;

        Ok(Paginated::new(orders, total, page))
    }

    pub async fn list_mine(&self, user_id: Uuid, query: &OrderListQuery) -> Result<Paginated<Order>> {
        self.list_for(Some(user_id), query).await
    }

    pub async fn list_all(&self, query: &OrderListQuery) -> Result<Paginated<Order>> {
        self.list_for(None, query).await
    }

    /// 订单详情；只有下单人和管理员可见
    pub async fn get(&self, principal: &Principal, id: Uuid) -> Result<OrderDetail> {
        let order = self
            .orders
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Order"))?;
        principal.require_self_or_admin(order.user_id)?;

        let items = self.orders.items(order.id).await?;

        Ok(OrderDetail { order, items })
    }

    /// 取消订单并回补库存
    #[instrument(skip(self, principal), fields(user_id = %principal.id))]
    pub async fn cancel(&self, principal: &Principal, id: Uuid) -> Result<Order> {
        let mut tx = self.db.begin().await?;

        let order = OrderRepository::lock_order(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::not_found("Order"))?;
        principal.require_self_or_admin(order.user_id)?;

        if !order.status.is_cancellable() {
            return Err(AppError::bad_request(&format!(
                "Order in status '{}' cannot be cancelled",
                order.status
            )));
        }

        OrderRepository::restore_stock(&mut *tx, id).await?;
        let order = OrderRepository::set_status(&mut *tx, id, OrderStatus::Cancelled).await?;

        tx.commit().await?;

        info!(order_id = %id, "Order cancelled");

        Ok(order)
    }

    /// 管理员修改订单状态，只允许合法流转
    #[instrument(skip(self))]
    pub async fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<Order> {
        let mut tx = self.db.begin().await?;

        let order = OrderRepository::lock_order(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::not_found("Order"))?;

        if !order.status.can_transition_to(status) {
            warn!(order_id = %id, from = %order.status, to = %status, "Rejected status transition");
            return Err(AppError::bad_request(&format!(
                "Cannot change order status from '{}' to '{}'",
                order.status, status
            )));
        }

        if status == OrderStatus::Cancelled {
            OrderRepository::restore_stock(&mut *tx, id).await?;
        }
        let updated = OrderRepository::set_status(&mut *tx, id, status).await?;

        tx.commit().await?;

        info!(order_id = %id, from = %order.status, to = %status, "Order status updated");

        Ok(updated)
    }

    /// 修改支付状态；待处理订单付款后自动确认
    #[instrument(skip(self))]
    pub async fn update_payment_status(
        &self,
        id: Uuid,
        payment_status: PaymentStatus,
    ) -> Result<Order> {
        let mut tx = self.db.begin().await?;

        let order = OrderRepository::lock_order(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::not_found("Order"))?;

        let mut updated = OrderRepository::set_payment_status(&mut *tx, id, payment_status).await?;
        if payment_status == PaymentStatus::Paid && order.status == OrderStatus::Pending {
            updated = OrderRepository::set_status(&mut *tx, id, OrderStatus::Confirmed).await?;
        }

        tx.commit().await?;

        info!(order_id = %id, status = %updated.status, "Payment status updated");

        Ok(updated)
    }

    pub async fn stats(&self) -> Result<OrderStats> {
        self.orders.stats().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_number_format() {
        let number = generate_order_number();
        let parts: Vec<&str> = number.split('-').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ORD");
        assert_eq!(parts[1].len(), 8);
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 8);
        assert!(parts[2]
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_order_numbers_differ() {
        assert_ne!(generate_order_number(), generate_order_number());
    }
}
