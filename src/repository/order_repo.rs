//! Order repository
//!
//! 读查询使用连接池；下单/取消等写操作的步骤以 `&mut PgConnection` 为参数，
//! 由服务层在同一事务中组合调用。

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{order::*, product::Product},
};

/// 待写入的订单头
pub struct NewOrder<'a> {
    pub order_number: String,
    pub user_id: Uuid,
    pub totals: OrderTotals,
    pub checkout: &'a CheckoutRequest,
}

pub struct OrderRepository {
    db: PgPool,
}

impl OrderRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, AppError> {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(order)
    }

    pub async fn items(&self, order_id: Uuid) -> Result<Vec<OrderItem>, AppError> {
        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT * FROM order_items WHERE order_id = $1 ORDER BY product_name",
        )
        .bind(order_id)
        .fetch_all(&self.db)
        .await?;

        Ok(items)
    }

    /// 订单列表；`user_id` 为 None 时返回全部订单
    pub async fn list(
        &self,
        user_id: Option<Uuid>,
        status: Option<OrderStatus>,
        payment_status: Option<PaymentStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Order>, AppError> {
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT * FROM orders
            WHERE ($1::uuid IS NULL OR user_id = $1)
              AND ($2::order_status IS NULL OR status = $2)
              AND ($3::payment_status IS NULL OR payment_status = $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(user_id)
        .bind(status)
        .bind(payment_status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        Ok(orders)
    }

    pub async fn count(
        &self,
        user_id: Option<Uuid>,
        status: Option<OrderStatus>,
        payment_status: Option<PaymentStatus>,
    ) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM orders
            WHERE ($1::uuid IS NULL OR user_id = $1)
              AND ($2::order_status IS NULL OR status = $2)
              AND ($3::payment_status IS NULL OR payment_status = $3)
            "#,
        )
        .bind(user_id)
        .bind(status)
        .bind(payment_status)
        .fetch_one(&self.db)
        .await?;

        Ok(count)
    }

    pub async fn stats(&self) -> Result<OrderStats, AppError> {
        let stats = sqlx::query_as::<_, OrderStats>(
            r#"
            SELECT
                COUNT(*) AS total_orders,
                COUNT(*) FILTER (WHERE status = 'pending') AS pending_orders,
                COUNT(*) FILTER (WHERE status = 'delivered') AS completed_orders,
                COUNT(*) FILTER (WHERE status = 'cancelled') AS cancelled_orders,
                COALESCE(SUM(total_amount) FILTER (WHERE payment_status = 'paid'), 0)::BIGINT AS total_revenue,
                COALESCE(ROUND(AVG(total_amount) FILTER (WHERE payment_status = 'paid')), 0)::BIGINT AS average_order_value
            FROM orders
            "#,
        )
        .fetch_one(&self.db)
        .await?;

        Ok(stats)
    }

    // ===== 事务内步骤 =====

    /// 锁定商品行，按 id 排序加锁避免死锁
    pub async fn lock_products(
        conn: &mut PgConnection,
        ids: &[Uuid],
    ) -> Result<Vec<Product>, AppError> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE id = ANY($1) ORDER BY id FOR UPDATE",
        )
        .bind(ids)
        .fetch_all(&mut *conn)
        .await?;

        Ok(products)
    }

    pub async fn lock_order(conn: &mut PgConnection, id: Uuid) -> Result<Option<Order>, AppError> {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(order)
    }

    pub async fn insert_order(conn: &mut PgConnection, new: &NewOrder<'_>) -> Result<Order, AppError> {
        let c = new.checkout;
        let order = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (
                order_number, user_id, payment_method,
                subtotal, tax_amount, shipping_amount, discount_amount, total_amount,
                shipping_address, shipping_city, shipping_country, shipping_postal_code, shipping_phone,
                billing_address, billing_city, billing_country, billing_postal_code,
                notes
            )
            VALUES (
                $1, $2, $3,
                $4, $5, $6, $7, $8,
                $9, $10, $11, $12, $13,
                COALESCE($14, $9), COALESCE($15, $10), COALESCE($16, $11), COALESCE($17, $12),
                $18
            )
            RETURNING *
            "#,
        )
        .bind(&new.order_number)
        .bind(new.user_id)
        .bind(&c.payment_method)
        .bind(new.totals.subtotal)
        .bind(new.totals.tax_amount)
        .bind(new.totals.shipping_amount)
        .bind(new.totals.discount_amount)
        .bind(new.totals.total_amount)
        .bind(&c.shipping_address)
        .bind(&c.shipping_city)
        .bind(&c.shipping_country)
        .bind(&c.shipping_postal_code)
        .bind(&c.shipping_phone)
        .bind(&c.billing_address)
        .bind(&c.billing_city)
        .bind(&c.billing_country)
        .bind(&c.billing_postal_code)
        .bind(&c.notes)
        .fetch_one(&mut *conn)
        .await?;

        Ok(order)
    }

    pub async fn insert_item(
        conn: &mut PgConnection,
        order_id: Uuid,
        line: &NewOrderLine,
    ) -> Result<OrderItem, AppError> {
        let total_price = line.total()?;
        let item = sqlx::query_as::<_, OrderItem>(
            r#"
            INSERT INTO order_items (order_id, product_id, product_name, product_sku, quantity, unit_price, total_price)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(order_id)
        .bind(line.product_id)
        .bind(&line.product_name)
        .bind(&line.product_sku)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(total_price)
        .fetch_one(&mut *conn)
        .await?;

        Ok(item)
    }

    pub async fn decrement_stock(
        conn: &mut PgConnection,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE products SET stock_quantity = stock_quantity - $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(product_id)
        .bind(quantity)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// 把订单行数量加回库存（商品已删除的行跳过）
    pub async fn restore_stock(conn: &mut PgConnection, order_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE products p
            SET stock_quantity = p.stock_quantity + oi.quantity, updated_at = NOW()
            FROM order_items oi
            WHERE oi.order_id = $1 AND oi.product_id = p.id
            "#,
        )
        .bind(order_id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// 更新状态，并记录发货/签收时间
    pub async fn set_status(
        conn: &mut PgConnection,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Order, AppError> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders
            SET
                status = $2,
                shipped_at = CASE WHEN $2 = 'shipped'::order_status THEN NOW() ELSE shipped_at END,
                delivered_at = CASE WHEN $2 = 'delivered'::order_status THEN NOW() ELSE delivered_at END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_one(&mut *conn)
        .await?;

        Ok(order)
    }

    pub async fn set_payment_status(
        conn: &mut PgConnection,
        id: Uuid,
        payment_status: PaymentStatus,
    ) -> Result<Order, AppError> {
        let order = sqlx::query_as::<_, Order>(
            "UPDATE orders SET payment_status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(payment_status)
        .fetch_one(&mut *conn)
        .await?;

        Ok(order)
    }

    /// 下单后停用购物车，下次访问时会创建新的空购物车
    pub async fn close_cart(conn: &mut PgConnection, cart_id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id)
            .execute(&mut *conn)
            .await?;
        sqlx::query("UPDATE carts SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
            .bind(cart_id)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }
}
