//! Cart repository

use sqlx::PgPool;
use uuid::Uuid;

use crate::{error::AppError, models::cart::*};

pub struct CartRepository {
    db: PgPool,
}

impl CartRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn find_active(&self, user_id: Uuid) -> Result<Option<Cart>, AppError> {
        let cart = sqlx::query_as::<_, Cart>(
            "SELECT * FROM carts WHERE user_id = $1 AND is_active",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(cart)
    }

    /// 获取活动购物车，不存在时创建
    pub async fn get_or_create_active(&self, user_id: Uuid) -> Result<Cart, AppError> {
        sqlx::query(
            r#"
            INSERT INTO carts (user_id) VALUES ($1)
            ON CONFLICT (user_id) WHERE is_active DO NOTHING
            "#,
        )
        .bind(user_id)
        .execute(&self.db)
        .await?;

        let cart = sqlx::query_as::<_, Cart>(
            "SELECT * FROM carts WHERE user_id = $1 AND is_active",
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        Ok(cart)
    }

    /// 购物车行及商品当前状态
    pub async fn lines(&self, cart_id: Uuid) -> Result<Vec<CartLine>, AppError> {
        let lines = sqlx::query_as::<_, CartLine>(
            r#"
            SELECT
                ci.id,
                ci.product_id,
                p.name AS product_name,
                p.sku AS product_sku,
                p.slug AS product_slug,
                ci.quantity,
                ci.unit_price,
                p.stock_quantity,
                p.is_active AS product_active
            FROM cart_items ci
            JOIN products p ON p.id = ci.product_id
            WHERE ci.cart_id = $1
            ORDER BY ci.created_at
            "#,
        )
        .bind(cart_id)
        .fetch_all(&self.db)
        .await?;

        Ok(lines)
    }

    pub async fn find_item(&self, cart_id: Uuid, item_id: Uuid) -> Result<Option<CartItem>, AppError> {
        let item = sqlx::query_as::<_, CartItem>(
            "SELECT * FROM cart_items WHERE id = $1 AND cart_id = $2",
        )
        .bind(item_id)
        .bind(cart_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(item)
    }

    pub async fn find_item_by_product(
        &self,
        cart_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<CartItem>, AppError> {
        let item = sqlx::query_as::<_, CartItem>(
            "SELECT * FROM cart_items WHERE cart_id = $1 AND product_id = $2",
        )
        .bind(cart_id)
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(item)
    }

    /// 写入购物车行；同一商品已存在时覆盖数量与单价快照
    pub async fn upsert_item(
        &self,
        cart_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        unit_price: i64,
    ) -> Result<CartItem, AppError> {
        let item = sqlx::query_as::<_, CartItem>(
            r#"
            INSERT INTO cart_items (cart_id, product_id, quantity, unit_price)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (cart_id, product_id)
            DO UPDATE SET quantity = EXCLUDED.quantity, unit_price = EXCLUDED.unit_price, updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(quantity)
        .bind(unit_price)
        .fetch_one(&self.db)
        .await?;

        self.touch(cart_id).await?;

        Ok(item)
    }

    pub async fn update_quantity(
        &self,
        cart_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<Option<CartItem>, AppError> {
        let item = sqlx::query_as::<_, CartItem>(
            r#"
            UPDATE cart_items SET quantity = $3, updated_at = NOW()
            WHERE id = $1 AND cart_id = $2
            RETURNING *
            "#,
        )
        .bind(item_id)
        .bind(cart_id)
        .bind(quantity)
        .fetch_optional(&self.db)
        .await?;

        self.touch(cart_id).await?;

        Ok(item)
    }

    pub async fn remove_item(&self, cart_id: Uuid, item_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND cart_id = $2")
            .bind(item_id)
            .bind(cart_id)
            .execute(&self.db)
            .await?;

        self.touch(cart_id).await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn clear(&self, cart_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id)
            .execute(&self.db)
            .await?;

        self.touch(cart_id).await?;

        Ok(result.rows_affected())
    }

    async fn touch(&self, cart_id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE carts SET updated_at = NOW() WHERE id = $1")
            .bind(cart_id)
            .execute(&self.db)
            .await?;

        Ok(())
    }
}
