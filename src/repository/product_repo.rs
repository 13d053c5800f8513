//! Product repository

use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{error::AppError, models::product::*};

pub struct ProductRepository {
    db: PgPool,
}

/// 转义 LIKE 通配符
fn like_pattern(text: &str) -> String {
    let escaped = text
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn push_search_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &ProductSearchQuery) {
    qb.push(" WHERE is_active");

    if let Some(text) = query.q.as_deref().filter(|t| !t.trim().is_empty()) {
        let pattern = like_pattern(text);
        qb.push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR sku ILIKE ")
            .push_bind(pattern)
            .push(")");
    }

    if let Some(category_id) = query.category_id {
        qb.push(" AND category_id = ").push_bind(category_id);
    }

    if let Some(min_price) = query.min_price {
        qb.push(" AND COALESCE(sale_price, price) >= ").push_bind(min_price);
    }

    if let Some(max_price) = query.max_price {
        qb.push(" AND COALESCE(sale_price, price) <= ").push_bind(max_price);
    }

    if let Some(featured) = query.featured {
        qb.push(" AND is_featured = ").push_bind(featured);
    }

    match query.in_stock {
        Some(true) => {
            qb.push(" AND stock_quantity > 0");
        }
        Some(false) => {
            qb.push(" AND stock_quantity <= 0");
        }
        None => {}
    }
}

impl ProductRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(product)
    }

    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.db)
            .await?;

        Ok(product)
    }

    pub async fn exists_by_sku(&self, sku: &str, exclude: Option<Uuid>) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM products WHERE sku = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(sku)
        .bind(exclude)
        .fetch_one(&self.db)
        .await?;

        Ok(exists)
    }

    pub async fn exists_by_slug(&self, slug: &str, exclude: Option<Uuid>) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM products WHERE slug = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(slug)
        .bind(exclude)
        .fetch_one(&self.db)
        .await?;

        Ok(exists)
    }

    /// 按条件搜索启用的商品
    pub async fn search(
        &self,
        query: &ProductSearchQuery,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Product>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM products");
        push_search_filters(&mut qb, query);

        let sort = query.sort_by.unwrap_or_default();
        let column = match sort {
            ProductSort::Price => "COALESCE(sale_price, price)",
            other => other.column(),
        };
        qb.push(" ORDER BY ")
            .push(column)
            .push(" ")
            .push(query.sort_order.unwrap_or_default().keyword())
            .push(", id");

        qb.push(" LIMIT ").push_bind(limit);
        qb.push(" OFFSET ").push_bind(offset);

        let products = qb.build_query_as::<Product>().fetch_all(&self.db).await?;

        Ok(products)
    }

    pub async fn count_search(&self, query: &ProductSearchQuery) -> Result<i64, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products");
        push_search_filters(&mut qb, query);

        let count: i64 = qb.build_query_scalar().fetch_one(&self.db).await?;

        Ok(count)
    }

    /// 库存不高于低库存阈值的启用商品
    pub async fn low_stock(&self, limit: i64, offset: i64) -> Result<Vec<Product>, AppError> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE is_active AND stock_quantity <= min_stock_level
            ORDER BY stock_quantity, name
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        Ok(products)
    }

    pub async fn count_low_stock(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products WHERE is_active AND stock_quantity <= min_stock_level",
        )
        .fetch_one(&self.db)
        .await?;

        Ok(count)
    }

    pub async fn create(&self, req: &CreateProductRequest) -> Result<Product, AppError> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (
                name, slug, description, short_description, sku,
                price, sale_price, cost_price, stock_quantity, min_stock_level,
                category_id, image_url, is_active, is_featured, is_digital
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *
            "#,
        )
        .bind(&req.name)
        .bind(&req.slug)
        .bind(&req.description)
        .bind(&req.short_description)
        .bind(&req.sku)
        .bind(req.price)
        .bind(req.sale_price)
        .bind(req.cost_price)
        .bind(req.stock_quantity)
        .bind(req.min_stock_level)
        .bind(req.category_id)
        .bind(&req.image_url)
        .bind(req.is_active)
        .bind(req.is_featured)
        .bind(req.is_digital)
        .fetch_one(&self.db)
        .await?;

        Ok(product)
    }

    pub async fn update(
        &self,
        id: Uuid,
        req: &UpdateProductRequest,
    ) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET
                name = COALESCE($2, name),
                slug = COALESCE($3, slug),
                description = COALESCE($4, description),
                short_description = COALESCE($5, short_description),
                sku = COALESCE($6, sku),
                price = COALESCE($7, price),
                sale_price = COALESCE($8, sale_price),
                cost_price = COALESCE($9, cost_price),
                stock_quantity = COALESCE($10, stock_quantity),
                min_stock_level = COALESCE($11, min_stock_level),
                category_id = COALESCE($12, category_id),
                image_url = COALESCE($13, image_url),
                is_active = COALESCE($14, is_active),
                is_featured = COALESCE($15, is_featured),
                is_digital = COALESCE($16, is_digital),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&req.name)
        .bind(&req.slug)
        .bind(&req.description)
        .bind(&req.short_description)
        .bind(&req.sku)
        .bind(req.price)
        .bind(req.sale_price)
        .bind(req.cost_price)
        .bind(req.stock_quantity)
        .bind(req.min_stock_level)
        .bind(req.category_id)
        .bind(&req.image_url)
        .bind(req.is_active)
        .bind(req.is_featured)
        .bind(req.is_digital)
        .fetch_optional(&self.db)
        .await?;

        Ok(product)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 在事务中锁定单个商品行
    pub async fn lock(conn: &mut PgConnection, id: Uuid) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(product)
    }

    pub async fn set_stock(
        conn: &mut PgConnection,
        id: Uuid,
        stock_quantity: i32,
    ) -> Result<Product, AppError> {
        let product = sqlx::query_as::<_, Product>(
            "UPDATE products SET stock_quantity = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(stock_quantity)
        .fetch_one(&mut *conn)
        .await?;

        Ok(product)
    }
}
