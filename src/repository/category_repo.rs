//! Category repository

use sqlx::PgPool;
use uuid::Uuid;

use crate::{error::AppError, models::category::*};

pub struct CategoryRepository {
    db: PgPool,
}

impl CategoryRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Category>, AppError> {
        let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(category)
    }

    pub async fn exists_by_name(&self, name: &str, exclude: Option<Uuid>) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM categories WHERE lower(name) = lower($1) AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(name)
        .bind(exclude)
        .fetch_one(&self.db)
        .await?;

        Ok(exists)
    }

    pub async fn exists_by_slug(&self, slug: &str, exclude: Option<Uuid>) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM categories WHERE slug = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(slug)
        .bind(exclude)
        .fetch_one(&self.db)
        .await?;

        Ok(exists)
    }

    pub async fn list(
        &self,
        active_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Category>, AppError> {
        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT * FROM categories
            WHERE (NOT $1 OR is_active)
            ORDER BY sort_order, name
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(active_only)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        Ok(categories)
    }

    pub async fn count(&self, active_only: bool) -> Result<i64, AppError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE (NOT $1 OR is_active)")
                .bind(active_only)
                .fetch_one(&self.db)
                .await?;

        Ok(count)
    }

    /// 直接子分类
    pub async fn children(&self, parent_id: Uuid, active_only: bool) -> Result<Vec<Category>, AppError> {
        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT * FROM categories
            WHERE parent_id = $1 AND (NOT $2 OR is_active)
            ORDER BY sort_order, name
            "#,
        )
        .bind(parent_id)
        .bind(active_only)
        .fetch_all(&self.db)
        .await?;

        Ok(categories)
    }

    /// `ancestor` 是否为 `id` 自身或其祖先
    pub async fn is_ancestor_or_self(&self, ancestor: Uuid, id: Uuid) -> Result<bool, AppError> {
        let found: bool = sqlx::query_scalar(
            r#"
            WITH RECURSIVE chain AS (
                SELECT id, parent_id FROM categories WHERE id = $2
                UNION
                SELECT c.id, c.parent_id FROM categories c JOIN chain ON c.id = chain.parent_id
            )
            SELECT EXISTS(SELECT 1 FROM chain WHERE id = $1)
            "#,
        )
        .bind(ancestor)
        .bind(id)
        .fetch_one(&self.db)
        .await?;

        Ok(found)
    }

    pub async fn create(&self, req: &CreateCategoryRequest) -> Result<Category, AppError> {
        let category = sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (name, slug, description, parent_id, image_url, is_active, sort_order)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(&req.name)
        .bind(&req.slug)
        .bind(&req.description)
        .bind(req.parent_id)
        .bind(&req.image_url)
        .bind(req.is_active)
        .bind(req.sort_order)
        .fetch_one(&self.db)
        .await?;

        Ok(category)
    }

    pub async fn update(
        &self,
        id: Uuid,
        req: &UpdateCategoryRequest,
    ) -> Result<Option<Category>, AppError> {
        let category = sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories
            SET
                name = COALESCE($2, name),
                slug = COALESCE($3, slug),
                description = COALESCE($4, description),
                parent_id = COALESCE($5, parent_id),
                image_url = COALESCE($6, image_url),
                is_active = COALESCE($7, is_active),
                sort_order = COALESCE($8, sort_order),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&req.name)
        .bind(&req.slug)
        .bind(&req.description)
        .bind(req.parent_id)
        .bind(&req.image_url)
        .bind(req.is_active)
        .bind(req.sort_order)
        .fetch_optional(&self.db)
        .await?;

        Ok(category)
    }

    pub async fn count_children(&self, id: Uuid) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE parent_id = $1")
            .bind(id)
            .fetch_one(&self.db)
            .await?;

        Ok(count)
    }

    pub async fn count_products(&self, id: Uuid) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE category_id = $1")
            .bind(id)
            .fetch_one(&self.db)
            .await?;

        Ok(count)
    }

    /// 删除分类；强制删除时子分类上移为根分类，分类下的商品一并删除
    pub async fn delete(&self, id: Uuid, force: bool) -> Result<bool, AppError> {
        let mut tx = self.db.begin().await?;

        if force {
            sqlx::query("UPDATE categories SET parent_id = NULL, updated_at = NOW() WHERE parent_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM products WHERE category_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }
}
