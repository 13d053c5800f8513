//! 分类服务

use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    error::AppError,
    models::{category::*, PageRequest, Paginated},
    repository::CategoryRepository,
};

pub struct CategoryService {
    repo: CategoryRepository,
    config: Arc<AppConfig>,
}

impl CategoryService {
    pub fn new(db: PgPool, config: Arc<AppConfig>) -> Self {
        Self {
            repo: CategoryRepository::new(db),
            config,
        }
    }

    pub async fn list(&self, query: &CategoryListQuery) -> Result<Paginated<Category>, AppError> {
        let page = PageRequest::resolve(query.page, query.page_size, &self.config.pagination);
        let active_only = query.active_only.unwrap_or(true);

        let categories = self
            .repo
            .list(active_only, page.limit(), page.offset())
            .await?;
        let total = self.repo.count(active_only).await?;

        Ok(Paginated::new(categories, total, page))
    }

    pub async fn get(&self, id: Uuid) -> Result<Category, AppError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Category"))
    }

    pub async fn subcategories(&self, id: Uuid) -> Result<Vec<Category>, AppError> {
        // 父分类不存在时返回 404 而不是空列表
        self.get(id).await?;
        self.repo.children(id, true).await
    }

    /// 父分类必须存在且启用
    async fn ensure_parent(&self, parent_id: Uuid) -> Result<(), AppError> {
        match self.repo.find_by_id(parent_id).await? {
            Some(parent) if parent.is_active => Ok(()),
            Some(_) => Err(AppError::bad_request("Parent category is inactive")),
            None => Err(AppError::bad_request("Parent category not found")),
        }
    }

    pub async fn create(&self, req: CreateCategoryRequest) -> Result<Category, AppError> {
        if self.repo.exists_by_name(&req.name, None).await? {
            return Err(AppError::conflict("Category name already exists"));
        }
        if self.repo.exists_by_slug(&req.slug, None).await? {
            return Err(AppError::conflict("Category slug already exists"));
        }
        if let Some(parent_id) = req.parent_id {
            self.ensure_parent(parent_id).await?;
        }

        let category = self.repo.create(&req).await?;

        tracing::info!(category_id = %category.id, slug = %category.slug, "Category created");

        Ok(category)
    }

    pub async fn update(&self, id: Uuid, req: UpdateCategoryRequest) -> Result<Category, AppError> {
        self.get(id).await?;

        if let Some(name) = &req.name {
            if self.repo.exists_by_name(name, Some(id)).await? {
                return Err(AppError::conflict("Category name already exists"));
            }
        }
        if let Some(slug) = &req.slug {
            if self.repo.exists_by_slug(slug, Some(id)).await? {
                return Err(AppError::conflict("Category slug already exists"));
            }
        }

        if let Some(parent_id) = req.parent_id {
            // 新父分类不能是自己或自己的后代
            if self.repo.is_ancestor_or_self(id, parent_id).await? {
                return Err(AppError::bad_request(
                    "Category cannot be its own parent or descendant",
                ));
            }
            self.ensure_parent(parent_id).await?;
        }

        let category = self
            .repo
            .update(id, &req)
            .await?
            .ok_or_else(|| AppError::not_found("Category"))?;

        tracing::info!(category_id = %id, "Category updated");

        Ok(category)
    }

    /// 有子分类或商品时需要 `force`
    pub async fn delete(&self, id: Uuid, force: bool) -> Result<(), AppError> {
        self.get(id).await?;

        if !force {
            if self.repo.count_children(id).await? > 0 {
                return Err(AppError::bad_request(
                    "Category has subcategories; use force=true to delete",
                ));
            }
            if self.repo.count_products(id).await? > 0 {
                return Err(AppError::bad_request(
                    "Category has products; use force=true to delete",
                ));
            }
        }

        if !self.repo.delete(id, force).await? {
            return Err(AppError::not_found("Category"));
        }

        tracing::info!(category_id = %id, force, "Category deleted");

        Ok(())
    }
}
