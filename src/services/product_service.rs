//! 商品服务

use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    error::AppError,
    models::{product::*, PageRequest, Paginated},
    repository::{CategoryRepository, ProductRepository},
    validation::FieldErrors,
};

/// 计算库存调整后的数量
pub fn apply_stock_operation(
    current: i32,
    operation: StockOperation,
    quantity: i32,
) -> Result<i32, AppError> {
    match operation {
        StockOperation::Add => current
            .checked_add(quantity)
            .ok_or_else(|| AppError::bad_request("Stock quantity overflow")),
        StockOperation::Subtract if quantity > current => Err(AppError::bad_request(&format!(
            "Insufficient stock: {} available, {} requested",
            current, quantity
        ))),
        StockOperation::Subtract => Ok(current - quantity),
        StockOperation::Set => Ok(quantity),
    }
}

pub struct ProductService {
    db: PgPool,
    repo: ProductRepository,
    categories: CategoryRepository,
    config: Arc<AppConfig>,
}

impl ProductService {
    pub fn new(db: PgPool, config: Arc<AppConfig>) -> Self {
        Self {
            repo: ProductRepository::new(db.clone()),
            categories: CategoryRepository::new(db.clone()),
            db,
            config,
        }
    }

    pub async fn search(
        &self,
        query: &ProductSearchQuery,
    ) -> Result<Paginated<ProductResponse>, AppError> {
        let page = PageRequest::resolve(query.page, query.page_size, &self.config.pagination);

        let products = self.repo.search(query, page.limit(), page.offset()).await?;
        let total = self.repo.count_search(query).await?;

        Ok(Paginated::new(products, total, page).map(ProductResponse::from))
    }

    pub async fn get(&self, id: Uuid) -> Result<Product, AppError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Product"))
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Product, AppError> {
        self.repo
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::not_found("Product"))
    }

    pub async fn low_stock(
        &self,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> Result<Paginated<ProductResponse>, AppError> {
        let page = PageRequest::resolve(page, page_size, &self.config.pagination);

        let products = self.repo.low_stock(page.limit(), page.offset()).await?;
        let total = self.repo.count_low_stock().await?;

        Ok(Paginated::new(products, total, page).map(ProductResponse::from))
    }

    async fn ensure_category(&self, category_id: Uuid) -> Result<(), AppError> {
        if self.categories.find_by_id(category_id).await?.is_none() {
            return Err(AppError::bad_request("Category not found"));
        }
        Ok(())
    }

    pub async fn create(&self, req: CreateProductRequest) -> Result<Product, AppError> {
        self.ensure_category(req.category_id).await?;

        if self.repo.exists_by_sku(&req.sku, None).await? {
            return Err(AppError::conflict("SKU already exists"));
        }
        if self.repo.exists_by_slug(&req.slug, None).await? {
            return Err(AppError::conflict("Product slug already exists"));
        }

        let product = self.repo.create(&req).await?;

        tracing::info!(product_id = %product.id, sku = %product.sku, "Product created");

        Ok(product)
    }

    pub async fn update(&self, id: Uuid, req: UpdateProductRequest) -> Result<Product, AppError> {
        let existing = self.get(id).await?;

        // 只改其中一个价格时与库中的另一个比较
        let price = req.price.unwrap_or(existing.price);
        let sale_price = req.sale_price.or(existing.sale_price);
        if req.price.is_some() || req.sale_price.is_some() {
            let mut errors = FieldErrors::default();
            check_sale_price(Some(price), sale_price, &mut errors);
            errors.into_result()?;
        }

        if let Some(category_id) = req.category_id {
            self.ensure_category(category_id).await?;
        }
        if let Some(sku) = &req.sku {
            if self.repo.exists_by_sku(sku, Some(id)).await? {
                return Err(AppError::conflict("SKU already exists"));
            }
        }
        if let Some(slug) = &req.slug {
            if self.repo.exists_by_slug(slug, Some(id)).await? {
                return Err(AppError::conflict("Product slug already exists"));
            }
        }

        let product = self
            .repo
            .update(id, &req)
            .await?
            .ok_or_else(|| AppError::not_found("Product"))?;

        tracing::info!(product_id = %id, "Product updated");

        Ok(product)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        if !self.repo.delete(id).await? {
            return Err(AppError::not_found("Product"));
        }

        tracing::info!(product_id = %id, "Product deleted");

        Ok(())
    }

    /// 调整库存，在事务中锁定商品行
    pub async fn update_stock(
        &self,
        id: Uuid,
        req: StockUpdateRequest,
    ) -> Result<Product, AppError> {
        let mut tx = self.db.begin().await?;

        let product = ProductRepository::lock(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::not_found("Product"))?;

        let stock = apply_stock_operation(product.stock_quantity, req.operation, req.quantity)?;
        let updated = ProductRepository::set_stock(&mut *tx, id, stock).await?;

        tx.commit().await?;

        tracing::info!(
            product_id = %id,
            from = product.stock_quantity,
            to = stock,
            "Stock updated"
        );

        if updated.is_low_stock() {
            tracing::warn!(product_id = %id, stock, "Product stock is low");
        }

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_add_and_set() {
        assert_eq!(apply_stock_operation(10, StockOperation::Add, 5).unwrap(), 15);
        assert_eq!(apply_stock_operation(10, StockOperation::Set, 3).unwrap(), 3);
        assert_eq!(apply_stock_operation(10, StockOperation::Set, 0).unwrap(), 0);
    }

    #[test]
    fn test_stock_subtract() {
        assert_eq!(
            apply_stock_operation(10, StockOperation::Subtract, 10).unwrap(),
            0
        );

        let err = apply_stock_operation(2, StockOperation::Subtract, 3).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_stock_overflow() {
        let err = apply_stock_operation(i32::MAX, StockOperation::Add, 1).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
