//! 购物车服务

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{cart::*, product::Product},
    repository::{CartRepository, ProductRepository},
};

pub struct CartService {
    carts: CartRepository,
    products: ProductRepository,
}

/// 购物车行数量必须在库存与单行上限之内
fn check_quantity(product: &Product, quantity: i32) -> Result<(), AppError> {
    if quantity > MAX_LINE_QUANTITY {
        return Err(AppError::bad_request(&format!(
            "Quantity cannot exceed {} per item",
            MAX_LINE_QUANTITY
        )));
    }
    if quantity > product.stock_quantity {
        return Err(AppError::bad_request(&format!(
            "Insufficient stock: {} available",
            product.stock_quantity.max(0)
        )));
    }
    Ok(())
}

impl CartService {
    pub fn new(db: PgPool) -> Self {
        Self {
            carts: CartRepository::new(db.clone()),
            products: ProductRepository::new(db),
        }
    }

    pub async fn get(&self, user_id: Uuid) -> Result<CartResponse, AppError> {
        let cart = self.carts.get_or_create_active(user_id).await?;
        let lines = self.carts.lines(cart.id).await?;

        CartResponse::new(&cart, lines)
    }

    pub async fn summary(&self, user_id: Uuid) -> Result<CartSummary, AppError> {
        let Some(cart) = self.carts.find_active(user_id).await? else {
            return CartSummary::from_lines(&[]);
        };
        let lines = self.carts.lines(cart.id).await?;

        CartSummary::from_lines(&lines)
    }

    /// 下单前检查每一行的商品状态与库存
    pub async fn validate(&self, user_id: Uuid) -> Result<CartValidation, AppError> {
        let lines = match self.carts.find_active(user_id).await? {
            Some(cart) => self.carts.lines(cart.id).await?,
            None => Vec::new(),
        };

        let issues: Vec<CartIssue> = lines.iter().filter_map(CartLine::issue).collect();

        Ok(CartValidation {
            valid: !lines.is_empty() && issues.is_empty(),
            issues,
        })
    }

    async fn available_product(&self, product_id: Uuid) -> Result<Product, AppError> {
        match self.products.find_by_id(product_id).await? {
            Some(product) if product.is_active => Ok(product),
            Some(_) => Err(AppError::bad_request("Product is not available")),
            None => Err(AppError::not_found("Product")),
        }
    }

    /// 加入购物车；同一商品已在车中时数量累加
    pub async fn add_item(
        &self,
        user_id: Uuid,
        req: AddCartItemRequest,
    ) -> Result<CartResponse, AppError> {
        let product = self.available_product(req.product_id).await?;
        let cart = self.carts.get_or_create_active(user_id).await?;

        let existing = self
            .carts
            .find_item_by_product(cart.id, product.id)
            .await?
            .map(|item| item.quantity)
            .unwrap_or(0);
        let quantity = existing + req.quantity;
        check_quantity(&product, quantity)?;

        self.carts
            .upsert_item(cart.id, product.id, quantity, product.current_price())
            .await?;

        tracing::debug!(cart_id = %cart.id, product_id = %product.id, quantity, "Cart item added");

        let lines = self.carts.lines(cart.id).await?;
        CartResponse::new(&cart, lines)
    }

    pub async fn update_item(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        req: UpdateCartItemRequest,
    ) -> Result<CartResponse, AppError> {
        let cart = self.carts.get_or_create_active(user_id).await?;
        let item = self
            .carts
            .find_item(cart.id, item_id)
            .await?
            .ok_or_else(|| AppError::not_found("Cart item"))?;

        let product = self.available_product(item.product_id).await?;
        check_quantity(&product, req.quantity)?;

        self.carts
            .update_quantity(cart.id, item_id, req.quantity)
            .await?
            .ok_or_else(|| AppError::not_found("Cart item"))?;

        let lines = self.carts.lines(cart.id).await?;
        CartResponse::new(&cart, lines)
    }

    pub async fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> Result<CartResponse, AppError> {
        let cart = self.carts.get_or_create_active(user_id).await?;

        if !self.carts.remove_item(cart.id, item_id).await? {
            return Err(AppError::not_found("Cart item"));
        }

        let lines = self.carts.lines(cart.id).await?;
        CartResponse::new(&cart, lines)
    }

    pub async fn clear(&self, user_id: Uuid) -> Result<(), AppError> {
        if let Some(cart) = self.carts.find_active(user_id).await? {
            let removed = self.carts.clear(cart.id).await?;
            tracing::debug!(cart_id = %cart.id, removed, "Cart cleared");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(stock: i32) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: "Keyboard".to_string(),
            slug: "keyboard".to_string(),
            description: None,
            short_description: None,
            sku: "KEY-1".to_string(),
            price: 4900,
            sale_price: None,
            cost_price: None,
            stock_quantity: stock,
            min_stock_level: 5,
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
    fn test_quantity_within_stock() {
        assert!(check_quantity(&product(3), 3).is_ok());
        assert!(matches!(
            check_quantity(&product(3), 4),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_quantity_line_limit() {
        let plenty = product(5000);
        assert!(check_quantity(&plenty, MAX_LINE_QUANTITY).is_ok());
        assert!(check_quantity(&plenty, MAX_LINE_QUANTITY + 1).is_err());
    }
}
