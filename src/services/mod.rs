//! Business logic services layer

pub mod auth_service;
pub mod cart_service;
pub mod category_service;
pub mod order_service;
pub mod product_service;
pub mod user_service;

pub use auth_service::AuthService;
pub use cart_service::CartService;
pub use category_service::CategoryService;
pub use order_service::OrderService;
pub use product_service::ProductService;
pub use user_service::UserService;
