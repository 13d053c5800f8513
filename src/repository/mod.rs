//! Database repository layer

pub mod cart_repo;
pub mod category_repo;
pub mod order_repo;
pub mod product_repo;
pub mod user_repo;

pub use cart_repo::CartRepository;
pub use category_repo::CategoryRepository;
pub use order_repo::{NewOrder, OrderRepository};
pub use product_repo::ProductRepository;
pub use user_repo::{CredentialStore, UserFilter, UserRepository};
