//! HTTP 处理器模块

pub mod auth;
pub mod cart;
pub mod category;
pub mod health;
pub mod order;
pub mod product;
pub mod user;
