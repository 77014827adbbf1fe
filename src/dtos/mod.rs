pub mod auth;
pub mod pagination;
pub mod product;
pub mod user;
