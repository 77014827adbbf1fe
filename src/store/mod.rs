//! Storage ports for the identity and catalog stores.
//!
//! Handlers only talk to these traits. Production runs them on PostgreSQL
//! (`postgres`), local runs and tests can use the in-memory adapter
//! (`memory`). Uniqueness of usernames and emails is the store's job, not
//! the handler's: a duplicate surfaces as [`StoreError::UniqueViolation`].

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::product::{NewProduct, Product, ProductFilter};
use crate::models::user::{NewUser, User};
use crate::search::{SearchPolicy, SearchQuery};

pub use memory::{MemoryProductStore, MemoryUserStore};
pub use postgres::{PgProductStore, PgUserStore};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write; carries the offending field.
    #[error("duplicate value for {0}")]
    UniqueViolation(&'static str),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// One page of a listing, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.page_size)
    }
}

/// A page of rows plus the size of the whole result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub total: u64,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, new_user: NewUser) -> Result<User, StoreError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    async fn list(&self, page: PageRequest) -> Result<Paged<User>, StoreError>;
    async fn record_login(&self, id: i64) -> Result<(), StoreError>;
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn insert(&self, new_product: NewProduct) -> Result<Product, StoreError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Product>, StoreError>;
    async fn list(&self, filter: &ProductFilter, page: PageRequest) -> Result<Paged<Product>, StoreError>;
    async fn search(
        &self,
        policy: &SearchPolicy,
        query: &SearchQuery,
        page: PageRequest,
    ) -> Result<Paged<Product>, StoreError>;
}
