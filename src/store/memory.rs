// src/store/memory.rs
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{PageRequest, Paged, ProductStore, StoreError, UserStore};
use crate::models::product::{NewProduct, Product, ProductFilter};
use crate::models::user::{NewUser, User};
use crate::search::{SearchPolicy, SearchQuery};

fn paginate<T: Clone>(rows: Vec<&T>, page: PageRequest) -> Paged<T> {
    let total = rows.len() as u64;
    let items = rows
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .cloned()
        .collect();
    Paged { items, total }
}

/// Users held in process memory, ordered by id.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    rows: RwLock<Vec<User>>,
    next_id: AtomicI64,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, new_user: NewUser) -> Result<User, StoreError> {
        // the write lock is held across the uniqueness check and the push
        let mut rows = self.rows.write().await;
        if rows.iter().any(|u| u.username == new_user.username) {
            return Err(StoreError::UniqueViolation("username"));
        }
        if rows.iter().any(|u| u.email == new_user.email) {
            return Err(StoreError::UniqueViolation("email"));
        }

        let user = User {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            is_active: true,
            is_staff: false,
            is_superuser: false,
            groups: Vec::new(),
            permissions: Vec::new(),
            last_login: None,
            date_joined: Utc::now(),
        };
        rows.push(user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.rows.read().await.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self.rows.read().await.iter().find(|u| u.username == username).cloned())
    }

    async fn list(&self, page: PageRequest) -> Result<Paged<User>, StoreError> {
        let rows = self.rows.read().await;
        Ok(paginate(rows.iter().collect(), page))
    }

    async fn record_login(&self, id: i64) -> Result<(), StoreError> {
        if let Some(user) = self.rows.write().await.iter_mut().find(|u| u.id == id) {
            user.last_login = Some(Utc::now());
        }
        Ok(())
    }
}

/// Products held in process memory, ordered by id.
#[derive(Debug, Default)]
pub struct MemoryProductStore {
    rows: RwLock<Vec<Product>>,
    next_id: AtomicI64,
}

impl MemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductStore for MemoryProductStore {
    async fn insert(&self, new_product: NewProduct) -> Result<Product, StoreError> {
        let mut rows = self.rows.write().await;
        let product = Product {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            name: new_product.name,
            description: new_product.description,
            price: new_product.price,
            category: new_product.category,
            stock_quantity: new_product.stock_quantity,
            image_url: new_product.image_url,
            created_date: Utc::now(),
        };
        rows.push(product.clone());
        Ok(product)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Product>, StoreError> {
        Ok(self.rows.read().await.iter().find(|p| p.id == id).cloned())
    }

    async fn list(&self, filter: &ProductFilter, page: PageRequest) -> Result<Paged<Product>, StoreError> {
        let rows = self.rows.read().await;
        Ok(paginate(rows.iter().filter(|p| filter.matches(p)).collect(), page))
    }

    async fn search(
        &self,
        policy: &SearchPolicy,
        query: &SearchQuery,
        page: PageRequest,
    ) -> Result<Paged<Product>, StoreError> {
        let rows = self.rows.read().await;
        Ok(paginate(rows.iter().filter(|p| policy.matches(p, query)).collect(), page))
    }
}
