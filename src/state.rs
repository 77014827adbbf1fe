// src/state.rs
use std::sync::Arc;

use crate::config::AppConfig;
use crate::store::{MemoryProductStore, MemoryUserStore, PgProductStore, PgUserStore, ProductStore, UserStore};
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub products: Arc<dyn ProductStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(users: Arc<dyn UserStore>, products: Arc<dyn ProductStore>, config: AppConfig) -> Self {
        Self { users, products, config: Arc::new(config) }
    }

    pub fn postgres(db_pool: PgPool, config: AppConfig) -> Self {
        Self::new(
            Arc::new(PgUserStore::new(db_pool.clone())),
            Arc::new(PgProductStore::new(db_pool)),
            config,
        )
    }

    pub fn in_memory(config: AppConfig) -> Self {
        Self::new(Arc::new(MemoryUserStore::new()), Arc::new(MemoryProductStore::new()), config)
    }
}
