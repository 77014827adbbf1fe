// src/store/postgres.rs
use async_trait::async_trait;
use sqlx::{Error as SqlxError, PgPool, Postgres, QueryBuilder};
use tracing::error;

use super::{PageRequest, Paged, ProductStore, StoreError, UserStore};
use crate::models::product::{NewProduct, Product, ProductFilter};
use crate::models::user::{NewUser, User};
use crate::search::{escape_like, SearchMode, SearchPolicy, SearchQuery};

const USER_COLUMNS: &str = "id, username, email, password_hash, first_name, last_name,
    is_active, is_staff, is_superuser, groups, permissions, last_login, date_joined";

const PRODUCT_COLUMNS: &str =
    "id, name, description, price, category, stock_quantity, image_url, created_date";

fn map_unique_violation(err: SqlxError) -> StoreError {
    match err {
        SqlxError::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
            let field = match db_err.constraint() {
                Some("users_email_key") => "email",
                Some("users_username_key") => "username",
                _ => "id",
            };
            StoreError::UniqueViolation(field)
        }
        other => other.into(),
    }
}

fn to_limit_offset(page: PageRequest) -> (i64, i64) {
    (
        i64::try_from(page.limit()).unwrap_or(i64::MAX),
        i64::try_from(page.offset()).unwrap_or(i64::MAX),
    )
}

fn to_total(count: i64) -> u64 {
    u64::try_from(count).unwrap_or(0)
}

#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, new_user: NewUser) -> Result<User, StoreError> {
        let sql = format!(
            "INSERT INTO users (username, email, password_hash, first_name, last_name)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&new_user.username)
            .bind(&new_user.email)
            .bind(&new_user.password_hash)
            .bind(&new_user.first_name)
            .bind(&new_user.last_name)
            .fetch_one(&self.pool)
            .await
            .map_err(map_unique_violation)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list(&self, page: PageRequest) -> Result<Paged<User>, StoreError> {
        let (limit, offset) = to_limit_offset(page);
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id LIMIT $1 OFFSET $2");
        let items = sqlx::query_as::<_, User>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!(?e, "Failed to fetch users");
                e
            })?;
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(Paged { items, total: to_total(total) })
    }

    async fn record_login(&self, id: i64) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    if let Some(category) = &filter.category {
        qb.push(" AND LOWER(category) = LOWER(")
            .push_bind(category.clone())
            .push(")");
    }
    if let Some(min) = filter.min_price {
        qb.push(" AND price >= ").push_bind(min);
    }
    if let Some(max) = filter.max_price {
        qb.push(" AND price <= ").push_bind(max);
    }
    match filter.in_stock {
        Some(true) => {
            qb.push(" AND stock_quantity > 0");
        }
        Some(false) => {
            qb.push(" AND stock_quantity = 0");
        }
        None => {}
    }
}

// Each term becomes one AND-ed group of OR-ed field comparisons.
fn push_search(qb: &mut QueryBuilder<'_, Postgres>, policy: &SearchPolicy, query: &SearchQuery) {
    for term in &query.terms {
        qb.push(" AND (");
        for (i, field) in policy.fields.iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            match policy.mode {
                SearchMode::Substring => {
                    qb.push(field.column())
                        .push(" ILIKE ")
                        .push_bind(format!("%{}%", escape_like(term)))
                        .push(" ESCAPE '\\'");
                }
                SearchMode::Exact => {
                    qb.push("LOWER(")
                        .push(field.column())
                        .push(") = ")
                        .push_bind(term.clone());
                }
            }
        }
        qb.push(")");
    }
}

#[derive(Debug, Clone)]
pub struct PgProductStore {
    pool: PgPool,
}

impl PgProductStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_page<F>(&self, page: PageRequest, narrow: F) -> Result<Paged<Product>, StoreError>
    where
        F: Fn(&mut QueryBuilder<'_, Postgres>),
    {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products WHERE TRUE");
        narrow(&mut count);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let (limit, offset) = to_limit_offset(page);
        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE TRUE"));
        narrow(&mut select);
        select
            .push(" ORDER BY id LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let items = select
            .build_query_as::<Product>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!(?e, "Failed to fetch products");
                e
            })?;

        Ok(Paged { items, total: to_total(total) })
    }
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn insert(&self, new_product: NewProduct) -> Result<Product, StoreError> {
        let sql = format!(
            "INSERT INTO products (name, description, price, category, stock_quantity, image_url)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {PRODUCT_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Product>(&sql)
            .bind(&new_product.name)
            .bind(&new_product.description)
            .bind(new_product.price)
            .bind(&new_product.category)
            .bind(new_product.stock_quantity)
            .bind(&new_product.image_url)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Product>, StoreError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        Ok(sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list(&self, filter: &ProductFilter, page: PageRequest) -> Result<Paged<Product>, StoreError> {
        self.fetch_page(page, |qb| push_filter(qb, filter)).await
    }

    async fn search(
        &self,
        policy: &SearchPolicy,
        query: &SearchQuery,
        page: PageRequest,
    ) -> Result<Paged<Product>, StoreError> {
        self.fetch_page(page, |qb| push_search(qb, policy, query)).await
    }
}
