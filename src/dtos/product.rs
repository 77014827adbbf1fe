// src/dtos/product.rs
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, FieldErrors};
use crate::models::product::{NewProduct, Product, ProductFilter};
use crate::validation;

const NAME_MAX_LEN: usize = 255;
const CATEGORY_MAX_LEN: usize = 100;
const IMAGE_URL_MAX_LEN: usize = 500;

/// Body of `POST /products/`. Numeric fields stay as raw JSON so that both
/// `"9.99"` and `9.99` are accepted and type problems become field errors.
#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Value>,
    pub category: Option<String>,
    pub stock_quantity: Option<Value>,
    pub image_url: Option<String>,
}

impl CreateProductRequest {
    pub fn validate(self, allow_negative_price: bool) -> Result<NewProduct, AppError> {
        let mut errors = FieldErrors::new();

        let name = validation::required_text(&mut errors, "name", self.name, Some(NAME_MAX_LEN));
        let description = validation::required_text(&mut errors, "description", self.description, None);
        let price = validation::price(&mut errors, "price", self.price, allow_negative_price);
        let category = validation::required_text(&mut errors, "category", self.category, Some(CATEGORY_MAX_LEN));
        let stock_quantity = validation::non_negative_int(&mut errors, "stock_quantity", self.stock_quantity);
        let image_url = validation::optional_url(&mut errors, "image_url", self.image_url, IMAGE_URL_MAX_LEN);

        match (name, description, price, category, stock_quantity) {
            (Some(name), Some(description), Some(price), Some(category), Some(stock_quantity)) if errors.is_empty() => {
                Ok(NewProduct {
                    name,
                    description,
                    price,
                    category,
                    stock_quantity,
                    image_url,
                })
            }
            _ => Err(AppError::Validation(errors)),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: String,
    pub stock_quantity: i32,
    pub image_url: Option<String>,
    pub created_date: String,
}

// Convert from Model to Response DTO
impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            name: product.name,
            description: product.description,
            price: product.price,
            category: product.category,
            stock_quantity: product.stock_quantity,
            image_url: product.image_url,
            created_date: product.created_date.to_rfc3339(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductListQuery {
    pub category: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub in_stock: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

impl ProductListQuery {
    pub fn filter(&self, errors: &mut FieldErrors) -> ProductFilter {
        let category = self
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from);

        let mut bound = |field: &str, raw: Option<&str>| -> Option<Decimal> {
            let raw = raw.map(str::trim).filter(|r| !r.is_empty())?;
            match raw.parse::<Decimal>() {
                Ok(d) => Some(d),
                Err(_) => {
                    errors.add(field, validation::NOT_A_NUMBER);
                    None
                }
            }
        };
        let min_price = bound("min_price", self.min_price.as_deref());
        let max_price = bound("max_price", self.max_price.as_deref());

        let in_stock = match self.in_stock.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
            None => None,
            Some(v) if v.is_empty() => None,
            Some(v) if matches!(v.as_str(), "true" | "1" | "yes") => Some(true),
            Some(v) if matches!(v.as_str(), "false" | "0" | "no") => Some(false),
            Some(_) => {
                errors.add("in_stock", "Must be a valid boolean.");
                None
            }
        };

        ProductFilter {
            category,
            min_price,
            max_price,
            in_stock,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductSearchQuery {
    pub q: Option<String>,
    pub search: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

impl ProductSearchQuery {
    /// `q` wins over the `search` alias; absent means "match everything".
    pub fn text(&self) -> &str {
        self.q
            .as_deref()
            .or(self.search.as_deref())
            .unwrap_or_default()
    }
}
