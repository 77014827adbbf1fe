// src/handlers/product.rs
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Extension, Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use tracing::{info, instrument};

use crate::dtos::pagination::{page_request, Page};
use crate::dtos::product::{CreateProductRequest, ProductListQuery, ProductResponse, ProductSearchQuery};
use crate::error::{AppError, FieldErrors};
use crate::middleware::auth::AuthContext;
use crate::search::SearchQuery;
use crate::state::AppState;

// GET /products/ - List products, optionally filtered
#[instrument(skip(state))]
pub async fn get_products(
    State(state): State<AppState>,
    params: Result<Query<ProductListQuery>, QueryRejection>,
) -> Result<Json<Page<ProductResponse>>, AppError> {
    let Query(params) = params?;
    let mut errors = FieldErrors::new();
    let filter = params.filter(&mut errors);
    let page = page_request(
        params.page.as_deref(),
        params.page_size.as_deref(),
        &state.config.pagination,
        &mut errors,
    );
    errors.into_result()?;

    let products = state.products.list(&filter, page).await?;
    Ok(Json(Page::from_paged(products, page)?))
}

// GET /products/{id}/ - Get single product
#[instrument(skip(state))]
pub async fn get_product(
    id: Result<Path<String>, PathRejection>,
    State(state): State<AppState>,
) -> Result<Json<ProductResponse>, AppError> {
    // undecodable or non-numeric ids can't name a product
    let id: i64 = id
        .ok()
        .and_then(|Path(id)| id.parse().ok())
        .ok_or_else(|| AppError::not_found("Product not found"))?;

    let product = state
        .products
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found"))?;

    Ok(Json(ProductResponse::from(product)))
}

// POST /products/ - Create new product
#[instrument(skip(state, auth, payload))]
pub async fn create_product(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    payload: Result<Json<CreateProductRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ProductResponse>), AppError> {
    let Json(payload) = payload?;
    let new_product = payload.validate(state.config.allow_negative_price)?;

    let product = state.products.insert(new_product).await?;

    let created_by = auth.map(|Extension(ctx)| ctx.username);
    info!(product_id = product.id, ?created_by, "Product created");
    Ok((StatusCode::CREATED, Json(ProductResponse::from(product))))
}

// GET /products/search/?q= - Search products
#[instrument(skip(state))]
pub async fn search_products(
    State(state): State<AppState>,
    params: Result<Query<ProductSearchQuery>, QueryRejection>,
) -> Result<Json<Page<ProductResponse>>, AppError> {
    let Query(params) = params?;
    let mut errors = FieldErrors::new();
    let page = page_request(
        params.page.as_deref(),
        params.page_size.as_deref(),
        &state.config.pagination,
        &mut errors,
    );
    errors.into_result()?;

    let policy = &state.config.search;
    let query = SearchQuery::parse(params.text(), policy.mode);
    let products = state.products.search(policy, &query, page).await?;
    Ok(Json(Page::from_paged(products, page)?))
}
