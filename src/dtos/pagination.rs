// src/dtos/pagination.rs
use serde::Serialize;

use crate::config::PaginationConfig;
use crate::error::{AppError, FieldErrors};
use crate::store::{PageRequest, Paged};

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: u64,
    pub page: u32,
    pub page_size: u32,
    pub next: Option<u32>,
    pub previous: Option<u32>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Wrap a store page, rejecting pages past the end of the collection.
    pub fn from_paged<U>(paged: Paged<U>, request: PageRequest) -> Result<Self, AppError>
    where
        T: From<U>,
    {
        if request.page > 1 && request.offset() >= paged.total {
            return Err(AppError::not_found("Invalid page."));
        }

        let seen = request.offset() + paged.items.len() as u64;
        Ok(Self {
            count: paged.total,
            page: request.page,
            page_size: request.page_size,
            next: (seen < paged.total).then_some(request.page + 1),
            previous: (request.page > 1).then_some(request.page - 1),
            results: paged.items.into_iter().map(T::from).collect(),
        })
    }
}

/// Resolve `?page=` / `?page_size=`. An unparseable `page_size` falls back to
/// the default and oversized values are clamped; a bad `page` is an error.
pub fn page_request(
    page: Option<&str>,
    page_size: Option<&str>,
    config: &PaginationConfig,
    errors: &mut FieldErrors,
) -> PageRequest {
    let page = match page.map(str::trim).filter(|p| !p.is_empty()) {
        None => 1,
        Some(raw) => match raw.parse::<u32>() {
            Ok(n) if n >= 1 => n,
            _ => {
                errors.add("page", "A valid page number is required.");
                1
            }
        },
    };

    let page_size = page_size
        .and_then(|raw| raw.trim().parse::<u32>().ok())
        .filter(|n| *n >= 1)
        .map(|n| n.min(config.max_page_size))
        .unwrap_or(config.default_page_size);

    PageRequest { page, page_size }
}
