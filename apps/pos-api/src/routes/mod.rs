//! HTTP handlers, one module per resource.
//!
//! Each module exposes `router()` returning a stateless `Router<AppState>`
//! that `app()` merges under `/api/v1`.

pub mod auth;
pub mod categories;
pub mod customers;
pub mod product_history;
pub mod products;
pub mod reports;
pub mod transactions;
pub mod users;

use serde::Deserialize;

use pos_core::PageRequest;

use crate::error::ApiError;
use crate::response::ApiResponse;

pub type ApiResult<T> = Result<ApiResponse<T>, ApiError>;

pub const CREATED: &str = "created successfully";
pub const UPDATED: &str = "updated successfully";
pub const RETRIEVED: &str = "retrieved successfully";
pub const DELETED: &str = "deleted successfully";
pub const SOFT_DELETED: &str = "soft deleted successfully";

/// `?page=&limit=`
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    pub fn page_request(&self) -> Result<PageRequest, ApiError> {
        Ok(PageRequest::new(self.page, self.limit)?)
    }
}
