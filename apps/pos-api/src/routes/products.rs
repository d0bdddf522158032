//! Product catalog. Stock is read-only here; it moves through
//! `/product-history` and the transaction endpoints.

use axum::extract::State;
use axum::routing::{delete, get, post};
use axum::{Extension, Router};
use serde::Deserialize;

use pos_core::validation::{validate_id, validate_name, validate_price};
use pos_core::{Money, Paginated, Product, ProductHistory};
use pos_db::repository::product::ProductInput;

use crate::auth::Actor;
use crate::error::ApiError;
use crate::extract::{ValidJson, ValidPath, ValidQuery};
use crate::response::ApiResponse;
use crate::routes::{ApiResult, PageQuery, CREATED, DELETED, RETRIEVED, SOFT_DELETED, UPDATED};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", post(create).get(list))
        .route("/products/deleted", get(list_deleted))
        .route("/products/{id}", get(show).put(update).delete(destroy))
        .route("/products/{id}/soft", delete(soft_delete))
        .route("/products/{id}/history", get(history))
}

/// `price` accepts `"12.50"` or `12.5`.
#[derive(Debug, Deserialize)]
pub struct ProductRequest {
    pub name: String,
    pub price: Money,
    #[serde(default)]
    pub category_id: Option<i64>,
}

impl ProductRequest {
    fn into_input(self) -> Result<ProductInput, ApiError> {
        let name = validate_name("name", &self.name, 100)?;
        validate_price(self.price)?;
        if let Some(category_id) = self.category_id {
            validate_id("category_id", category_id)?;
        }
        Ok(ProductInput {
            name,
            price: self.price,
            category_id: self.category_id,
        })
    }
}

async fn create(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ValidJson(body): ValidJson<ProductRequest>,
) -> ApiResult<Product> {
    let input = body.into_input()?;
    let product = state.db.products().create(&input, actor.user_id).await?;
    Ok(ApiResponse::created(CREATED, product))
}

async fn list(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<PageQuery>,
) -> ApiResult<Paginated<Product>> {
    let page = state.db.products().list(query.page_request()?).await?;
    Ok(ApiResponse::ok(RETRIEVED, page))
}

async fn list_deleted(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<PageQuery>,
) -> ApiResult<Paginated<Product>> {
    let page = state
        .db
        .products()
        .list_deleted(query.page_request()?)
        .await?;
    Ok(ApiResponse::ok(RETRIEVED, page))
}

async fn show(State(state): State<AppState>, ValidPath(id): ValidPath<i64>) -> ApiResult<Product> {
    let product = state
        .db
        .products()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::entity_not_found("product", id))?;
    Ok(ApiResponse::ok(RETRIEVED, product))
}

async fn update(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ValidPath(id): ValidPath<i64>,
    ValidJson(body): ValidJson<ProductRequest>,
) -> ApiResult<Product> {
    let input = body.into_input()?;
    let product = state
        .db
        .products()
        .update(id, &input, actor.user_id)
        .await?;
    Ok(ApiResponse::ok(UPDATED, product))
}

async fn destroy(State(state): State<AppState>, ValidPath(id): ValidPath<i64>) -> ApiResult<()> {
    state.db.products().hard_delete(id).await?;
    Ok(ApiResponse::message(DELETED))
}

async fn soft_delete(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ValidPath(id): ValidPath<i64>,
) -> ApiResult<()> {
    state.db.products().soft_delete(id, actor.user_id).await?;
    Ok(ApiResponse::message(SOFT_DELETED))
}

/// Full ledger of one product, oldest first. Includes soft-deleted products.
async fn history(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i64>,
) -> ApiResult<Vec<ProductHistory>> {
    state
        .db
        .products()
        .get_any(id)
        .await?
        .ok_or_else(|| ApiError::entity_not_found("product", id))?;

    let ledger = state.db.history().list_for_product(id).await?;
    Ok(ApiResponse::ok(RETRIEVED, ledger))
}
