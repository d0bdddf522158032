use axum::extract::State;
use axum::routing::{delete, get, post};
use axum::{Extension, Router};
use serde::Deserialize;

use pos_core::validation::validate_name;
use pos_core::{Category, Paginated};

use crate::auth::Actor;
use crate::error::ApiError;
use crate::extract::{ValidJson, ValidPath, ValidQuery};
use crate::response::ApiResponse;
use crate::routes::{ApiResult, PageQuery, CREATED, DELETED, RETRIEVED, SOFT_DELETED, UPDATED};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", post(create).get(list))
        .route("/categories/deleted", get(list_deleted))
        .route("/categories/{id}", get(show).put(update).delete(destroy))
        .route("/categories/{id}/soft", delete(soft_delete))
}

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
}

async fn create(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ValidJson(body): ValidJson<CategoryRequest>,
) -> ApiResult<Category> {
    let name = validate_name("name", &body.name, 100)?;
    let category = state.db.categories().create(&name, actor.user_id).await?;
    Ok(ApiResponse::created(CREATED, category))
}

async fn list(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<PageQuery>,
) -> ApiResult<Paginated<Category>> {
    let page = state.db.categories().list(query.page_request()?).await?;
    Ok(ApiResponse::ok(RETRIEVED, page))
}

async fn list_deleted(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<PageQuery>,
) -> ApiResult<Paginated<Category>> {
    let page = state
        .db
        .categories()
        .list_deleted(query.page_request()?)
        .await?;
    Ok(ApiResponse::ok(RETRIEVED, page))
}

async fn show(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i64>,
) -> ApiResult<Category> {
    let category = state
        .db
        .categories()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::entity_not_found("category", id))?;
    Ok(ApiResponse::ok(RETRIEVED, category))
}

async fn update(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ValidPath(id): ValidPath<i64>,
    ValidJson(body): ValidJson<CategoryRequest>,
) -> ApiResult<Category> {
    let name = validate_name("name", &body.name, 100)?;
    let category = state
        .db
        .categories()
        .update(id, &name, actor.user_id)
        .await?;
    Ok(ApiResponse::ok(UPDATED, category))
}

async fn destroy(State(state): State<AppState>, ValidPath(id): ValidPath<i64>) -> ApiResult<()> {
    state.db.categories().hard_delete(id).await?;
    Ok(ApiResponse::message(DELETED))
}

async fn soft_delete(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ValidPath(id): ValidPath<i64>,
) -> ApiResult<()> {
    state.db.categories().soft_delete(id, actor.user_id).await?;
    Ok(ApiResponse::message(SOFT_DELETED))
}
