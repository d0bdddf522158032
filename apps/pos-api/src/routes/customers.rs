use axum::extract::State;
use axum::routing::{delete, get, post};
use axum::{Extension, Router};

use pos_core::order::NewCustomer;
use pos_core::{Customer, Paginated};

use crate::auth::Actor;
use crate::error::ApiError;
use crate::extract::{ValidJson, ValidPath, ValidQuery};
use crate::response::ApiResponse;
use crate::routes::{ApiResult, PageQuery, CREATED, DELETED, RETRIEVED, SOFT_DELETED, UPDATED};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/customers", post(create).get(list))
        .route("/customers/deleted", get(list_deleted))
        .route("/customers/{id}", get(show).put(update).delete(destroy))
        .route("/customers/{id}/soft", delete(soft_delete))
}

/// Member codes are assigned here, never taken from the body.
async fn create(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ValidJson(body): ValidJson<NewCustomer>,
) -> ApiResult<Customer> {
    let customer = body.validated()?;
    let customer = state
        .db
        .customers()
        .create(&customer, actor.user_id)
        .await?;
    Ok(ApiResponse::created(CREATED, customer))
}

async fn list(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<PageQuery>,
) -> ApiResult<Paginated<Customer>> {
    let page = state.db.customers().list(query.page_request()?).await?;
    Ok(ApiResponse::ok(RETRIEVED, page))
}

async fn list_deleted(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<PageQuery>,
) -> ApiResult<Paginated<Customer>> {
    let page = state
        .db
        .customers()
        .list_deleted(query.page_request()?)
        .await?;
    Ok(ApiResponse::ok(RETRIEVED, page))
}

async fn show(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i64>,
) -> ApiResult<Customer> {
    let customer = state
        .db
        .customers()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::entity_not_found("customer", id))?;
    Ok(ApiResponse::ok(RETRIEVED, customer))
}

async fn update(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ValidPath(id): ValidPath<i64>,
    ValidJson(body): ValidJson<NewCustomer>,
) -> ApiResult<Customer> {
    let customer = body.validated()?;
    let customer = state
        .db
        .customers()
        .update(id, &customer, actor.user_id)
        .await?;
    Ok(ApiResponse::ok(UPDATED, customer))
}

async fn destroy(State(state): State<AppState>, ValidPath(id): ValidPath<i64>) -> ApiResult<()> {
    state.db.customers().hard_delete(id).await?;
    Ok(ApiResponse::message(DELETED))
}

async fn soft_delete(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ValidPath(id): ValidPath<i64>,
) -> ApiResult<()> {
    state.db.customers().soft_delete(id, actor.user_id).await?;
    Ok(ApiResponse::message(SOFT_DELETED))
}
