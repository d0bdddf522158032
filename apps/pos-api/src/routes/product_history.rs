use axum::extract::State;
use axum::routing::get;
use axum::{Extension, Router};

use pos_core::stock::StockAdjustmentRequest;
use pos_core::{Paginated, ProductHistory};
use pos_db::adjust_stock;

use crate::auth::Actor;
use crate::extract::{ValidJson, ValidQuery};
use crate::response::ApiResponse;
use crate::routes::{ApiResult, PageQuery, CREATED, RETRIEVED};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/product-history", get(list).post(create))
}

/// Newest entries first.
async fn list(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<PageQuery>,
) -> ApiResult<Paginated<ProductHistory>> {
    let page = state.db.history().list(query.page_request()?).await?;
    Ok(ApiResponse::ok(RETRIEVED, page))
}

/// Manual adjustment: goods received, write-off, count correction.
async fn create(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ValidJson(body): ValidJson<StockAdjustmentRequest>,
) -> ApiResult<ProductHistory> {
    let adjustment = body.validated()?;
    let entry = adjust_stock(&state.db, actor.user_id, adjustment).await?;
    Ok(ApiResponse::created(CREATED, entry))
}
