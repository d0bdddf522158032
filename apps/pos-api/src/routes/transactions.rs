//! Orders and refunds. Both run as one unit of work inside pos-db; a
//! failure response means nothing was written.

use axum::extract::State;
use axum::routing::post;
use axum::{Extension, Router};
use serde::Deserialize;

use pos_core::order::OrderRequest;
use pos_core::validation::validate_name;
use pos_db::{place_order, refund_order, OrderReceipt, RefundReceipt};

use crate::auth::Actor;
use crate::extract::ValidJson;
use crate::response::ApiResponse;
use crate::routes::ApiResult;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/transaction/order", post(create_order))
        .route("/transaction/refund", post(create_refund))
}

#[derive(Debug, Deserialize)]
pub struct RefundRequest {
    pub trx_number: String,
    pub reason: String,
}

async fn create_order(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ValidJson(body): ValidJson<OrderRequest>,
) -> ApiResult<OrderReceipt> {
    let draft = body.into_draft()?;
    let receipt = place_order(&state.db, actor.user_id, draft).await?;
    Ok(ApiResponse::created("order created successfully", receipt))
}

async fn create_refund(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ValidJson(body): ValidJson<RefundRequest>,
) -> ApiResult<RefundReceipt> {
    let trx_number = validate_name("trx_number", &body.trx_number, 64)?;
    let receipt = refund_order(&state.db, actor.user_id, &trx_number, &body.reason).await?;
    Ok(ApiResponse::ok("order refunded successfully", receipt))
}
