//! Order browsing and the monthly rankings.
//!
//! Ranking endpoints take `?month=&year=`; either part falls back to the
//! current UTC month. Refunded orders never count as sales.

use axum::extract::State;
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;

use pos_core::report::{ActorRevenue, ProductMovement, ReportPeriod};
use pos_core::{Order, OrderStatus, PageRequest, Paginated};
use pos_db::repository::order::{OrderDetail, OrderFilter};

use crate::error::ApiError;
use crate::extract::{ValidPath, ValidQuery};
use crate::response::ApiResponse;
use crate::routes::{ApiResult, RETRIEVED};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/reports/orders", get(orders))
        .route("/reports/orders/{id}", get(order_detail))
        .route("/reports/fast-moving", get(fast_moving))
        .route("/reports/slow-moving", get(slow_moving))
        .route("/reports/top-cashiers", get(top_cashiers))
        .route("/reports/top-customers", get(top_customers))
}

/// Filters are flat fields; `serde_urlencoded` cannot flatten numbers.
#[derive(Debug, Default, Deserialize)]
pub struct OrderQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub customer_id: Option<i64>,
    pub cashier_id: Option<i64>,
    pub status: Option<String>,
}

impl OrderQuery {
    fn split(&self) -> Result<(OrderFilter, PageRequest), ApiError> {
        let status = self
            .status
            .as_deref()
            .map(str::parse::<OrderStatus>)
            .transpose()?;
        let filter = OrderFilter {
            customer_id: self.customer_id,
            cashier_id: self.cashier_id,
            status,
        };
        Ok((filter, PageRequest::new(self.page, self.limit)?))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PeriodQuery {
    pub month: Option<u32>,
    pub year: Option<i32>,
}

impl PeriodQuery {
    fn period(&self) -> Result<ReportPeriod, ApiError> {
        let now = ReportPeriod::containing(Utc::now());
        Ok(ReportPeriod::new(
            self.month.unwrap_or(now.month()),
            self.year.unwrap_or(now.year()),
        )?)
    }
}

async fn orders(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<OrderQuery>,
) -> ApiResult<Paginated<Order>> {
    let (filter, page) = query.split()?;
    let orders = state.db.orders().list(filter, page).await?;
    Ok(ApiResponse::ok(RETRIEVED, orders))
}

async fn order_detail(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i64>,
) -> ApiResult<OrderDetail> {
    let detail = state
        .db
        .orders()
        .get_detail(id)
        .await?
        .ok_or_else(|| ApiError::entity_not_found("order", id))?;
    Ok(ApiResponse::ok(RETRIEVED, detail))
}

async fn fast_moving(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<PeriodQuery>,
) -> ApiResult<Vec<ProductMovement>> {
    let rows = state.db.reports().fast_moving(query.period()?).await?;
    Ok(ApiResponse::ok(RETRIEVED, rows))
}

async fn slow_moving(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<PeriodQuery>,
) -> ApiResult<Vec<ProductMovement>> {
    let rows = state.db.reports().slow_moving(query.period()?).await?;
    Ok(ApiResponse::ok(RETRIEVED, rows))
}

async fn top_cashiers(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<PeriodQuery>,
) -> ApiResult<Vec<ActorRevenue>> {
    let rows = state.db.reports().top_cashiers(query.period()?).await?;
    Ok(ApiResponse::ok(RETRIEVED, rows))
}

async fn top_customers(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<PeriodQuery>,
) -> ApiResult<Vec<ActorRevenue>> {
    let rows = state.db.reports().top_customers(query.period()?).await?;
    Ok(ApiResponse::ok(RETRIEVED, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_query_parses_status() {
        let query = OrderQuery {
            status: Some("refunded".to_string()),
            cashier_id: Some(2),
            ..Default::default()
        };
        let (filter, page) = query.split().unwrap();

        assert_eq!(filter.status, Some(OrderStatus::Refunded));
        assert_eq!(filter.cashier_id, Some(2));
        assert_eq!(page, PageRequest::default());
    }

    #[test]
    fn test_order_query_rejects_unknown_status() {
        let query = OrderQuery {
            status: Some("void".to_string()),
            ..Default::default()
        };
        assert!(query.split().is_err());
    }

    #[test]
    fn test_period_defaults_and_bounds() {
        let now = ReportPeriod::containing(Utc::now());
        let period = PeriodQuery {
            month: Some(2),
            year: None,
        }
        .period()
        .unwrap();
        assert_eq!((period.month(), period.year()), (2, now.year()));

        let err = PeriodQuery {
            month: Some(13),
            year: Some(2024),
        }
        .period()
        .unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ValidationError);
    }
}
