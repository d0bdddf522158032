//! # Report Queries
//!
//! Monthly rankings. SQLite does the joins and unit counts; money is summed
//! in pos-core so totals stay exact. Refunded orders are excluded throughout.

use sqlx::SqlitePool;
use tracing::debug;

use pos_core::report::{
    aggregate_revenue, rank_movements, ActorRevenue, Movement, ProductMovement, ReportPeriod,
    RevenueRow, REPORT_LIMIT,
};
use pos_core::OrderStatus;

use crate::error::{DbError, DbResult};
use crate::repository::parse_money;

#[derive(Debug, sqlx::FromRow)]
struct MovementRow {
    product_id: i64,
    name: String,
    quantity_sold: i64,
}

impl From<MovementRow> for ProductMovement {
    fn from(row: MovementRow) -> Self {
        ProductMovement {
            product_id: row.product_id,
            name: row.name,
            quantity_sold: row.quantity_sold,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RevenueSqlRow {
    id: i64,
    name: String,
    total: String,
}

impl TryFrom<RevenueSqlRow> for RevenueRow {
    type Error = DbError;

    fn try_from(row: RevenueSqlRow) -> DbResult<Self> {
        Ok(RevenueRow {
            id: row.id,
            name: row.name,
            total: parse_money("orders.total_amount", &row.total)?,
        })
    }
}

/// Report queries over a calendar month.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Products with the most units sold in the period.
    pub async fn fast_moving(&self, period: ReportPeriod) -> DbResult<Vec<ProductMovement>> {
        debug!(month = period.month(), year = period.year(), "Fast moving report");
        let (start, end) = period.range();

        let rows = sqlx::query_as::<_, MovementRow>(
            "SELECT oi.product_id AS product_id, \
                    MAX(COALESCE(p.name, oi.old_product)) AS name, \
                    SUM(oi.quantity) AS quantity_sold \
             FROM order_items oi \
             JOIN orders o ON o.id = oi.order_id \
             LEFT JOIN products p ON p.id = oi.product_id \
             WHERE o.status = ?1 AND o.order_date >= ?2 AND o.order_date < ?3 \
               AND oi.product_id IS NOT NULL \
             GROUP BY oi.product_id \
             ORDER BY quantity_sold DESC, oi.product_id \
             LIMIT ?4",
        )
        .bind(OrderStatus::Order)
        .bind(start)
        .bind(end)
        .bind(REPORT_LIMIT as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rank_movements(
            rows.into_iter().map(ProductMovement::from).collect(),
            Movement::Fast,
        ))
    }

    /// Live products with the fewest units sold in the period, unsold
    /// products first.
    pub async fn slow_moving(&self, period: ReportPeriod) -> DbResult<Vec<ProductMovement>> {
        debug!(month = period.month(), year = period.year(), "Slow moving report");
        let (start, end) = period.range();

        let rows = sqlx::query_as::<_, MovementRow>(
            "SELECT p.id AS product_id, p.name AS name, \
                    COALESCE(SUM(sold.quantity), 0) AS quantity_sold \
             FROM products p \
             LEFT JOIN ( \
                 SELECT oi.product_id, oi.quantity \
                 FROM order_items oi \
                 JOIN orders o ON o.id = oi.order_id \
                 WHERE o.status = ?1 AND o.order_date >= ?2 AND o.order_date < ?3 \
             ) sold ON sold.product_id = p.id \
             WHERE p.deleted_at IS NULL \
             GROUP BY p.id, p.name \
             ORDER BY quantity_sold ASC, p.id \
             LIMIT ?4",
        )
        .bind(OrderStatus::Order)
        .bind(start)
        .bind(end)
        .bind(REPORT_LIMIT as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rank_movements(
            rows.into_iter().map(ProductMovement::from).collect(),
            Movement::Slow,
        ))
    }

    /// Cashiers ranked by revenue rung up in the period.
    pub async fn top_cashiers(&self, period: ReportPeriod) -> DbResult<Vec<ActorRevenue>> {
        debug!(month = period.month(), year = period.year(), "Top cashiers report");
        self.revenue(
            "SELECT u.id AS id, u.full_name AS name, o.total_amount AS total \
             FROM orders o JOIN users u ON u.id = o.cashier_id \
             WHERE o.status = ?1 AND o.order_date >= ?2 AND o.order_date < ?3",
            period,
        )
        .await
    }

    /// Customers ranked by revenue in the period. Guest orders are skipped.
    pub async fn top_customers(&self, period: ReportPeriod) -> DbResult<Vec<ActorRevenue>> {
        debug!(month = period.month(), year = period.year(), "Top customers report");
        self.revenue(
            "SELECT c.id AS id, c.name AS name, o.total_amount AS total \
             FROM orders o JOIN customers c ON c.id = o.customer_id \
             WHERE o.status = ?1 AND o.order_date >= ?2 AND o.order_date < ?3",
            period,
        )
        .await
    }

    async fn revenue(&self, sql: &str, period: ReportPeriod) -> DbResult<Vec<ActorRevenue>> {
        let (start, end) = period.range();
        let rows = sqlx::query_as::<_, RevenueSqlRow>(sql)
            .bind(OrderStatus::Order)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;

        let rows = rows
            .into_iter()
            .map(RevenueRow::try_from)
            .collect::<DbResult<Vec<_>>>()?;

        aggregate_revenue(rows).map_err(|e| DbError::Internal(e.to_string()))
    }
}
