//! # Report Module
//!
//! Period handling and ranking for the monthly reports.
//!
//! ```text
//! ?month=3&year=2024 ──► ReportPeriod ──► [2024-03-01, 2024-04-01)
//!                                              │
//!                 pos-db aggregates rows ◄─────┘
//!                         │
//!                         ▼
//!     rank_movements / aggregate_revenue (this module, exact Money sums)
//! ```
//!
//! Refunded orders never count towards a report.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;

/// Rows returned by each ranking report.
pub const REPORT_LIMIT: usize = 10;

// =============================================================================
// Period
// =============================================================================

/// A calendar month in UTC. Only built through [`ReportPeriod::new`] or
/// [`ReportPeriod::containing`], so the month is always 1-12.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct ReportPeriod {
    month: u32,
    year: i32,
}

impl ReportPeriod {
    /// Validates month (1-12) and year (2000-2100).
    ///
    /// ```rust
    /// use pos_core::report::ReportPeriod;
    ///
    /// assert!(ReportPeriod::new(12, 2024).is_ok());
    /// assert!(ReportPeriod::new(13, 2024).is_err());
    /// ```
    pub fn new(month: u32, year: i32) -> Result<Self, ValidationError> {
        if !(1..=12).contains(&month) {
            return Err(ValidationError::OutOfRange {
                field: "month".to_string(),
                min: 1,
                max: 12,
            });
        }
        if !(2000..=2100).contains(&year) {
            return Err(ValidationError::OutOfRange {
                field: "year".to_string(),
                min: 2000,
                max: 2100,
            });
        }
        Ok(ReportPeriod { month, year })
    }

    /// The month `at` falls in, used when a request omits the period.
    pub fn containing(at: DateTime<Utc>) -> Self {
        ReportPeriod {
            month: at.month(),
            year: at.year(),
        }
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// Half-open `[start, end)` range covering the month.
    pub fn range(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let (next_year, next_month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        (
            month_start(self.year, self.month),
            month_start(next_year, next_month),
        )
    }
}

fn month_start(year: i32, month: u32) -> DateTime<Utc> {
    // Validated inputs always map to a single instant.
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

// =============================================================================
// Product Movement
// =============================================================================

/// Units sold of one product within a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductMovement {
    pub product_id: i64,
    pub name: String,
    pub quantity_sold: i64,
}

/// Which end of the movement ranking to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    Fast,
    Slow,
}

/// Orders movements (fast: most sold first, slow: least sold first), ties
/// broken by product id, then keeps the top [`REPORT_LIMIT`].
pub fn rank_movements(mut rows: Vec<ProductMovement>, movement: Movement) -> Vec<ProductMovement> {
    rows.sort_by(|a, b| {
        let by_quantity = match movement {
            Movement::Fast => b.quantity_sold.cmp(&a.quantity_sold),
            Movement::Slow => a.quantity_sold.cmp(&b.quantity_sold),
        };
        by_quantity.then(a.product_id.cmp(&b.product_id))
    });
    rows.truncate(REPORT_LIMIT);
    rows
}

// =============================================================================
// Revenue
// =============================================================================

/// One non-refunded order attributed to a cashier or customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevenueRow {
    pub id: i64,
    pub name: String,
    pub total: Money,
}

/// Revenue and order count per cashier or customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ActorRevenue {
    pub id: i64,
    pub name: String,
    pub orders: i64,
    #[ts(type = "string")]
    pub revenue: Money,
}

/// Sums order totals per id and ranks by revenue, then order count.
///
/// ```rust
/// use pos_core::money::Money;
/// use pos_core::report::{aggregate_revenue, RevenueRow};
///
/// let rows = vec![
///     RevenueRow { id: 1, name: "Ana".into(), total: Money::from_cents(500) },
///     RevenueRow { id: 2, name: "Bo".into(), total: Money::from_cents(900) },
///     RevenueRow { id: 1, name: "Ana".into(), total: Money::from_cents(700) },
/// ];
/// let ranked = aggregate_revenue(rows).unwrap();
/// assert_eq!(ranked[0].id, 1);
/// assert_eq!(ranked[0].revenue.to_decimal_string(), "12.00");
/// ```
pub fn aggregate_revenue<I>(rows: I) -> CoreResult<Vec<ActorRevenue>>
where
    I: IntoIterator<Item = RevenueRow>,
{
    let mut by_id: HashMap<i64, ActorRevenue> = HashMap::new();

    for row in rows {
        let entry = by_id.entry(row.id).or_insert_with(|| ActorRevenue {
            id: row.id,
            name: row.name.clone(),
            orders: 0,
            revenue: Money::zero(),
        });
        entry.orders += 1;
        entry.revenue = entry
            .revenue
            .checked_add(row.total)
            .ok_or_else(|| CoreError::AmountOverflow {
                context: format!("revenue for {}", row.id),
            })?;
    }

    let mut ranked: Vec<ActorRevenue> = by_id.into_values().collect();
    ranked.sort_by(|a, b| {
        b.revenue
            .cmp(&a.revenue)
            .then(b.orders.cmp(&a.orders))
            .then(a.id.cmp(&b.id))
    });
    ranked.truncate(REPORT_LIMIT);
    Ok(ranked)
}

// =============================================================================
// Unit Tests
// =============================================================================
