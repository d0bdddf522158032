//! Manual stock adjustments (goods received, write-offs, stock counts).

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};
use crate::types::{Product, StockDirection};
use crate::validation::{validate_id, validate_reason};

/// Largest single adjustment accepted.
pub const MAX_ADJUSTMENT_QUANTITY: i64 = 100_000;

/// Body of `POST /product-history`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockAdjustmentRequest {
    pub product_id: i64,
    /// Unsigned amount; the sign comes from `type`.
    pub quantity_change: i64,
    #[serde(rename = "type")]
    pub direction: StockDirection,
    pub reason: String,
}

/// A validated adjustment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockAdjustment {
    pub product_id: i64,
    pub quantity: i64,
    pub direction: StockDirection,
    pub reason: String,
}

impl StockAdjustmentRequest {
    pub fn validated(self) -> CoreResult<StockAdjustment> {
        validate_id("product_id", self.product_id)?;
        if !(1..=MAX_ADJUSTMENT_QUANTITY).contains(&self.quantity_change) {
            return Err(ValidationError::OutOfRange {
                field: "quantity_change".to_string(),
                min: 1,
                max: MAX_ADJUSTMENT_QUANTITY,
            }
            .into());
        }
        let reason = validate_reason(&self.reason)?;

        Ok(StockAdjustment {
            product_id: self.product_id,
            quantity: self.quantity_change,
            direction: self.direction,
            reason,
        })
    }
}

impl StockAdjustment {
    /// Signed ledger change.
    #[inline]
    pub fn signed_change(&self) -> i64 {
        self.direction.signed(self.quantity)
    }

    /// Stock after applying this adjustment, or the shortfall error.
    pub fn apply_to(&self, product: &Product) -> CoreResult<i64> {
        if self.direction == StockDirection::Out {
            crate::order::ensure_stock(product, self.quantity)?;
        }
        Ok(product.stock + self.signed_change())
    }
}
