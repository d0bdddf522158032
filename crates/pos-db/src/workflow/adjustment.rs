//! Manual stock adjustments: goods received, write-offs, stock counts.

use chrono::Utc;
use tracing::info;

use pos_core::order::adjustment_reference;
use pos_core::stock::StockAdjustment;
use pos_core::{CoreError, ProductHistory, StockDirection};

use crate::error::WorkflowResult;
use crate::repository::history::{append_history, NewHistoryEntry};
use crate::repository::product::{fetch_product, restock, take_stock};
use crate::Database;

/// Applies an adjustment and records it in the ledger, atomically.
///
/// ## Errors
/// - `ProductNotFound` for an unknown or soft-deleted product
/// - `InsufficientStock` when taking out more than is on hand
pub async fn adjust_stock(
    db: &Database,
    actor: i64,
    adjustment: StockAdjustment,
) -> WorkflowResult<ProductHistory> {
    let mut uow = db.begin().await?;

    let product = fetch_product(uow.conn(), adjustment.product_id)
        .await?
        .filter(|p| !p.is_deleted())
        .ok_or(CoreError::ProductNotFound(adjustment.product_id))?;
    let new_stock = adjustment.apply_to(&product)?;

    let applied = match adjustment.direction {
        StockDirection::In => restock(uow.conn(), product.id, adjustment.quantity).await?,
        StockDirection::Out => take_stock(uow.conn(), product.id, adjustment.quantity).await?,
    };
    if !applied {
        return Err(CoreError::InsufficientStock {
            product_id: product.id,
            available: product.stock,
            requested: adjustment.quantity,
        }
        .into());
    }

    let reference = adjustment_reference(Utc::now(), actor);
    let entry = append_history(
        uow.conn(),
        &NewHistoryEntry {
            trx_ref: &reference,
            product_id: product.id,
            quantity_change: adjustment.signed_change(),
            direction: adjustment.direction,
            reason: &adjustment.reason,
            created_by: actor,
        },
    )
    .await?;

    uow.commit().await?;

    info!(
        product_id = product.id,
        change = entry.quantity_change,
        stock = new_stock,
        "Stock adjusted"
    );

    Ok(entry)
}
