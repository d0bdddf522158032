//! Refunds.

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use pos_core::order::{refund_reference, REFUND_REASON};
use pos_core::validation::validate_reason;
use pos_core::{CoreError, Order, ProductHistory, Refund, StockDirection};

use crate::error::WorkflowResult;
use crate::repository::history::{append_history, NewHistoryEntry};
use crate::repository::order::{fetch_order_by_trx, insert_refund, items_for_order, mark_refunded};
use crate::repository::product::restock;
use crate::Database;

/// What a successful refund returns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefundReceipt {
    pub order: Order,
    pub refund: Refund,
    /// The `in` ledger entries written, one per order item.
    pub restocked: Vec<ProductHistory>,
}

/// Reverses an order's stock effects and marks it refunded, atomically.
///
/// Soft-deleted products are restocked. An item whose product row no
/// longer exists fails the whole refund.
///
/// ## Errors
/// - `OrderNotFound` if no order has `trx_number`
/// - `AlreadyRefunded` if the order is already refunded
/// - `ItemProductMissing` if an item's product was hard deleted
pub async fn refund_order(
    db: &Database,
    actor: i64,
    trx_number: &str,
    reason: &str,
) -> WorkflowResult<RefundReceipt> {
    let reason = validate_reason(reason)?;
    let mut uow = db.begin().await?;

    let order = fetch_order_by_trx(uow.conn(), trx_number)
        .await?
        .ok_or_else(|| CoreError::OrderNotFound(trx_number.to_string()))?;

    if !order.status.can_refund() {
        warn!(trx_number = %trx_number, "Refund rejected: already refunded");
        return Err(CoreError::AlreadyRefunded(order.trx_number).into());
    }

    let items = items_for_order(uow.conn(), order.id).await?;
    let reference = refund_reference(&order.trx_number);

    let mut restocked = Vec::with_capacity(items.len());
    for item in &items {
        // `product_id` is NULL once the product was hard deleted.
        let product_id = item
            .product_id
            .ok_or_else(|| CoreError::ItemProductMissing {
                item_id: item.id,
                name: item.old_product.clone(),
            })?;

        if !restock(uow.conn(), product_id, item.quantity).await? {
            return Err(CoreError::ProductNotFound(product_id).into());
        }

        let entry = append_history(
            uow.conn(),
            &NewHistoryEntry {
                trx_ref: &reference,
                product_id,
                quantity_change: StockDirection::In.signed(item.quantity),
                direction: StockDirection::In,
                reason: REFUND_REASON,
                created_by: actor,
            },
        )
        .await?;
        restocked.push(entry);
    }

    let now = Utc::now();
    let refund = insert_refund(uow.conn(), order.id, &reason, actor, now).await?;
    let order = mark_refunded(uow.conn(), order.id, actor, now)
        .await?
        .ok_or_else(|| CoreError::AlreadyRefunded(order.trx_number.clone()))?;

    uow.commit().await?;

    info!(
        trx_number = %order.trx_number,
        items = restocked.len(),
        "Order refunded"
    );

    Ok(RefundReceipt {
        order,
        refund,
        restocked,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::fixtures::{cashier, count, database, guest_draft, product, stock_of};
    use crate::workflow::place_order;
    use crate::WorkflowError;
    use pos_core::OrderStatus;

    #[tokio::test]
    async fn test_refund_restores_stock() {
        let db = database().await;
        let actor = cashier(&db, "kasir1").await;
        let kopi = product(&db, "Kopi", "10.00", 10).await;
        let roti = product(&db, "Roti", "5.00", 4).await;

        let receipt = place_order(&db, actor, guest_draft(&[(kopi.id, 2), (roti.id, 1)]))
            .await
            .unwrap();
        let trx = receipt.order.trx_number.clone();

        let refunded = refund_order(&db, actor, &trx, "Customer changed mind")
            .await
            .unwrap();

        assert_eq!(refunded.order.status, OrderStatus::Refunded);
        assert_eq!(refunded.order.updated_by, Some(actor));
        assert!(refunded.order.updated_at.is_some());
        assert_eq!(refunded.refund.order_id, receipt.order.id);
        assert_eq!(refunded.refund.reason, "Customer changed mind");

        assert_eq!(stock_of(&db, kopi.id).await, 10);
        assert_eq!(stock_of(&db, roti.id).await, 4);

        let ledger = db
            .history()
            .list_for_ref(&format!("{trx}-REFUND"))
            .await
            .unwrap();
        assert_eq!(ledger.len(), 2);
        assert!(ledger.iter().all(|h| h.direction == StockDirection::In));
        assert!(ledger.iter().all(|h| h.reason == "Refund"));
        assert_eq!(ledger[0].quantity_change, 2);
        assert_eq!(ledger[1].quantity_change, 1);
        assert_eq!(refunded.restocked, ledger);
    }

    #[tokio::test]
    async fn test_second_refund_fails_and_changes_nothing() {
        let db = database().await;
        let actor = cashier(&db, "kasir1").await;
        let kopi = product(&db, "Kopi", "10.00", 10).await;

        let receipt = place_order(&db, actor, guest_draft(&[(kopi.id, 3)]))
            .await
            .unwrap();
        let trx = receipt.order.trx_number;
        refund_order(&db, actor, &trx, "Wrong item").await.unwrap();

        let err = refund_order(&db, actor, &trx, "Again").await.unwrap_err();
        assert!(matches!(err, WorkflowError::Core(CoreError::AlreadyRefunded(_))));

        assert_eq!(stock_of(&db, kopi.id).await, 10);
        assert_eq!(count(&db, "refunds").await, 1);
        assert_eq!(count(&db, "product_histories").await, 2);
        let order = db.orders().get_by_trx(&trx).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Refunded);
    }

    #[tokio::test]
    async fn test_unknown_trx_number() {
        let db = database().await;
        let actor = cashier(&db, "kasir1").await;

        let err = refund_order(&db, actor, "TRX-0-20240101000000-1", "Nope")
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Core(CoreError::OrderNotFound(_))));
    }

    #[tokio::test]
    async fn test_blank_reason_rejected() {
        let db = database().await;
        let actor = cashier(&db, "kasir1").await;
        let kopi = product(&db, "Kopi", "10.00", 10).await;
        let receipt = place_order(&db, actor, guest_draft(&[(kopi.id, 1)]))
            .await
            .unwrap();

        let err = refund_order(&db, actor, &receipt.order.trx_number, "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Core(CoreError::Validation(_))));
        assert_eq!(stock_of(&db, kopi.id).await, 9);
    }

    #[tokio::test]
    async fn test_soft_deleted_product_is_restocked() {
        let db = database().await;
        let actor = cashier(&db, "kasir1").await;
        let kopi = product(&db, "Kopi", "10.00", 5).await;
        let receipt = place_order(&db, actor, guest_draft(&[(kopi.id, 2)]))
            .await
            .unwrap();

        db.products().soft_delete(kopi.id, actor).await.unwrap();
        refund_order(&db, actor, &receipt.order.trx_number, "Return")
            .await
            .unwrap();

        assert_eq!(stock_of(&db, kopi.id).await, 5);
    }

    #[tokio::test]
    async fn test_hard_deleted_product_aborts_refund() {
        let db = database().await;
        let actor = cashier(&db, "kasir1").await;
        let kopi = product(&db, "Kopi", "10.00", 5).await;
        let roti = product(&db, "Roti", "5.00", 5).await;
        let receipt = place_order(&db, actor, guest_draft(&[(roti.id, 1), (kopi.id, 2)]))
            .await
            .unwrap();

        db.products().hard_delete(kopi.id).await.unwrap();
        let err = refund_order(&db, actor, &receipt.order.trx_number, "Return")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Core(CoreError::ItemProductMissing { ref name, .. }) if name == "Kopi"
        ));

        // The roti line before it was rolled back too.
        assert_eq!(stock_of(&db, roti.id).await, 4);
        assert_eq!(count(&db, "refunds").await, 0);
        let order = db.orders().get_by_trx(&receipt.order.trx_number).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Order);
    }
}
