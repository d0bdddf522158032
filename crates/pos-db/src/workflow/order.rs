//! Order placement.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use pos_core::order::{
    compose_trx_number, ensure_stock, order_total, with_sequence, CustomerResolution, OrderDraft,
    PricedLine, ORDER_REASON,
};
use pos_core::{CoreError, Customer, Order, OrderItem, Product, StockDirection};

use crate::error::WorkflowResult;
use crate::repository::customer::{fetch_live_customer, insert_customer};
use crate::repository::history::{append_history, NewHistoryEntry};
use crate::repository::order::{insert_order, insert_order_item, trx_exists, NewOrder, NewOrderItem};
use crate::repository::product::{fetch_product, take_stock};
use crate::unit_of_work::UnitOfWork;
use crate::Database;

/// What a successful order returns to the till.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderReceipt {
    pub order: Order,
    pub customer: Option<Customer>,
    pub items: Vec<OrderItem>,
}

/// Places an order atomically.
///
/// ## Steps
/// 1. Resolve the customer (guest, existing live member, or new customer)
/// 2. Load every product and check stock for the summed quantity per
///    product, before anything is mutated
/// 3. Price the lines from stored prices and total them exactly
/// 4. Insert the order with a unique transaction number
/// 5. Per line: insert the item snapshot, take the stock, append an `out`
///    ledger entry referencing the transaction number
/// 6. Commit
///
/// ## Errors
/// - `CustomerNotFound` for an unknown or soft-deleted member
/// - `ProductNotFound` for an unknown or soft-deleted product
/// - `InsufficientStock` if any product cannot cover its lines
/// - any storage error, after which nothing is persisted
pub async fn place_order(
    db: &Database,
    actor: i64,
    draft: OrderDraft,
) -> WorkflowResult<OrderReceipt> {
    let mut uow = db.begin().await?;

    let customer = resolve_customer(&mut uow, actor, &draft.customer).await?;

    let products = load_products(&mut uow, &draft).await?;
    let lines = draft
        .lines
        .iter()
        .map(|line| {
            products
                .get(&line.product_id)
                .map(|product| PricedLine::snapshot(product, line.quantity))
                .ok_or(CoreError::ProductNotFound(line.product_id))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let total_amount = order_total(&lines)?;

    let order_date = Utc::now();
    let customer_id = customer.as_ref().map(|c| c.id);
    let trx_number = unique_trx_number(&mut uow, customer_id, order_date, actor).await?;

    let order = insert_order(
        uow.conn(),
        &NewOrder {
            trx_number: &trx_number,
            cashier_id: actor,
            customer_id,
            total_amount,
            payment_method: &draft.payment_method,
            order_date,
        },
    )
    .await?;

    let mut items = Vec::with_capacity(lines.len());
    for line in &lines {
        let item = insert_order_item(
            uow.conn(),
            &NewOrderItem {
                order_id: order.id,
                product_id: line.product_id,
                old_product: &line.name,
                quantity: line.quantity,
                unit_price: line.unit_price,
                created_by: actor,
            },
        )
        .await?;

        if !take_stock(uow.conn(), line.product_id, line.quantity).await? {
            // Another till sold the units between our check and this update.
            let available = fetch_product(uow.conn(), line.product_id)
                .await?
                .map(|p| p.stock)
                .unwrap_or(0);
            warn!(product_id = line.product_id, "Stock taken concurrently");
            return Err(CoreError::InsufficientStock {
                product_id: line.product_id,
                available,
                requested: line.quantity,
            }
            .into());
        }

        append_history(
            uow.conn(),
            &NewHistoryEntry {
                trx_ref: &order.trx_number,
                product_id: line.product_id,
                quantity_change: StockDirection::Out.signed(line.quantity),
                direction: StockDirection::Out,
                reason: ORDER_REASON,
                created_by: actor,
            },
        )
        .await?;

        items.push(item);
    }

    uow.commit().await?;

    info!(
        trx_number = %order.trx_number,
        total = %order.total_amount,
        lines = items.len(),
        "Order placed"
    );

    Ok(OrderReceipt {
        order,
        customer,
        items,
    })
}

async fn resolve_customer(
    uow: &mut UnitOfWork,
    actor: i64,
    resolution: &CustomerResolution,
) -> WorkflowResult<Option<Customer>> {
    match resolution {
        CustomerResolution::Guest => Ok(None),
        CustomerResolution::Member(id) => {
            let customer = fetch_live_customer(uow.conn(), *id)
                .await?
                .ok_or(CoreError::CustomerNotFound(*id))?;
            Ok(Some(customer))
        }
        CustomerResolution::New(new_customer) => {
            Ok(Some(insert_customer(uow.conn(), new_customer, actor).await?))
        }
    }
}

/// Loads each distinct product once and checks it covers the summed
/// quantity of all its lines.
async fn load_products(
    uow: &mut UnitOfWork,
    draft: &OrderDraft,
) -> WorkflowResult<BTreeMap<i64, Product>> {
    let mut products = BTreeMap::new();

    for (product_id, requested) in draft.requested_quantities() {
        let product = fetch_product(uow.conn(), product_id)
            .await?
            .filter(|p| !p.is_deleted())
            .ok_or(CoreError::ProductNotFound(product_id))?;

        if let Err(err) = ensure_stock(&product, requested) {
            warn!(product_id = product_id, requested = requested, "Insufficient stock");
            return Err(err.into());
        }
        products.insert(product_id, product);
    }

    Ok(products)
}

/// Transaction numbers have second resolution; a second order for the same
/// customer and cashier within one second gets a `-2`, `-3`, ... suffix.
async fn unique_trx_number(
    uow: &mut UnitOfWork,
    customer_id: Option<i64>,
    at: chrono::DateTime<Utc>,
    actor: i64,
) -> WorkflowResult<String> {
    let base = compose_trx_number(customer_id, at, actor);
    let mut candidate = base.clone();
    let mut sequence = 2;

    while trx_exists(uow.conn(), &candidate).await? {
        candidate = with_sequence(&base, sequence);
        sequence += 1;
    }

    Ok(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::adjust_stock;
    use crate::workflow::fixtures::{
        cashier, count, database, file_database, guest_draft, product, stock_of,
    };
    use crate::WorkflowError;
    use pos_core::order::NewCustomer;
    use pos_core::stock::StockAdjustment;
    use pos_core::types::replay_stock;
    use pos_core::{Money, OrderStatus, PageRequest};
    use tokio::task::JoinSet;

    /// A product whose opening stock is booked through the ledger.
    async fn stocked(db: &Database, actor: i64, name: &str, stock: i64) -> Product {
        let item = product(db, name, "2.00", 0).await;
        adjust_stock(
            db,
            actor,
            StockAdjustment {
                product_id: item.id,
                quantity: stock,
                direction: StockDirection::In,
                reason: "Opening stock".to_string(),
            },
        )
        .await
        .unwrap();
        item
    }

    async fn replayed(db: &Database, id: i64) -> i64 {
        let ledger = db.history().list_for_product(id).await.unwrap();
        replay_stock(ledger.iter().map(|h| h.quantity_change))
    }

    #[tokio::test]
    async fn test_two_line_order() {
        let db = database().await;
        let actor = cashier(&db, "kasir1").await;
        let kopi = product(&db, "Kopi", "10.00", 10).await;
        let roti = product(&db, "Roti", "5.00", 4).await;

        let receipt = place_order(&db, actor, guest_draft(&[(kopi.id, 2), (roti.id, 1)]))
            .await
            .unwrap();

        assert_eq!(receipt.order.total_amount.to_decimal_string(), "25.00");
        assert_eq!(receipt.order.status, OrderStatus::Order);
        assert_eq!(receipt.order.cashier_id, actor);
        assert!(receipt.order.trx_number.starts_with("TRX-0-"));
        assert!(receipt.order.trx_number.ends_with(&format!("-{actor}")));
        assert!(receipt.customer.is_none());

        let summed: Money = receipt.items.iter().map(|i| i.line_total()).sum();
        assert_eq!(summed, receipt.order.total_amount);
        assert_eq!(receipt.items[0].old_product, "Kopi");
        assert_eq!(receipt.items[0].unit_price, Money::from_cents(1000));

        assert_eq!(stock_of(&db, kopi.id).await, 8);
        assert_eq!(stock_of(&db, roti.id).await, 3);

        let ledger = db.history().list_for_ref(&receipt.order.trx_number).await.unwrap();
        assert_eq!(ledger.len(), 2);
        assert!(ledger.iter().all(|h| h.direction == StockDirection::Out));
        assert!(ledger.iter().all(|h| h.reason == "Order"));
        assert_eq!(ledger[0].quantity_change, -2);
        assert_eq!(ledger[1].quantity_change, -1);
    }

    #[tokio::test]
    async fn test_insufficient_stock_creates_nothing() {
        let db = database().await;
        let actor = cashier(&db, "kasir1").await;
        let kopi = product(&db, "Kopi", "10.00", 10).await;
        let roti = product(&db, "Roti", "5.00", 1).await;

        let err = place_order(&db, actor, guest_draft(&[(kopi.id, 2), (roti.id, 2)]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            WorkflowError::Core(CoreError::InsufficientStock { available: 1, requested: 2, .. })
        ));
        assert_eq!(stock_of(&db, kopi.id).await, 10);
        assert_eq!(stock_of(&db, roti.id).await, 1);
        assert_eq!(count(&db, "orders").await, 0);
        assert_eq!(count(&db, "order_items").await, 0);
        assert_eq!(count(&db, "product_histories").await, 0);
    }

    #[tokio::test]
    async fn test_duplicate_lines_checked_together() {
        let db = database().await;
        let actor = cashier(&db, "kasir1").await;
        let kopi = product(&db, "Kopi", "10.00", 3).await;

        // Each line alone fits, together they do not.
        let err = place_order(&db, actor, guest_draft(&[(kopi.id, 2), (kopi.id, 2)]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Core(CoreError::InsufficientStock { requested: 4, .. })
        ));
        assert_eq!(stock_of(&db, kopi.id).await, 3);

        let receipt = place_order(&db, actor, guest_draft(&[(kopi.id, 1), (kopi.id, 2)]))
            .await
            .unwrap();
        assert_eq!(receipt.items.len(), 2);
        assert_eq!(receipt.order.total_amount.to_decimal_string(), "30.00");
        assert_eq!(stock_of(&db, kopi.id).await, 0);
    }

    #[tokio::test]
    async fn test_unknown_and_deleted_products() {
        let db = database().await;
        let actor = cashier(&db, "kasir1").await;
        let kopi = product(&db, "Kopi", "10.00", 3).await;

        let err = place_order(&db, actor, guest_draft(&[(kopi.id, 1), (999, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Core(CoreError::ProductNotFound(999))));

        db.products().soft_delete(kopi.id, actor).await.unwrap();
        let err = place_order(&db, actor, guest_draft(&[(kopi.id, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Core(CoreError::ProductNotFound(_))));
        assert_eq!(stock_of(&db, kopi.id).await, 3);
        assert_eq!(count(&db, "orders").await, 0);
    }

    #[tokio::test]
    async fn test_member_must_exist() {
        let db = database().await;
        let actor = cashier(&db, "kasir1").await;
        let kopi = product(&db, "Kopi", "10.00", 3).await;

        let mut draft = guest_draft(&[(kopi.id, 1)]);
        draft.customer = CustomerResolution::Member(42);
        let err = place_order(&db, actor, draft).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Core(CoreError::CustomerNotFound(42))));

        let member = db
            .customers()
            .create(
                &NewCustomer {
                    name: "Ani".to_string(),
                    phone: None,
                    email: None,
                },
                actor,
            )
            .await
            .unwrap();
        db.customers().soft_delete(member.id, actor).await.unwrap();

        let mut draft = guest_draft(&[(kopi.id, 1)]);
        draft.customer = CustomerResolution::Member(member.id);
        assert!(place_order(&db, actor, draft).await.is_err());
        assert_eq!(count(&db, "orders").await, 0);
        assert_eq!(stock_of(&db, kopi.id).await, 3);
    }

    #[tokio::test]
    async fn test_member_order_carries_customer_in_trx_number() {
        let db = database().await;
        let actor = cashier(&db, "kasir1").await;
        let kopi = product(&db, "Kopi", "10.00", 3).await;
        let member = db
            .customers()
            .create(
                &NewCustomer {
                    name: "Ani".to_string(),
                    phone: None,
                    email: None,
                },
                actor,
            )
            .await
            .unwrap();

        let mut draft = guest_draft(&[(kopi.id, 1)]);
        draft.customer = CustomerResolution::Member(member.id);
        let receipt = place_order(&db, actor, draft).await.unwrap();

        assert_eq!(receipt.order.customer_id, Some(member.id));
        assert!(receipt
            .order
            .trx_number
            .starts_with(&format!("TRX-{}-", member.id)));
    }

    #[tokio::test]
    async fn test_new_customer_created_with_order() {
        let db = database().await;
        let actor = cashier(&db, "kasir1").await;
        let kopi = product(&db, "Kopi", "10.00", 3).await;

        let mut draft = guest_draft(&[(kopi.id, 1)]);
        draft.customer = CustomerResolution::New(NewCustomer {
            name: "Budi".to_string(),
            phone: Some("08123456789".to_string()),
            email: None,
        });
        let receipt = place_order(&db, actor, draft).await.unwrap();

        let customer = receipt.customer.unwrap();
        assert_eq!(customer.member_code, "MBR-000001");
        assert_eq!(receipt.order.customer_id, Some(customer.id));
    }

    #[tokio::test]
    async fn test_failed_order_does_not_keep_new_customer() {
        let db = database().await;
        let actor = cashier(&db, "kasir1").await;
        let kopi = product(&db, "Kopi", "10.00", 1).await;

        let mut draft = guest_draft(&[(kopi.id, 5)]);
        draft.customer = CustomerResolution::New(NewCustomer {
            name: "Budi".to_string(),
            phone: None,
            email: None,
        });
        assert!(place_order(&db, actor, draft).await.is_err());

        let customers = db.customers().list(PageRequest::default()).await.unwrap();
        assert_eq!(customers.total, 0);
    }

    #[tokio::test]
    async fn test_same_second_orders_get_distinct_numbers() {
        let db = database().await;
        let actor = cashier(&db, "kasir1").await;
        let kopi = product(&db, "Kopi", "1.00", 10).await;

        let mut numbers = Vec::new();
        for _ in 0..3 {
            let receipt = place_order(&db, actor, guest_draft(&[(kopi.id, 1)]))
                .await
                .unwrap();
            numbers.push(receipt.order.trx_number);
        }
        numbers.sort();
        numbers.dedup();
        assert_eq!(numbers.len(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_orders_on_separate_products() {
        let dir = tempfile::tempdir().unwrap();
        let db = file_database(dir.path(), 8).await;
        let actor = cashier(&db, "kasir1").await;

        let mut ids = Vec::new();
        for n in 0..16 {
            ids.push(stocked(&db, actor, &format!("Item {n}"), 1000).await.id);
        }

        let mut tasks = JoinSet::new();
        for n in 0..80 {
            let db = db.clone();
            let id = ids[n % ids.len()];
            tasks.spawn(async move { place_order(&db, actor, guest_draft(&[(id, 1)])).await });
        }

        let mut placed = 0;
        while let Some(joined) = tasks.join_next().await {
            joined.unwrap().unwrap();
            placed += 1;
        }

        assert_eq!(placed, 80);
        assert_eq!(count(&db, "orders").await, 80);
        for id in ids {
            assert_eq!(stock_of(&db, id).await, 995);
            assert_eq!(replayed(&db, id).await, 995);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_orders_never_oversell() {
        let dir = tempfile::tempdir().unwrap();
        let db = file_database(dir.path(), 8).await;
        let actor = cashier(&db, "kasir1").await;
        let kopi = stocked(&db, actor, "Kopi", 5).await;

        let mut tasks = JoinSet::new();
        for _ in 0..20 {
            let db = db.clone();
            let id = kopi.id;
            tasks.spawn(async move { place_order(&db, actor, guest_draft(&[(id, 1)])).await });
        }

        let mut placed = 0;
        let mut rejected = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined.unwrap() {
                Ok(_) => placed += 1,
                Err(WorkflowError::Core(CoreError::InsufficientStock { available: 0, .. })) => {
                    rejected += 1
                }
                Err(other) => panic!("unexpected failure: {other}"),
            }
        }

        assert_eq!(placed, 5);
        assert_eq!(rejected, 15);
        assert_eq!(stock_of(&db, kopi.id).await, 0);
        assert_eq!(replayed(&db, kopi.id).await, 0);
        assert_eq!(count(&db, "orders").await, 5);
        assert_eq!(count(&db, "order_items").await, 5);
    }
}
