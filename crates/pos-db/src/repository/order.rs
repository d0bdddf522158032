//! # Order Repository
//!
//! Orders, their items and refunds. Writes happen only through the
//! order and refund workflows; the repository itself is read-only.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite, SqliteExecutor, SqlitePool};

use pos_core::{Customer, Money, Order, OrderItem, OrderStatus, PageRequest, Paginated, Refund};

use crate::error::{DbError, DbResult};
use crate::repository::customer::fetch_live_customer;
use crate::repository::parse_money;

const ORDER_COLUMNS: &str = "id, trx_number, cashier_id, customer_id, total_amount, \
                             payment_method, status, order_date, updated_by, updated_at";

const ITEM_COLUMNS: &str =
    "id, order_id, product_id, old_product, quantity, unit_price, created_by, created_at";

const REFUND_COLUMNS: &str = "id, order_id, reason, refund_at, created_by";

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i64,
    trx_number: String,
    cashier_id: i64,
    customer_id: Option<i64>,
    total_amount: String,
    payment_method: String,
    status: OrderStatus,
    order_date: DateTime<Utc>,
    updated_by: Option<i64>,
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<OrderRow> for Order {
    type Error = DbError;

    fn try_from(row: OrderRow) -> DbResult<Self> {
        Ok(Order {
            id: row.id,
            trx_number: row.trx_number,
            cashier_id: row.cashier_id,
            customer_id: row.customer_id,
            total_amount: parse_money("orders.total_amount", &row.total_amount)?,
            payment_method: row.payment_method,
            status: row.status,
            order_date: row.order_date,
            updated_by: row.updated_by,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: i64,
    order_id: i64,
    product_id: Option<i64>,
    old_product: String,
    quantity: i64,
    unit_price: String,
    created_by: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = DbError;

    fn try_from(row: OrderItemRow) -> DbResult<Self> {
        Ok(OrderItem {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            old_product: row.old_product,
            quantity: row.quantity,
            unit_price: parse_money("order_items.unit_price", &row.unit_price)?,
            created_by: row.created_by,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RefundRow {
    id: i64,
    order_id: i64,
    reason: String,
    refund_at: DateTime<Utc>,
    created_by: i64,
}

impl From<RefundRow> for Refund {
    fn from(row: RefundRow) -> Self {
        Refund {
            id: row.id,
            order_id: row.order_id,
            reason: row.reason,
            refund_at: row.refund_at,
            created_by: row.created_by,
        }
    }
}

/// Order header about to be written.
#[derive(Debug, Clone)]
pub struct NewOrder<'a> {
    pub trx_number: &'a str,
    pub cashier_id: i64,
    pub customer_id: Option<i64>,
    pub total_amount: Money,
    pub payment_method: &'a str,
    pub order_date: DateTime<Utc>,
}

/// Order line about to be written, with its product snapshot.
#[derive(Debug, Clone)]
pub struct NewOrderItem<'a> {
    pub order_id: i64,
    pub product_id: i64,
    pub old_product: &'a str,
    pub quantity: i64,
    pub unit_price: Money,
    pub created_by: i64,
}

/// Filters for the order listing. All optional, combined with AND.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub customer_id: Option<i64>,
    pub cashier_id: Option<i64>,
    pub status: Option<OrderStatus>,
}

/// An order with everything needed to print it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderDetail {
    pub order: Order,
    pub customer: Option<Customer>,
    pub items: Vec<OrderItem>,
    pub refund: Option<Refund>,
}

// =============================================================================
// Store Functions
// =============================================================================

pub async fn insert_order<'e, E>(executor: E, order: &NewOrder<'_>) -> DbResult<Order>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!(
        "INSERT INTO orders \
         (trx_number, cashier_id, customer_id, total_amount, payment_method, status, order_date) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) RETURNING {ORDER_COLUMNS}"
    );
    let row = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(order.trx_number)
        .bind(order.cashier_id)
        .bind(order.customer_id)
        .bind(order.total_amount.to_decimal_string())
        .bind(order.payment_method)
        .bind(OrderStatus::Order)
        .bind(order.order_date)
        .fetch_one(executor)
        .await?;

    row.try_into()
}

pub async fn trx_exists<'e, E>(executor: E, trx_number: &str) -> DbResult<bool>
where
    E: SqliteExecutor<'e>,
{
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE trx_number = ?1")
        .bind(trx_number)
        .fetch_one(executor)
        .await?;
    Ok(count > 0)
}

async fn fetch_order<'e, E>(executor: E, id: i64) -> DbResult<Option<Order>>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1");
    let row = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    row.map(Order::try_from).transpose()
}

pub async fn fetch_order_by_trx<'e, E>(executor: E, trx_number: &str) -> DbResult<Option<Order>>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE trx_number = ?1");
    let row = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(trx_number)
        .fetch_optional(executor)
        .await?;
    row.map(Order::try_from).transpose()
}

pub async fn insert_order_item<'e, E>(executor: E, item: &NewOrderItem<'_>) -> DbResult<OrderItem>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!(
        "INSERT INTO order_items \
         (order_id, product_id, old_product, quantity, unit_price, created_by, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) RETURNING {ITEM_COLUMNS}"
    );
    let row = sqlx::query_as::<_, OrderItemRow>(&sql)
        .bind(item.order_id)
        .bind(item.product_id)
        .bind(item.old_product)
        .bind(item.quantity)
        .bind(item.unit_price.to_decimal_string())
        .bind(item.created_by)
        .bind(Utc::now())
        .fetch_one(executor)
        .await?;

    row.try_into()
}

pub async fn items_for_order<'e, E>(executor: E, order_id: i64) -> DbResult<Vec<OrderItem>>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ?1 ORDER BY id");
    let rows = sqlx::query_as::<_, OrderItemRow>(&sql)
        .bind(order_id)
        .fetch_all(executor)
        .await?;
    rows.into_iter().map(OrderItem::try_from).collect()
}

/// Flips `order → refunded`. Returns `None` if the order was not in the
/// `order` state, so a concurrent refund loses cleanly.
pub async fn mark_refunded<'e, E>(
    executor: E,
    order_id: i64,
    actor: i64,
    at: DateTime<Utc>,
) -> DbResult<Option<Order>>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!(
        "UPDATE orders SET status = ?1, updated_by = ?2, updated_at = ?3 \
         WHERE id = ?4 AND status = ?5 RETURNING {ORDER_COLUMNS}"
    );
    let row = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(OrderStatus::Refunded)
        .bind(actor)
        .bind(at)
        .bind(order_id)
        .bind(OrderStatus::Order)
        .fetch_optional(executor)
        .await?;
    row.map(Order::try_from).transpose()
}

pub async fn insert_refund<'e, E>(
    executor: E,
    order_id: i64,
    reason: &str,
    actor: i64,
    at: DateTime<Utc>,
) -> DbResult<Refund>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!(
        "INSERT INTO refunds (order_id, reason, refund_at, created_by) \
         VALUES (?1, ?2, ?3, ?4) RETURNING {REFUND_COLUMNS}"
    );
    let row = sqlx::query_as::<_, RefundRow>(&sql)
        .bind(order_id)
        .bind(reason)
        .bind(at)
        .bind(actor)
        .fetch_one(executor)
        .await?;
    Ok(row.into())
}

pub async fn fetch_refund_for_order<'e, E>(executor: E, order_id: i64) -> DbResult<Option<Refund>>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("SELECT {REFUND_COLUMNS} FROM refunds WHERE order_id = ?1");
    let row = sqlx::query_as::<_, RefundRow>(&sql)
        .bind(order_id)
        .fetch_optional(executor)
        .await?;
    Ok(row.map(Refund::from))
}

// =============================================================================
// Repository
// =============================================================================

/// Read side of orders.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    pub async fn get_by_trx(&self, trx_number: &str) -> DbResult<Option<Order>> {
        fetch_order_by_trx(&self.pool, trx_number).await
    }

    /// Loads an order with its customer, items and refund.
    pub async fn get_detail(&self, id: i64) -> DbResult<Option<OrderDetail>> {
        let Some(order) = fetch_order(&self.pool, id).await? else {
            return Ok(None);
        };

        let customer = match order.customer_id {
            Some(customer_id) => fetch_live_customer(&self.pool, customer_id).await?,
            None => None,
        };
        let items = items_for_order(&self.pool, order.id).await?;
        let refund = fetch_refund_for_order(&self.pool, order.id).await?;

        Ok(Some(OrderDetail {
            order,
            customer,
            items,
            refund,
        }))
    }

    /// Lists orders newest first.
    pub async fn list(&self, filter: OrderFilter, page: PageRequest) -> DbResult<Paginated<Order>> {
        let mut select = QueryBuilder::<Sqlite>::new(format!("SELECT {ORDER_COLUMNS} FROM orders"));
        push_filter(&mut select, &filter);
        select
            .push(" ORDER BY id DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = select
            .build_query_as::<OrderRow>()
            .fetch_all(&self.pool)
            .await?;

        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM orders");
        push_filter(&mut count, &filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let items = rows
            .into_iter()
            .map(Order::try_from)
            .collect::<DbResult<Vec<_>>>()?;
        Ok(Paginated::new(items, page, total))
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &OrderFilter) {
    builder.push(" WHERE 1 = 1");
    if let Some(customer_id) = filter.customer_id {
        builder.push(" AND customer_id = ").push_bind(customer_id);
    }
    if let Some(cashier_id) = filter.cashier_id {
        builder.push(" AND cashier_id = ").push_bind(cashier_id);
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::fixtures::{cashier, database, guest_draft, product};
    use crate::workflow::{place_order, refund_order};

    #[tokio::test]
    async fn test_detail_follows_refund() {
        let db = database().await;
        let actor = cashier(&db, "kasir1").await;
        let kopi = product(&db, "Kopi", "10.00", 5).await;

        let receipt = place_order(&db, actor, guest_draft(&[(kopi.id, 2)]))
            .await
            .unwrap();
        let id = receipt.order.id;

        let detail = db.orders().get_detail(id).await.unwrap().unwrap();
        assert_eq!(detail.order.status, OrderStatus::Order);
        assert_eq!(detail.items.len(), 1);
        assert!(detail.customer.is_none());
        assert!(detail.refund.is_none());

        refund_order(&db, actor, &receipt.order.trx_number, "Wrong item")
            .await
            .unwrap();

        let detail = db.orders().get_detail(id).await.unwrap().unwrap();
        assert_eq!(detail.order.status, OrderStatus::Refunded);
        assert_eq!(detail.refund.unwrap().reason, "Wrong item");

        assert!(db.orders().get_detail(id + 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let db = database().await;
        let actor = cashier(&db, "kasir1").await;
        let kopi = product(&db, "Kopi", "10.00", 5).await;

        let first = place_order(&db, actor, guest_draft(&[(kopi.id, 1)]))
            .await
            .unwrap();
        place_order(&db, actor, guest_draft(&[(kopi.id, 1)]))
            .await
            .unwrap();
        refund_order(&db, actor, &first.order.trx_number, "Return")
            .await
            .unwrap();

        let refunded = db
            .orders()
            .list(
                OrderFilter {
                    status: Some(OrderStatus::Refunded),
                    ..Default::default()
                },
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(refunded.total, 1);
        assert_eq!(refunded.items[0].id, first.order.id);

        let all = db
            .orders()
            .list(OrderFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(all.total, 2);
        // Newest first.
        assert!(all.items[0].id > all.items[1].id);
    }
}
