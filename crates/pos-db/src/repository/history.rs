//! # Stock Ledger
//!
//! Append-only. Entries are written by the workflows in the same unit of
//! work as the stock change they describe; nothing updates or deletes them.

use chrono::{DateTime, Utc};
use sqlx::{SqliteExecutor, SqlitePool};

use pos_core::{PageRequest, Paginated, ProductHistory, StockDirection};

use crate::error::DbResult;

const COLUMNS: &str =
    "id, trx_ref, product_id, quantity_change, type AS direction, reason, created_by, created_at";

#[derive(Debug, sqlx::FromRow)]
struct HistoryRow {
    id: i64,
    trx_ref: String,
    product_id: Option<i64>,
    quantity_change: i64,
    direction: StockDirection,
    reason: String,
    created_by: i64,
    created_at: DateTime<Utc>,
}

impl From<HistoryRow> for ProductHistory {
    fn from(row: HistoryRow) -> Self {
        ProductHistory {
            id: row.id,
            trx_ref: row.trx_ref,
            product_id: row.product_id,
            quantity_change: row.quantity_change,
            direction: row.direction,
            reason: row.reason,
            created_by: row.created_by,
            created_at: row.created_at,
        }
    }
}

/// A ledger entry about to be written. `quantity_change` is already signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHistoryEntry<'a> {
    pub trx_ref: &'a str,
    pub product_id: i64,
    pub quantity_change: i64,
    pub direction: StockDirection,
    pub reason: &'a str,
    pub created_by: i64,
}

/// Appends one ledger entry.
pub async fn append_history<'e, E>(
    executor: E,
    entry: &NewHistoryEntry<'_>,
) -> DbResult<ProductHistory>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!(
        "INSERT INTO product_histories \
         (trx_ref, product_id, quantity_change, type, reason, created_by, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) RETURNING {COLUMNS}"
    );
    let row = sqlx::query_as::<_, HistoryRow>(&sql)
        .bind(entry.trx_ref)
        .bind(entry.product_id)
        .bind(entry.quantity_change)
        .bind(entry.direction)
        .bind(entry.reason)
        .bind(entry.created_by)
        .bind(Utc::now())
        .fetch_one(executor)
        .await?;

    Ok(row.into())
}

/// Read side of the ledger.
#[derive(Debug, Clone)]
pub struct HistoryRepository {
    pool: SqlitePool,
}

impl HistoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        HistoryRepository { pool }
    }

    /// Lists entries newest first.
    pub async fn list(&self, page: PageRequest) -> DbResult<Paginated<ProductHistory>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM product_histories ORDER BY id DESC LIMIT ?1 OFFSET ?2"
        );
        let rows = sqlx::query_as::<_, HistoryRow>(&sql)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM product_histories")
            .fetch_one(&self.pool)
            .await?;

        Ok(Paginated::new(
            rows.into_iter().map(ProductHistory::from).collect(),
            page,
            total,
        ))
    }

    /// Every entry of one product in the order it was written.
    pub async fn list_for_product(&self, product_id: i64) -> DbResult<Vec<ProductHistory>> {
        let sql = format!("SELECT {COLUMNS} FROM product_histories WHERE product_id = ?1 ORDER BY id");
        let rows = sqlx::query_as::<_, HistoryRow>(&sql)
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(ProductHistory::from).collect())
    }

    /// Entries written under one transaction reference.
    pub async fn list_for_ref(&self, trx_ref: &str) -> DbResult<Vec<ProductHistory>> {
        let sql = format!("SELECT {COLUMNS} FROM product_histories WHERE trx_ref = ?1 ORDER BY id");
        let rows = sqlx::query_as::<_, HistoryRow>(&sql)
            .bind(trx_ref)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(ProductHistory::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::product::ProductInput;
    use crate::{Database, DbConfig};
    use pos_core::Money;

    #[tokio::test]
    async fn test_append_and_list_order() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db
            .products()
            .create(
                &ProductInput {
                    name: "Gula".to_string(),
                    price: Money::from_cents(1200),
                    category_id: None,
                },
                1,
            )
            .await
            .unwrap();

        for (change, direction) in [(10, StockDirection::In), (-3, StockDirection::Out)] {
            append_history(
                db.pool(),
                &NewHistoryEntry {
                    trx_ref: "TRX-20240101120000-1",
                    product_id: product.id,
                    quantity_change: change,
                    direction,
                    reason: "Restock",
                    created_by: 1,
                },
            )
            .await
            .unwrap();
        }

        let ascending = db.history().list_for_product(product.id).await.unwrap();
        assert_eq!(
            ascending.iter().map(|h| h.quantity_change).collect::<Vec<_>>(),
            vec![10, -3]
        );

        let newest_first = db.history().list(PageRequest::default()).await.unwrap();
        assert_eq!(newest_first.total, 2);
        assert_eq!(newest_first.items[0].direction, StockDirection::Out);

        let by_ref = db.history().list_for_ref("TRX-20240101120000-1").await.unwrap();
        assert_eq!(by_ref.len(), 2);
    }
}
