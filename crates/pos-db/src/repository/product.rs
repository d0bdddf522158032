//! # Product Repository
//!
//! Catalog CRUD plus the two stock primitives the workflows build on.
//!
//! ## Stock Mutations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Product.stock is changed ONLY through these two functions, and only    │
//! │  inside a unit of work that also appends a ledger entry:                │
//! │                                                                         │
//! │  take_stock(conn, id, qty)                                              │
//! │     UPDATE products SET stock = stock - qty                             │
//! │     WHERE id = ? AND deleted_at IS NULL AND stock >= qty                │
//! │     0 rows → caller reports InsufficientStock, unit of work rolls back  │
//! │                                                                         │
//! │  restock(conn, id, qty)                                                 │
//! │     UPDATE products SET stock = stock + qty WHERE id = ?                │
//! │                                                                         │
//! │  The guard is evaluated by SQLite under its write lock, so two tills    │
//! │  racing for the last unit cannot both succeed.                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use tracing::debug;

use pos_core::{Money, PageRequest, Paginated, Product};

use crate::error::{DbError, DbResult};
use crate::repository::category::fetch_live_category;
use crate::repository::{expect_affected, parse_money};
use crate::unit_of_work::UnitOfWork;

const COLUMNS: &str = "id, name, price, stock, category_id, created_by, updated_by, deleted_by, \
                       created_at, updated_at, deleted_at";

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i64,
    name: String,
    price: String,
    stock: i64,
    category_id: Option<i64>,
    created_by: Option<i64>,
    updated_by: Option<i64>,
    deleted_by: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<ProductRow> for Product {
    type Error = DbError;

    fn try_from(row: ProductRow) -> DbResult<Self> {
        Ok(Product {
            id: row.id,
            name: row.name,
            price: parse_money("products.price", &row.price)?,
            stock: row.stock,
            category_id: row.category_id,
            created_by: row.created_by,
            updated_by: row.updated_by,
            deleted_by: row.deleted_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}

/// Fields a client controls. Stock is deliberately absent: it only moves
/// through the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductInput {
    pub name: String,
    pub price: Money,
    pub category_id: Option<i64>,
}

// =============================================================================
// Store Functions
// =============================================================================

/// Fetches a product by id, including soft-deleted rows.
pub async fn fetch_product<'e, E>(executor: E, id: i64) -> DbResult<Option<Product>>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("SELECT {COLUMNS} FROM products WHERE id = ?1");
    let row = sqlx::query_as::<_, ProductRow>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    row.map(Product::try_from).transpose()
}

/// Guarded decrement. Returns `false` when the product is missing, soft
/// deleted, or holds fewer than `quantity` units.
pub async fn take_stock<'e, E>(executor: E, id: i64, quantity: i64) -> DbResult<bool>
where
    E: SqliteExecutor<'e>,
{
    debug!(id = %id, quantity = quantity, "Taking stock");

    let result = sqlx::query(
        "UPDATE products SET stock = stock - ?2 \
         WHERE id = ?1 AND deleted_at IS NULL AND stock >= ?2",
    )
    .bind(id)
    .bind(quantity)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Adds units back. Soft-deleted products are restocked too, so a refund
/// never depends on catalog state. Returns `false` if the row is gone.
pub async fn restock<'e, E>(executor: E, id: i64, quantity: i64) -> DbResult<bool>
where
    E: SqliteExecutor<'e>,
{
    debug!(id = %id, quantity = quantity, "Restocking");

    let result = sqlx::query("UPDATE products SET stock = stock + ?2 WHERE id = ?1")
        .bind(id)
        .bind(quantity)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() == 1)
}

async fn ensure_category(conn: &mut SqliteConnection, category_id: Option<i64>) -> DbResult<()> {
    if let Some(category_id) = category_id {
        if fetch_live_category(&mut *conn, category_id).await?.is_none() {
            return Err(DbError::not_found("category", category_id));
        }
    }
    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a product with zero stock.
    ///
    /// ## Errors
    /// - `NotFound { entity: "category" }` if the category is missing or deleted
    pub async fn create(&self, input: &ProductInput, actor: i64) -> DbResult<Product> {
        debug!(name = %input.name, "Creating product");

        let mut uow = UnitOfWork::begin(&self.pool).await?;
        ensure_category(uow.conn(), input.category_id).await?;

        let sql = format!(
            "INSERT INTO products (name, price, stock, category_id, created_by, created_at) \
             VALUES (?1, ?2, 0, ?3, ?4, ?5) RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(&input.name)
            .bind(input.price.to_decimal_string())
            .bind(input.category_id)
            .bind(actor)
            .bind(Utc::now())
            .fetch_one(uow.conn())
            .await?;
        uow.commit().await?;

        row.try_into()
    }

    /// Gets a live product by id.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Product>> {
        Ok(fetch_product(&self.pool, id)
            .await?
            .filter(|p| !p.is_deleted()))
    }

    /// Gets a product by id, soft deleted or not.
    pub async fn get_any(&self, id: i64) -> DbResult<Option<Product>> {
        fetch_product(&self.pool, id).await
    }

    /// Lists live products ordered by id.
    pub async fn list(&self, page: PageRequest) -> DbResult<Paginated<Product>> {
        self.page("deleted_at IS NULL", page).await
    }

    /// Lists soft-deleted products.
    pub async fn list_deleted(&self, page: PageRequest) -> DbResult<Paginated<Product>> {
        self.page("deleted_at IS NOT NULL", page).await
    }

    async fn page(&self, filter: &str, page: PageRequest) -> DbResult<Paginated<Product>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM products WHERE {filter} ORDER BY id LIMIT ?1 OFFSET ?2"
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM products WHERE {filter}"))
            .fetch_one(&self.pool)
            .await?;

        let items = rows
            .into_iter()
            .map(Product::try_from)
            .collect::<DbResult<Vec<_>>>()?;
        Ok(Paginated::new(items, page, total))
    }

    /// Updates name, price and category of a live product.
    pub async fn update(&self, id: i64, input: &ProductInput, actor: i64) -> DbResult<Product> {
        debug!(id = %id, "Updating product");

        let mut uow = UnitOfWork::begin(&self.pool).await?;
        ensure_category(uow.conn(), input.category_id).await?;

        let sql = format!(
            "UPDATE products SET name = ?1, price = ?2, category_id = ?3, updated_by = ?4, updated_at = ?5 \
             WHERE id = ?6 AND deleted_at IS NULL RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(&input.name)
            .bind(input.price.to_decimal_string())
            .bind(input.category_id)
            .bind(actor)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(uow.conn())
            .await?
            .ok_or_else(|| DbError::not_found("product", id))?;
        uow.commit().await?;

        row.try_into()
    }

    /// Marks a live product deleted. It can no longer be sold.
    pub async fn soft_delete(&self, id: i64, actor: i64) -> DbResult<()> {
        debug!(id = %id, "Soft deleting product");

        let result = sqlx::query(
            "UPDATE products SET deleted_by = ?1, deleted_at = ?2 \
             WHERE id = ?3 AND deleted_at IS NULL",
        )
        .bind(actor)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        expect_affected(result, "product", id)
    }

    /// Removes a product row. Order items and ledger entries keep their
    /// snapshots with a NULL product reference.
    pub async fn hard_delete(&self, id: i64) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        expect_affected(result, "product", id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn input(name: &str, price: &str, category_id: Option<i64>) -> ProductInput {
        ProductInput {
            name: name.to_string(),
            price: Money::parse(price).unwrap(),
            category_id,
        }
    }

    #[tokio::test]
    async fn test_create_starts_with_zero_stock() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let category = db.categories().create("Drinks", 1).await.unwrap();

        let product = db
            .products()
            .create(&input("Teh Botol", "4.5", Some(category.id)), 1)
            .await
            .unwrap();

        assert_eq!(product.stock, 0);
        assert_eq!(product.price.to_decimal_string(), "4.50");
        assert_eq!(product.category_id, Some(category.id));
    }

    #[tokio::test]
    async fn test_create_requires_live_category() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let category = db.categories().create("Old", 1).await.unwrap();
        db.categories().soft_delete(category.id, 1).await.unwrap();

        let err = db
            .products()
            .create(&input("Roti", "3", Some(category.id)), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { ref entity, .. } if entity == "category"));

        let err = db
            .products()
            .create(&input("Roti", "3", Some(404)), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_take_stock_is_guarded() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db.products().create(&input("Air", "1", None), 1).await.unwrap();
        assert!(restock(db.pool(), product.id, 3).await.unwrap());

        assert!(take_stock(db.pool(), product.id, 2).await.unwrap());
        assert!(!take_stock(db.pool(), product.id, 2).await.unwrap());

        let reloaded = db.products().get_by_id(product.id).await.unwrap().unwrap();
        assert_eq!(reloaded.stock, 1);
    }

    #[tokio::test]
    async fn test_soft_deleted_product_cannot_be_taken_but_can_be_restocked() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db.products().create(&input("Susu", "6", None), 1).await.unwrap();
        restock(db.pool(), product.id, 5).await.unwrap();
        db.products().soft_delete(product.id, 1).await.unwrap();

        assert!(db.products().get_by_id(product.id).await.unwrap().is_none());
        assert!(!take_stock(db.pool(), product.id, 1).await.unwrap());
        assert!(restock(db.pool(), product.id, 1).await.unwrap());
        assert_eq!(db.products().get_any(product.id).await.unwrap().unwrap().stock, 6);
    }

    #[tokio::test]
    async fn test_update_keeps_stock() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db.products().create(&input("Kopi", "10", None), 1).await.unwrap();
        restock(db.pool(), product.id, 4).await.unwrap();

        let updated = db
            .products()
            .update(product.id, &input("Kopi Hitam", "12.25", None), 2)
            .await
            .unwrap();
        assert_eq!(updated.name, "Kopi Hitam");
        assert_eq!(updated.price, Money::from_cents(1225));
        assert_eq!(updated.stock, 4);
        assert_eq!(updated.updated_by, Some(2));
    }
}
