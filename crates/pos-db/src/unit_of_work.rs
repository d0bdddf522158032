//! # Unit of Work
//!
//! The atomic boundary around every multi-step write.
//!
//! ```text
//! let mut uow = db.begin().await?;          BEGIN
//!      │
//!      ├── insert_order(uow.conn(), ..)      ┐
//!      ├── take_stock(uow.conn(), ..)        │ one connection,
//!      ├── append_history(uow.conn(), ..)    │ one transaction
//!      │                                     ┘
//!      ├── Ok  ──► uow.commit().await?       COMMIT
//!      └── Err ──► uow dropped (via `?`)     ROLLBACK
//! ```
//!
//! The handle is passed by `&mut` to each store function and is never
//! shared across requests.
//!
//! Every unit of work opens with `BEGIN IMMEDIATE`. Workflows read before
//! they write, and a deferred transaction holding a stale WAL snapshot
//! cannot upgrade to a writer: SQLite fails it with `SQLITE_BUSY` at once.
//! Taking the write lock up front makes concurrent tills queue on
//! `busy_timeout` instead.

use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use tracing::debug;

use crate::error::{DbError, DbResult};

const BEGIN_IMMEDIATE: &str = "BEGIN IMMEDIATE";

/// An open database transaction.
///
/// Rolls back on drop unless [`UnitOfWork::commit`] was called.
pub struct UnitOfWork {
    tx: Transaction<'static, Sqlite>,
}

impl UnitOfWork {
    pub(crate) async fn begin(pool: &SqlitePool) -> DbResult<Self> {
        let tx = pool
            .begin_with(BEGIN_IMMEDIATE)
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        debug!("Unit of work started");
        Ok(UnitOfWork { tx })
    }

    /// Connection to run statements on, inside the transaction.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }

    /// Makes every statement run through this unit of work durable.
    pub async fn commit(self) -> DbResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        debug!("Unit of work committed");
        Ok(())
    }
}

impl std::fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitOfWork").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig};

    async fn category_count(db: &Database) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    async fn insert_category(conn: &mut sqlx::SqliteConnection) {
        sqlx::query("INSERT INTO categories (name, created_at) VALUES ('Drinks', ?1)")
            .bind(chrono::Utc::now())
            .execute(conn)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_drop_rolls_back() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        {
            let mut uow = db.begin().await.unwrap();
            insert_category(uow.conn()).await;
        }
        assert_eq!(category_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_commit_persists() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut uow = db.begin().await.unwrap();
        insert_category(uow.conn()).await;
        uow.commit().await.unwrap();
        assert_eq!(category_count(&db).await, 1);
    }
}
