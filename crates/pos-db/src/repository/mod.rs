//! # Repository Module
//!
//! One repository per aggregate, each holding a clone of the pool.
//!
//! ## Two Ways In
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Repository methods            Store functions                          │
//! │  ─────────────────────         ─────────────────────────────────        │
//! │  db.products().list(page)      product::fetch_product(executor, id)     │
//! │  own the pool, one call =      generic over SqliteExecutor: run on      │
//! │  one statement (or a private   the pool OR on uow.conn() inside a       │
//! │  short transaction)            workflow's unit of work                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rows are read into private `*Row` structs (`sqlx::FromRow`) and converted
//! into pos-core types, parsing the TEXT money columns on the way.

use sqlx::sqlite::SqliteQueryResult;

use crate::error::{DbError, DbResult};

pub mod category;
pub mod customer;
pub mod history;
pub mod order;
pub mod product;
pub mod report;
pub mod user;

pub use category::CategoryRepository;
pub use customer::CustomerRepository;
pub use history::HistoryRepository;
pub use order::OrderRepository;
pub use product::ProductRepository;
pub use report::ReportRepository;
pub use user::UserRepository;

/// Maps "no row touched" to `NotFound`.
pub(crate) fn expect_affected(
    result: SqliteQueryResult,
    entity: &str,
    id: i64,
) -> DbResult<()> {
    if result.rows_affected() == 0 {
        return Err(DbError::not_found(entity, id));
    }
    Ok(())
}

/// Parses a TEXT money column.
pub(crate) fn parse_money(column: &str, value: &str) -> DbResult<pos_core::Money> {
    pos_core::Money::parse(value).map_err(|e| DbError::invalid_data(column, e))
}
