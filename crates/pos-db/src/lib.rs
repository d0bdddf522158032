//! # pos-db: Database Layer for Till POS
//!
//! SQLite storage via sqlx, plus the workflows that need more than one
//! statement to stay consistent.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Till POS Data Flow                               │
//! │                                                                         │
//! │  HTTP handler (POST /transaction/order)                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     pos-db (THIS CRATE)                         │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐    │   │
//! │  │   │   workflow    │    │  repository   │    │  migrations  │    │   │
//! │  │   │               │    │               │    │  (embedded)  │    │   │
//! │  │   │ place_order   │───►│ store fns on  │    │              │    │   │
//! │  │   │ refund_order  │    │ uow.conn()    │    │ 001_initial  │    │   │
//! │  │   │ adjust_stock  │    │               │    │              │    │   │
//! │  │   └───────┬───────┘    └───────┬───────┘    └──────────────┘    │   │
//! │  │           │  UnitOfWork        │  SqlitePool                    │   │
//! │  └───────────┼────────────────────┼────────────────────────────────┘   │
//! │              ▼                    ▼                                     │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (pos.db)                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database and workflow error types
//! - [`repository`] - Repositories and the store functions they share
//! - [`unit_of_work`] - Transaction boundary with rollback on drop
//! - [`workflow`] - Order, refund and stock adjustment
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pos_db::{place_order, Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("pos.db")).await?;
//! let receipt = place_order(&db, cashier_id, draft).await?;
//! println!("{}", receipt.order.trx_number);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod unit_of_work;
pub mod workflow;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult, WorkflowError, WorkflowResult};
pub use pool::{Database, DbConfig};
pub use unit_of_work::UnitOfWork;

pub use repository::{
    CategoryRepository, CustomerRepository, HistoryRepository, OrderRepository,
    ProductRepository, ReportRepository, UserRepository,
};
pub use workflow::{adjust_stock, place_order, refund_order, OrderReceipt, RefundReceipt};
