//! # Workflows
//!
//! The multi-step writes. Each public function opens exactly one
//! [`UnitOfWork`](crate::UnitOfWork), runs every statement on its
//! connection and commits at the very end.
//!
//! ```text
//! ┌──────────────────┬────────────────────────────────────────────────────┐
//! │ place_order      │ customer → products → order → items, stock, ledger │
//! │ refund_order     │ order → items → stock, ledger → refund → status    │
//! │ adjust_stock     │ product → stock → ledger                           │
//! └──────────────────┴────────────────────────────────────────────────────┘
//! ```
//!
//! Any `?` inside a workflow drops the unit of work and rolls back, so no
//! partial order, refund or adjustment is ever visible.

mod adjustment;
mod order;
mod refund;

pub use adjustment::adjust_stock;
pub use order::{place_order, OrderReceipt};
pub use refund::{refund_order, RefundReceipt};

#[cfg(test)]
pub(crate) mod fixtures {
    use pos_core::order::{CustomerResolution, OrderDraft, OrderLineRequest};
    use pos_core::{Money, Product, Role};

    use crate::repository::product::{restock, ProductInput};
    use crate::repository::user::NewUser;
    use crate::Database;

    pub async fn database() -> Database {
        Database::new(crate::DbConfig::in_memory()).await.unwrap()
    }

    /// A WAL database file under `dir` with a real multi-connection pool.
    pub async fn file_database(dir: &std::path::Path, connections: u32) -> Database {
        Database::new(crate::DbConfig::new(dir.join("pos.db")).max_connections(connections))
            .await
            .unwrap()
    }

    /// Creates a cashier and returns its id.
    pub async fn cashier(db: &Database, username: &str) -> i64 {
        db.users()
            .create(
                &NewUser {
                    username: username.to_string(),
                    password_hash: "hash".to_string(),
                    role: Role::Cashier,
                    full_name: format!("Cashier {username}"),
                },
                None,
            )
            .await
            .unwrap()
            .id
    }

    /// A product priced `price` holding `stock` units.
    ///
    /// The opening stock goes straight to the column, so ledger replay
    /// tests must seed through `adjust_stock` instead.
    pub async fn product(db: &Database, name: &str, price: &str, stock: i64) -> Product {
        let product = db
            .products()
            .create(
                &ProductInput {
                    name: name.to_string(),
                    price: Money::parse(price).unwrap(),
                    category_id: None,
                },
                1,
            )
            .await
            .unwrap();
        if stock > 0 {
            restock(db.pool(), product.id, stock).await.unwrap();
        }
        db.products().get_by_id(product.id).await.unwrap().unwrap()
    }

    pub fn guest_draft(lines: &[(i64, i64)]) -> OrderDraft {
        OrderDraft {
            customer: CustomerResolution::Guest,
            payment_method: "cash".to_string(),
            lines: lines
                .iter()
                .map(|&(product_id, quantity)| OrderLineRequest {
                    product_id,
                    quantity,
                })
                .collect(),
        }
    }

    pub async fn stock_of(db: &Database, id: i64) -> i64 {
        db.products().get_any(id).await.unwrap().unwrap().stock
    }

    pub async fn count(db: &Database, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(db.pool())
            .await
            .unwrap()
    }
}
