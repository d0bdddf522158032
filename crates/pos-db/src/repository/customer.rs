//! # Customer Repository
//!
//! Members get a generated code (`MBR-000001`) on insert. Phone and email
//! are unique among live customers; a soft-deleted customer frees them.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use tracing::debug;

use pos_core::order::{member_code, NewCustomer};
use pos_core::{Customer, PageRequest, Paginated};

use crate::error::{DbError, DbResult};
use crate::repository::expect_affected;
use crate::unit_of_work::UnitOfWork;

const COLUMNS: &str = "id, member_code, name, phone, email, created_by, updated_by, deleted_by, \
                       created_at, updated_at, deleted_at";

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: i64,
    member_code: String,
    name: String,
    phone: Option<String>,
    email: Option<String>,
    created_by: Option<i64>,
    updated_by: Option<i64>,
    deleted_by: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer {
            id: row.id,
            member_code: row.member_code,
            name: row.name,
            phone: row.phone,
            email: row.email,
            created_by: row.created_by,
            updated_by: row.updated_by,
            deleted_by: row.deleted_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        }
    }
}

// =============================================================================
// Store Functions
// =============================================================================

/// Fetches a customer that is not soft deleted.
pub async fn fetch_live_customer<'e, E>(executor: E, id: i64) -> DbResult<Option<Customer>>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("SELECT {COLUMNS} FROM customers WHERE id = ?1 AND deleted_at IS NULL");
    let row = sqlx::query_as::<_, CustomerRow>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(row.map(Customer::from))
}

/// Rejects a phone or email already used by another live customer.
async fn ensure_unique_contact(
    conn: &mut SqliteConnection,
    phone: Option<&str>,
    email: Option<&str>,
    exclude_id: Option<i64>,
) -> DbResult<()> {
    let exclude = exclude_id.unwrap_or(0);

    if let Some(phone) = phone {
        let taken: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM customers WHERE phone = ?1 AND deleted_at IS NULL AND id != ?2",
        )
        .bind(phone)
        .bind(exclude)
        .fetch_one(&mut *conn)
        .await?;
        if taken > 0 {
            return Err(DbError::duplicate("phone", phone));
        }
    }

    if let Some(email) = email {
        let taken: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM customers WHERE email = ?1 AND deleted_at IS NULL AND id != ?2",
        )
        .bind(email)
        .bind(exclude)
        .fetch_one(&mut *conn)
        .await?;
        if taken > 0 {
            return Err(DbError::duplicate("email", email));
        }
    }

    Ok(())
}

/// Inserts a customer with the next member code.
///
/// Multi-statement; call it on a unit of work connection (the order
/// workflow does) or inside a private transaction.
pub async fn insert_customer(
    conn: &mut SqliteConnection,
    customer: &NewCustomer,
    actor: i64,
) -> DbResult<Customer> {
    ensure_unique_contact(
        conn,
        customer.phone.as_deref(),
        customer.email.as_deref(),
        None,
    )
    .await?;

    let next: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(id), 0) + 1 FROM customers")
        .fetch_one(&mut *conn)
        .await?;
    let code = member_code(next);
    debug!(member_code = %code, "Creating customer");

    let sql = format!(
        "INSERT INTO customers (member_code, name, phone, email, created_by, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6) RETURNING {COLUMNS}"
    );
    let row = sqlx::query_as::<_, CustomerRow>(&sql)
        .bind(&code)
        .bind(&customer.name)
        .bind(customer.phone.as_deref())
        .bind(customer.email.as_deref())
        .bind(actor)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;

    Ok(row.into())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for customers.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Registers a customer outside of an order.
    pub async fn create(&self, customer: &NewCustomer, actor: i64) -> DbResult<Customer> {
        let mut uow = UnitOfWork::begin(&self.pool).await?;
        let created = insert_customer(uow.conn(), customer, actor).await?;
        uow.commit().await?;
        Ok(created)
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Customer>> {
        fetch_live_customer(&self.pool, id).await
    }

    /// Lists live customers ordered by id.
    pub async fn list(&self, page: PageRequest) -> DbResult<Paginated<Customer>> {
        self.page("deleted_at IS NULL", page).await
    }

    /// Lists soft-deleted customers.
    pub async fn list_deleted(&self, page: PageRequest) -> DbResult<Paginated<Customer>> {
        self.page("deleted_at IS NOT NULL", page).await
    }

    async fn page(&self, filter: &str, page: PageRequest) -> DbResult<Paginated<Customer>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM customers WHERE {filter} ORDER BY id LIMIT ?1 OFFSET ?2"
        );
        let rows = sqlx::query_as::<_, CustomerRow>(&sql)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM customers WHERE {filter}"))
                .fetch_one(&self.pool)
                .await?;

        Ok(Paginated::new(
            rows.into_iter().map(Customer::from).collect(),
            page,
            total,
        ))
    }

    /// Replaces name, phone and email of a live customer.
    pub async fn update(&self, id: i64, customer: &NewCustomer, actor: i64) -> DbResult<Customer> {
        debug!(id = %id, "Updating customer");

        let mut uow = UnitOfWork::begin(&self.pool).await?;
        ensure_unique_contact(
            uow.conn(),
            customer.phone.as_deref(),
            customer.email.as_deref(),
            Some(id),
        )
        .await?;

        let sql = format!(
            "UPDATE customers SET name = ?1, phone = ?2, email = ?3, updated_by = ?4, updated_at = ?5 \
             WHERE id = ?6 AND deleted_at IS NULL RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, CustomerRow>(&sql)
            .bind(&customer.name)
            .bind(customer.phone.as_deref())
            .bind(customer.email.as_deref())
            .bind(actor)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(uow.conn())
            .await?
            .ok_or_else(|| DbError::not_found("customer", id))?;
        uow.commit().await?;

        Ok(row.into())
    }

    pub async fn soft_delete(&self, id: i64, actor: i64) -> DbResult<()> {
        debug!(id = %id, "Soft deleting customer");

        let result = sqlx::query(
            "UPDATE customers SET deleted_by = ?1, deleted_at = ?2 \
             WHERE id = ?3 AND deleted_at IS NULL",
        )
        .bind(actor)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        expect_affected(result, "customer", id)
    }

    /// Removes a customer row; their orders become guest orders.
    pub async fn hard_delete(&self, id: i64) -> DbResult<()> {
        debug!(id = %id, "Deleting customer");

        let result = sqlx::query("DELETE FROM customers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        expect_affected(result, "customer", id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn customer(name: &str, phone: Option<&str>, email: Option<&str>) -> NewCustomer {
        NewCustomer {
            name: name.to_string(),
            phone: phone.map(str::to_string),
            email: email.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_member_codes_are_sequential() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.customers();

        let first = repo.create(&customer("Ani", None, None), 1).await.unwrap();
        let second = repo.create(&customer("Budi", None, None), 1).await.unwrap();

        assert_eq!(first.member_code, "MBR-000001");
        assert_eq!(second.member_code, "MBR-000002");
    }

    #[tokio::test]
    async fn test_contact_uniqueness_among_live_customers() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.customers();

        let ani = repo
            .create(&customer("Ani", Some("0811111111"), Some("ani@mail.com")), 1)
            .await
            .unwrap();

        let err = repo
            .create(&customer("Imposter", Some("0811111111"), None), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "phone"));

        let err = repo
            .create(&customer("Imposter", None, Some("ani@mail.com")), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "email"));

        // Updating yourself with your own contact details is fine.
        repo.update(
            ani.id,
            &customer("Ani S.", Some("0811111111"), Some("ani@mail.com")),
            2,
        )
        .await
        .unwrap();

        // Once soft deleted, the phone is free again.
        repo.soft_delete(ani.id, 1).await.unwrap();
        repo.create(&customer("New Ani", Some("0811111111"), None), 1)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_conflicts_with_other_customer() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.customers();

        repo.create(&customer("Ani", Some("0811111111"), None), 1)
            .await
            .unwrap();
        let budi = repo
            .create(&customer("Budi", Some("0822222222"), None), 1)
            .await
            .unwrap();

        let err = repo
            .update(budi.id, &customer("Budi", Some("0811111111"), None), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }
}
