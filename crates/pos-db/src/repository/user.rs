//! # User Repository
//!
//! Staff accounts. Password hashes arrive already hashed; this crate never
//! sees plaintext. `current_token` holds the one live session per user.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use pos_core::{PageRequest, Paginated, Role, User};

use crate::error::{DbError, DbResult};
use crate::repository::expect_affected;

const COLUMNS: &str = "id, username, password_hash, role, full_name, current_token, created_by, \
                       updated_by, deleted_by, created_at, updated_at, deleted_at";

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    password_hash: String,
    role: Role,
    full_name: String,
    current_token: Option<String>,
    created_by: Option<i64>,
    updated_by: Option<i64>,
    deleted_by: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            role: row.role,
            full_name: row.full_name,
            current_token: row.current_token,
            created_by: row.created_by,
            updated_by: row.updated_by,
            deleted_by: row.deleted_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        }
    }
}

/// A new account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub full_name: String,
}

/// Changes to an account. `password_hash: None` keeps the current password.
#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub username: String,
    pub role: Role,
    pub full_name: String,
    pub password_hash: Option<String>,
}

/// Repository for staff accounts.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Inserts an account.
    ///
    /// ## Errors
    /// - `UniqueViolation { field: "username" }` if the username is taken,
    ///   including by a soft-deleted account
    pub async fn create(&self, user: &NewUser, actor: Option<i64>) -> DbResult<User> {
        debug!(username = %user.username, "Creating user");

        let sql = format!(
            "INSERT INTO users (username, password_hash, role, full_name, created_by, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(user.role)
            .bind(&user.full_name)
            .bind(actor)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| username_conflict(e, &user.username))?;

        Ok(row.into())
    }

    /// Gets a live account by id.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<User>> {
        let sql = format!("SELECT {COLUMNS} FROM users WHERE id = ?1 AND deleted_at IS NULL");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    /// Finds an account by username, soft deleted or not, so that login can
    /// tell "deleted" apart from "unknown".
    pub async fn find_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {COLUMNS} FROM users WHERE username = ?1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    pub async fn list(&self, page: PageRequest) -> DbResult<Paginated<User>> {
        self.page("deleted_at IS NULL", page).await
    }

    pub async fn list_deleted(&self, page: PageRequest) -> DbResult<Paginated<User>> {
        self.page("deleted_at IS NOT NULL", page).await
    }

    async fn page(&self, filter: &str, page: PageRequest) -> DbResult<Paginated<User>> {
        let sql =
            format!("SELECT {COLUMNS} FROM users WHERE {filter} ORDER BY id LIMIT ?1 OFFSET ?2");
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM users WHERE {filter}"))
            .fetch_one(&self.pool)
            .await?;

        Ok(Paginated::new(
            rows.into_iter().map(User::from).collect(),
            page,
            total,
        ))
    }

    /// Updates a live account.
    pub async fn update(&self, id: i64, update: &UserUpdate, actor: i64) -> DbResult<User> {
        debug!(id = %id, "Updating user");

        let sql = format!(
            "UPDATE users SET username = ?1, role = ?2, full_name = ?3, \
             password_hash = COALESCE(?4, password_hash), updated_by = ?5, updated_at = ?6 \
             WHERE id = ?7 AND deleted_at IS NULL RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(&update.username)
            .bind(update.role)
            .bind(&update.full_name)
            .bind(update.password_hash.as_deref())
            .bind(actor)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| username_conflict(e, &update.username))?
            .ok_or_else(|| DbError::not_found("user", id))?;

        Ok(row.into())
    }

    /// Stores (or clears) the single live session token.
    pub async fn set_current_token(&self, id: i64, token: Option<&str>) -> DbResult<()> {
        let result = sqlx::query("UPDATE users SET current_token = ?1 WHERE id = ?2")
            .bind(token)
            .bind(id)
            .execute(&self.pool)
            .await?;
        expect_affected(result, "user", id)
    }

    /// The live session token of a live account, if any.
    pub async fn get_current_token(&self, id: i64) -> DbResult<Option<String>> {
        let token: Option<Option<String>> = sqlx::query_scalar(
            "SELECT current_token FROM users WHERE id = ?1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(token.flatten())
    }

    /// Marks a live account deleted and ends its session.
    pub async fn soft_delete(&self, id: i64, actor: i64) -> DbResult<()> {
        debug!(id = %id, "Soft deleting user");

        let result = sqlx::query(
            "UPDATE users SET deleted_by = ?1, deleted_at = ?2, current_token = NULL \
             WHERE id = ?3 AND deleted_at IS NULL",
        )
        .bind(actor)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        expect_affected(result, "user", id)
    }

    /// Removes an account row.
    ///
    /// ## Errors
    /// - `ForeignKeyViolation` if the user rang up orders
    pub async fn hard_delete(&self, id: i64) -> DbResult<()> {
        debug!(id = %id, "Deleting user");

        let result = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        expect_affected(result, "user", id)
    }

    /// Number of accounts, live or not. Used by the seed binary.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn username_conflict(err: sqlx::Error, username: &str) -> DbError {
    match DbError::from(err) {
        DbError::UniqueViolation { .. } => DbError::duplicate("username", username),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn new_user(username: &str, role: Role) -> NewUser {
        NewUser {
            username: username.to_string(),
            password_hash: "$argon2id$v=19$placeholder".to_string(),
            role,
            full_name: format!("{username} full"),
        }
    }

    #[tokio::test]
    async fn test_duplicate_username() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.users().create(&new_user("kasir1", Role::Cashier), None).await.unwrap();

        let err = db
            .users()
            .create(&new_user("kasir1", Role::Admin), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref value, .. } if value == "kasir1"));
    }

    #[tokio::test]
    async fn test_update_keeps_password_when_absent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let user = db.users().create(&new_user("kasir1", Role::Cashier), None).await.unwrap();

        let updated = db
            .users()
            .update(
                user.id,
                &UserUpdate {
                    username: "kasir1".to_string(),
                    role: Role::Admin,
                    full_name: "Promoted".to_string(),
                    password_hash: None,
                },
                user.id,
            )
            .await
            .unwrap();

        assert_eq!(updated.role, Role::Admin);
        assert_eq!(updated.password_hash, user.password_hash);
    }

    #[tokio::test]
    async fn test_session_token_round_trip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let user = db.users().create(&new_user("kasir1", Role::Cashier), None).await.unwrap();

        db.users().set_current_token(user.id, Some("abc")).await.unwrap();
        let loaded = db.users().get_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(loaded.current_token.as_deref(), Some("abc"));
        assert_eq!(
            db.users().get_current_token(user.id).await.unwrap().as_deref(),
            Some("abc")
        );

        db.users().soft_delete(user.id, user.id).await.unwrap();
        assert!(db.users().get_by_id(user.id).await.unwrap().is_none());

        let deleted = db.users().find_by_username("kasir1").await.unwrap().unwrap();
        assert!(deleted.is_deleted());
        assert!(deleted.current_token.is_none());
    }
}
