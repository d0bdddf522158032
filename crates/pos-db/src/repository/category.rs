//! # Category Repository

use chrono::{DateTime, Utc};
use sqlx::{SqliteExecutor, SqlitePool};
use tracing::debug;

use pos_core::{Category, PageRequest, Paginated};

use crate::error::DbResult;
use crate::repository::expect_affected;

const COLUMNS: &str =
    "id, name, created_by, updated_by, deleted_by, created_at, updated_at, deleted_at";

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: i64,
    name: String,
    created_by: Option<i64>,
    updated_by: Option<i64>,
    deleted_by: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: row.id,
            name: row.name,
            created_by: row.created_by,
            updated_by: row.updated_by,
            deleted_by: row.deleted_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        }
    }
}

/// Fetches a category that is not soft deleted.
pub async fn fetch_live_category<'e, E>(executor: E, id: i64) -> DbResult<Option<Category>>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("SELECT {COLUMNS} FROM categories WHERE id = ?1 AND deleted_at IS NULL");
    let row = sqlx::query_as::<_, CategoryRow>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(row.map(Category::from))
}

/// Repository for product categories.
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    /// Inserts a category. `name` must already be validated.
    pub async fn create(&self, name: &str, actor: i64) -> DbResult<Category> {
        debug!(name = %name, "Creating category");

        let sql = format!(
            "INSERT INTO categories (name, created_by, created_at) VALUES (?1, ?2, ?3) RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, CategoryRow>(&sql)
            .bind(name)
            .bind(actor)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    /// Gets a live category by id.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Category>> {
        fetch_live_category(&self.pool, id).await
    }

    /// Lists live categories ordered by id.
    pub async fn list(&self, page: PageRequest) -> DbResult<Paginated<Category>> {
        self.page("deleted_at IS NULL", page).await
    }

    /// Lists soft-deleted categories.
    pub async fn list_deleted(&self, page: PageRequest) -> DbResult<Paginated<Category>> {
        self.page("deleted_at IS NOT NULL", page).await
    }

    async fn page(&self, filter: &str, page: PageRequest) -> DbResult<Paginated<Category>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM categories WHERE {filter} ORDER BY id LIMIT ?1 OFFSET ?2"
        );
        let rows = sqlx::query_as::<_, CategoryRow>(&sql)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM categories WHERE {filter}"))
                .fetch_one(&self.pool)
                .await?;

        Ok(Paginated::new(
            rows.into_iter().map(Category::from).collect(),
            page,
            total,
        ))
    }

    /// Renames a live category.
    pub async fn update(&self, id: i64, name: &str, actor: i64) -> DbResult<Category> {
        debug!(id = %id, "Updating category");

        let sql = format!(
            "UPDATE categories SET name = ?1, updated_by = ?2, updated_at = ?3 \
             WHERE id = ?4 AND deleted_at IS NULL RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, CategoryRow>(&sql)
            .bind(name)
            .bind(actor)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Category::from)
            .ok_or_else(|| crate::DbError::not_found("category", id))
    }

    /// Marks a live category deleted. Products keep their reference.
    pub async fn soft_delete(&self, id: i64, actor: i64) -> DbResult<()> {
        debug!(id = %id, "Soft deleting category");

        let result = sqlx::query(
            "UPDATE categories SET deleted_by = ?1, deleted_at = ?2 \
             WHERE id = ?3 AND deleted_at IS NULL",
        )
        .bind(actor)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        expect_affected(result, "category", id)
    }

    /// Removes a category row. Products fall back to no category.
    pub async fn hard_delete(&self, id: i64) -> DbResult<()> {
        debug!(id = %id, "Deleting category");

        let result = sqlx::query("DELETE FROM categories WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        expect_affected(result, "category", id)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig, DbError};
    use pos_core::PageRequest;

    #[tokio::test]
    async fn test_category_lifecycle() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.categories();

        let drinks = repo.create("Drinks", 1).await.unwrap();
        let snacks = repo.create("Snacks", 1).await.unwrap();
        assert_eq!(drinks.created_by, Some(1));

        let renamed = repo.update(drinks.id, "Beverages", 2).await.unwrap();
        assert_eq!(renamed.name, "Beverages");
        assert_eq!(renamed.updated_by, Some(2));
        assert!(renamed.updated_at.is_some());

        repo.soft_delete(snacks.id, 2).await.unwrap();
        assert!(repo.get_by_id(snacks.id).await.unwrap().is_none());

        let live = repo.list(PageRequest::default()).await.unwrap();
        assert_eq!(live.total, 1);
        assert_eq!(live.items[0].id, drinks.id);

        let deleted = repo.list_deleted(PageRequest::default()).await.unwrap();
        assert_eq!(deleted.total, 1);
        assert_eq!(deleted.items[0].deleted_by, Some(2));

        // Soft deleting twice is a not-found.
        assert!(matches!(
            repo.soft_delete(snacks.id, 2).await,
            Err(DbError::NotFound { .. })
        ));

        repo.hard_delete(snacks.id).await.unwrap();
        assert!(repo.list_deleted(PageRequest::default()).await.unwrap().items.is_empty());
    }

    #[tokio::test]
    async fn test_pagination() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.categories();
        for i in 0..5 {
            repo.create(&format!("Category {i}"), 1).await.unwrap();
        }

        let page = repo
            .list(PageRequest::new(Some(2), Some(2)).unwrap())
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].name, "Category 2");
    }

    #[tokio::test]
    async fn test_update_missing_category() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(matches!(
            db.categories().update(99, "Nope", 1).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
