//! Category repository.

use crate::error::{CatalogError, Result};
use crate::models::{normalize_name, Category};
use crate::repositories::{Page, PageRequest};
use async_trait::async_trait;
use bridge_traits::catalog::{CatalogCategory, ContentType};
use core_account::AccountKey;
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};

/// Category data access.
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Page through the categories of a content type in upstream order.
    async fn query(
        &self,
        account: &AccountKey,
        content_type: ContentType,
        request: PageRequest,
    ) -> Result<Page<Category>>;

    /// Search categories by normalized name.
    async fn search(
        &self,
        account: &AccountKey,
        content_type: ContentType,
        query: &str,
        request: PageRequest,
    ) -> Result<Page<Category>>;

    /// Thumbnail URL for one category, if cached.
    async fn thumbnail(
        &self,
        account: &AccountKey,
        content_type: ContentType,
        category_id: &str,
    ) -> Result<Option<String>>;

    /// Delete everything cached for an account.
    async fn delete_account(&self, account: &AccountKey) -> Result<u64>;
}

/// SQLite implementation of [`CategoryRepository`].
#[derive(Clone)]
pub struct SqliteCategoryRepository {
    pool: SqlitePool,
}

impl SqliteCategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Replace the categories of one content type inside an open
    /// transaction. Runs together with the section's first indexed page.
    pub async fn replace_all(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        account: &AccountKey,
        content_type: ContentType,
        categories: &[CatalogCategory],
    ) -> Result<()> {
        sqlx::query("DELETE FROM categories WHERE account_key = ? AND content_type = ?")
            .bind(account.as_str())
            .bind(content_type.as_str())
            .execute(&mut **tx)
            .await?;

        for (i, category) in categories.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO categories (
                    account_key, content_type, id, name,
                    normalized_name, thumbnail_url, position
                ) VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(account.as_str())
            .bind(content_type.as_str())
            .bind(&category.id)
            .bind(&category.name)
            .bind(normalize_name(&category.name))
            .bind(&category.thumbnail_url)
            .bind(i as i64)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct CategoryRow {
    content_type: String,
    id: String,
    name: String,
    thumbnail_url: Option<String>,
}

impl TryFrom<CategoryRow> for Category {
    type Error = CatalogError;

    fn try_from(row: CategoryRow) -> Result<Self> {
        let content_type = ContentType::parse(&row.content_type)
            .ok_or_else(|| CatalogError::UnknownContentType(row.content_type.clone()))?;
        Ok(Category {
            content_type,
            id: row.id,
            name: row.name,
            thumbnail_url: row.thumbnail_url,
        })
    }
}

#[async_trait]
impl CategoryRepository for SqliteCategoryRepository {
    async fn query(
        &self,
        account: &AccountKey,
        content_type: ContentType,
        request: PageRequest,
    ) -> Result<Page<Category>> {
        let total: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM categories WHERE account_key = ? AND content_type = ?",
        )
        .bind(account.as_str())
        .bind(content_type.as_str())
        .fetch_one(&self.pool)
        .await?;

        let rows: Vec<CategoryRow> = sqlx::query_as(
            "SELECT content_type, id, name, thumbnail_url FROM categories \
             WHERE account_key = ? AND content_type = ? \
             ORDER BY position LIMIT ? OFFSET ?",
        )
        .bind(account.as_str())
        .bind(content_type.as_str())
        .bind(request.limit())
        .bind(request.offset())
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(Category::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, total.0 as u64, request))
    }

    async fn search(
        &self,
        account: &AccountKey,
        content_type: ContentType,
        query: &str,
        request: PageRequest,
    ) -> Result<Page<Category>> {
        let pattern = format!("%{}%", normalize_name(query));

        let total: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM categories \
             WHERE account_key = ? AND content_type = ? AND normalized_name LIKE ?",
        )
        .bind(account.as_str())
        .bind(content_type.as_str())
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        let rows: Vec<CategoryRow> = sqlx::query_as(
            "SELECT content_type, id, name, thumbnail_url FROM categories \
             WHERE account_key = ? AND content_type = ? AND normalized_name LIKE ? \
             ORDER BY position LIMIT ? OFFSET ?",
        )
        .bind(account.as_str())
        .bind(content_type.as_str())
        .bind(&pattern)
        .bind(request.limit())
        .bind(request.offset())
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(Category::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, total.0 as u64, request))
    }

    async fn thumbnail(
        &self,
        account: &AccountKey,
        content_type: ContentType,
        category_id: &str,
    ) -> Result<Option<String>> {
        let row: Option<(Option<String>,)> = sqlx::query_as(
            "SELECT thumbnail_url FROM categories \
             WHERE account_key = ? AND content_type = ? AND id = ?",
        )
        .bind(account.as_str())
        .bind(content_type.as_str())
        .bind(category_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.and_then(|r| r.0))
    }

    async fn delete_account(&self, account: &AccountKey) -> Result<u64> {
        let result = sqlx::query("DELETE FROM categories WHERE account_key = ?")
            .bind(account.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
