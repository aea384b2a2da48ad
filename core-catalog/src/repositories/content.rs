//! Content item repository: the cached catalog's main table.
//!
//! Reads go through the pool and see the latest committed state; bulk
//! writes run inside the caller's transaction so one indexed page commits
//! atomically with its checkpoint advance.

use crate::error::{CatalogError, Result};
use crate::models::{normalize_name, ContentItem};
use crate::repositories::{Page, PageRequest};
use async_trait::async_trait;
use bridge_traits::catalog::{CatalogEntry, ContentType};
use core_account::AccountKey;
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};

/// Content item data access.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Find an item by identity.
    async fn find(
        &self,
        account: &AccountKey,
        content_type: ContentType,
        id: i64,
    ) -> Result<Option<ContentItem>>;

    /// Page through a content type in upstream listing order.
    async fn query_section(
        &self,
        account: &AccountKey,
        content_type: ContentType,
        request: PageRequest,
    ) -> Result<Page<ContentItem>>;

    /// Page through one category of a content type.
    async fn query_category(
        &self,
        account: &AccountKey,
        content_type: ContentType,
        category_id: &str,
        request: PageRequest,
    ) -> Result<Page<ContentItem>>;

    /// Search by normalized name, optionally restricted to one content
    /// type.
    async fn search(
        &self,
        account: &AccountKey,
        content_type: Option<ContentType>,
        query: &str,
        request: PageRequest,
    ) -> Result<Page<ContentItem>>;

    /// Count cached items of one content type.
    async fn count(&self, account: &AccountKey, content_type: ContentType) -> Result<u64>;

    /// Delete everything cached for an account.
    async fn delete_account(&self, account: &AccountKey) -> Result<u64>;
}

/// SQLite implementation of [`ContentRepository`].
#[derive(Clone)]
pub struct SqliteContentRepository {
    pool: SqlitePool,
}

impl SqliteContentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Upsert one page of upstream entries inside an open transaction.
    ///
    /// `start_position` is the offset of the first entry within the
    /// upstream ordering; re-running the same page is idempotent.
    pub async fn upsert_page(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        account: &AccountKey,
        entries: &[CatalogEntry],
        start_position: u64,
    ) -> Result<()> {
        for (i, entry) in entries.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO content_items (
                    account_key, content_type, id, stream_id,
                    name, normalized_name, category_id, icon_url,
                    container_extension, added_at, position
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT (account_key, content_type, id) DO UPDATE SET
                    stream_id = excluded.stream_id,
                    name = excluded.name,
                    normalized_name = excluded.normalized_name,
                    category_id = excluded.category_id,
                    icon_url = excluded.icon_url,
                    container_extension = excluded.container_extension,
                    added_at = excluded.added_at,
                    position = excluded.position
                "#,
            )
            .bind(account.as_str())
            .bind(entry.content_type.as_str())
            .bind(entry.id)
            .bind(entry.stream_id)
            .bind(&entry.name)
            .bind(normalize_name(&entry.name))
            .bind(&entry.category_id)
            .bind(&entry.icon_url)
            .bind(&entry.container_extension)
            .bind(entry.added_at)
            .bind((start_position + i as u64) as i64)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct ContentItemRow {
    content_type: String,
    id: i64,
    stream_id: i64,
    name: String,
    category_id: Option<String>,
    icon_url: Option<String>,
    container_extension: Option<String>,
    added_at: Option<i64>,
}

impl TryFrom<ContentItemRow> for ContentItem {
    type Error = CatalogError;

    fn try_from(row: ContentItemRow) -> Result<Self> {
        let content_type = ContentType::parse(&row.content_type)
            .ok_or_else(|| CatalogError::UnknownContentType(row.content_type.clone()))?;
        Ok(ContentItem {
            content_type,
            id: row.id,
            stream_id: row.stream_id,
            name: row.name,
            category_id: row.category_id,
            icon_url: row.icon_url,
            container_extension: row.container_extension,
            added_at: row.added_at,
        })
    }
}

const SELECT_COLUMNS: &str = "content_type, id, stream_id, name, category_id, icon_url, \
                              container_extension, added_at";

#[async_trait]
impl ContentRepository for SqliteContentRepository {
    async fn find(
        &self,
        account: &AccountKey,
        content_type: ContentType,
        id: i64,
    ) -> Result<Option<ContentItem>> {
        let row: Option<ContentItemRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM content_items \
             WHERE account_key = ? AND content_type = ? AND id = ?"
        ))
        .bind(account.as_str())
        .bind(content_type.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ContentItem::try_from).transpose()
    }

    async fn query_section(
        &self,
        account: &AccountKey,
        content_type: ContentType,
        request: PageRequest,
    ) -> Result<Page<ContentItem>> {
        let total: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM content_items WHERE account_key = ? AND content_type = ?",
        )
        .bind(account.as_str())
        .bind(content_type.as_str())
        .fetch_one(&self.pool)
        .await?;

        let rows: Vec<ContentItemRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM content_items \
             WHERE account_key = ? AND content_type = ? \
             ORDER BY position LIMIT ? OFFSET ?"
        ))
        .bind(account.as_str())
        .bind(content_type.as_str())
        .bind(request.limit())
        .bind(request.offset())
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(ContentItem::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, total.0 as u64, request))
    }

    async fn query_category(
        &self,
        account: &AccountKey,
        content_type: ContentType,
        category_id: &str,
        request: PageRequest,
    ) -> Result<Page<ContentItem>> {
        let total: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM content_items \
             WHERE account_key = ? AND content_type = ? AND category_id = ?",
        )
        .bind(account.as_str())
        .bind(content_type.as_str())
        .bind(category_id)
        .fetch_one(&self.pool)
        .await?;

        let rows: Vec<ContentItemRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM content_items \
             WHERE account_key = ? AND content_type = ? AND category_id = ? \
             ORDER BY position LIMIT ? OFFSET ?"
        ))
        .bind(account.as_str())
        .bind(content_type.as_str())
        .bind(category_id)
        .bind(request.limit())
        .bind(request.offset())
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(ContentItem::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, total.0 as u64, request))
    }

    async fn search(
        &self,
        account: &AccountKey,
        content_type: Option<ContentType>,
        query: &str,
        request: PageRequest,
    ) -> Result<Page<ContentItem>> {
        // normalize_name strips punctuation, so LIKE metacharacters cannot
        // survive into the pattern
        let pattern = format!("%{}%", normalize_name(query));
        let type_filter = match content_type {
            Some(_) => "AND content_type = ?",
            None => "",
        };

        let count_sql = format!(
            "SELECT COUNT(*) FROM content_items \
             WHERE account_key = ? AND normalized_name LIKE ? {type_filter}"
        );
        let mut count_query = sqlx::query_as::<_, (i64,)>(&count_sql)
            .bind(account.as_str())
            .bind(&pattern);
        if let Some(ct) = content_type {
            count_query = count_query.bind(ct.as_str());
        }
        let total = count_query.fetch_one(&self.pool).await?;

        let rows_sql = format!(
            "SELECT {SELECT_COLUMNS} FROM content_items \
             WHERE account_key = ? AND normalized_name LIKE ? {type_filter} \
             ORDER BY normalized_name LIMIT ? OFFSET ?"
        );
        let mut rows_query = sqlx::query_as::<_, ContentItemRow>(&rows_sql)
            .bind(account.as_str())
            .bind(&pattern);
        if let Some(ct) = content_type {
            rows_query = rows_query.bind(ct.as_str());
        }
        let rows = rows_query
            .bind(request.limit())
            .bind(request.offset())
            .fetch_all(&self.pool)
            .await?;

        let items = rows
            .into_iter()
            .map(ContentItem::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, total.0 as u64, request))
    }

    async fn count(&self, account: &AccountKey, content_type: ContentType) -> Result<u64> {
        let total: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM content_items WHERE account_key = ? AND content_type = ?",
        )
        .bind(account.as_str())
        .bind(content_type.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(total.0 as u64)
    }

    async fn delete_account(&self, account: &AccountKey) -> Result<u64> {
        let result = sqlx::query("DELETE FROM content_items WHERE account_key = ?")
            .bind(account.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
