//! Section sync checkpoint repository.
//!
//! Checkpoints are the resumability contract of the whole sync pipeline:
//! they advance only inside the same transaction that commits the page
//! they describe, and they advance monotonically. The only rewind is a
//! forced reset, which deletes the row.

use crate::error::{CatalogError, Result};
use crate::models::{Section, SectionSyncCheckpoint};
use async_trait::async_trait;
use chrono::Utc;
use core_account::AccountKey;
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};

/// Checkpoint data access.
#[async_trait]
pub trait CheckpointRepository: Send + Sync {
    /// Look up the checkpoint of one section.
    async fn get(
        &self,
        account: &AccountKey,
        section: Section,
    ) -> Result<Option<SectionSyncCheckpoint>>;

    /// Look up the checkpoint, creating a zeroed row on first sync attempt.
    async fn get_or_create(
        &self,
        account: &AccountKey,
        section: Section,
    ) -> Result<SectionSyncCheckpoint>;

    /// Whether every given section has a complete checkpoint.
    async fn all_complete(&self, account: &AccountKey, sections: &[Section]) -> Result<bool>;

    /// Whether any section has indexed at least one item.
    async fn any_items(&self, account: &AccountKey) -> Result<bool>;

    /// Forced reset: delete the row so the next sync starts from scratch.
    async fn reset(&self, account: &AccountKey, section: Section) -> Result<()>;

    /// Delete everything for an account.
    async fn delete_account(&self, account: &AccountKey) -> Result<u64>;
}

/// SQLite implementation of [`CheckpointRepository`].
#[derive(Clone)]
pub struct SqliteCheckpointRepository {
    pool: SqlitePool,
}

impl SqliteCheckpointRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Advance a checkpoint inside the transaction that commits its page.
    ///
    /// The WHERE guard enforces monotonicity at the database level: an
    /// advance from a superseded task whose view of the cursor is behind
    /// the committed row updates nothing and reports
    /// [`CatalogError::Cancelled`].
    #[allow(clippy::too_many_arguments)]
    pub async fn advance(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        account: &AccountKey,
        section: Section,
        new_cursor: u64,
        items_indexed: u64,
        total_estimate: Option<u64>,
        is_complete: bool,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE section_checkpoints SET
                cursor = ?,
                items_indexed = ?,
                total_estimate = ?,
                is_complete = ?,
                updated_at = ?
            WHERE account_key = ? AND section = ?
              AND cursor <= ? AND is_complete = 0
            "#,
        )
        .bind(new_cursor as i64)
        .bind(items_indexed as i64)
        .bind(total_estimate.map(|t| t as i64))
        .bind(is_complete)
        .bind(Utc::now().timestamp())
        .bind(account.as_str())
        .bind(section.as_str())
        .bind(new_cursor as i64)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::Cancelled);
        }
        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct CheckpointRow {
    section: String,
    cursor: i64,
    items_indexed: i64,
    total_estimate: Option<i64>,
    is_complete: bool,
    updated_at: i64,
}

impl TryFrom<CheckpointRow> for SectionSyncCheckpoint {
    type Error = CatalogError;

    fn try_from(row: CheckpointRow) -> Result<Self> {
        Ok(SectionSyncCheckpoint {
            section: row.section.parse()?,
            cursor: row.cursor as u64,
            items_indexed: row.items_indexed as u64,
            total_estimate: row.total_estimate.map(|t| t as u64),
            is_complete: row.is_complete,
            updated_at: row.updated_at,
        })
    }
}

const SELECT: &str = "SELECT section, cursor, items_indexed, total_estimate, is_complete, \
                      updated_at FROM section_checkpoints WHERE account_key = ? AND section = ?";

#[async_trait]
impl CheckpointRepository for SqliteCheckpointRepository {
    async fn get(
        &self,
        account: &AccountKey,
        section: Section,
    ) -> Result<Option<SectionSyncCheckpoint>> {
        let row: Option<CheckpointRow> = sqlx::query_as(SELECT)
            .bind(account.as_str())
            .bind(section.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(SectionSyncCheckpoint::try_from).transpose()
    }

    async fn get_or_create(
        &self,
        account: &AccountKey,
        section: Section,
    ) -> Result<SectionSyncCheckpoint> {
        sqlx::query(
            "INSERT OR IGNORE INTO section_checkpoints \
             (account_key, section, cursor, items_indexed, is_complete, updated_at) \
             VALUES (?, ?, 0, 0, 0, ?)",
        )
        .bind(account.as_str())
        .bind(section.as_str())
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        self.get(account, section).await?.ok_or_else(|| {
            CatalogError::InvalidInput {
                field: "section".to_string(),
                message: format!("checkpoint row missing after insert: {section}"),
            }
        })
    }

    async fn all_complete(&self, account: &AccountKey, sections: &[Section]) -> Result<bool> {
        for section in sections {
            match self.get(account, *section).await? {
                Some(cp) if cp.is_complete => continue,
                _ => return Ok(false),
            }
        }
        Ok(true)
    }

    async fn any_items(&self, account: &AccountKey) -> Result<bool> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM section_checkpoints \
             WHERE account_key = ? AND items_indexed > 0",
        )
        .bind(account.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0 > 0)
    }

    async fn reset(&self, account: &AccountKey, section: Section) -> Result<()> {
        sqlx::query("DELETE FROM section_checkpoints WHERE account_key = ? AND section = ?")
            .bind(account.as_str())
            .bind(section.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_account(&self, account: &AccountKey) -> Result<u64> {
        let result = sqlx::query("DELETE FROM section_checkpoints WHERE account_key = ?")
            .bind(account.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use core_account::PlaylistConfig;

    fn account() -> AccountKey {
        PlaylistConfig::new("http://s", "u", "p", "Main").account_key()
    }

    async fn advance(
        repo: &SqliteCheckpointRepository,
        pool: &SqlitePool,
        cursor: u64,
        items: u64,
        complete: bool,
    ) -> Result<()> {
        let mut tx = pool.begin().await.unwrap();
        let result = repo
            .advance(
                &mut tx,
                &account(),
                Section::Movies,
                cursor,
                items,
                Some(100),
                complete,
            )
            .await;
        tx.commit().await.unwrap();
        result
    }

    #[tokio::test]
    async fn test_get_or_create_starts_zeroed() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteCheckpointRepository::new(pool);
        let cp = repo
            .get_or_create(&account(), Section::Movies)
            .await
            .unwrap();
        assert_eq!(cp.cursor, 0);
        assert_eq!(cp.items_indexed, 0);
        assert!(!cp.is_complete);
    }

    #[tokio::test]
    async fn test_advance_is_monotonic() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteCheckpointRepository::new(pool.clone());
        repo.get_or_create(&account(), Section::Movies)
            .await
            .unwrap();

        advance(&repo, &pool, 50, 50, false).await.unwrap();

        // A stale writer that still believes the cursor is lower advances
        // nothing (25 < 50 fails the guard because 50 <= 25 is false)
        let stale = advance(&repo, &pool, 25, 25, false).await;
        assert!(matches!(stale, Err(CatalogError::Cancelled)));

        let cp = repo.get(&account(), Section::Movies).await.unwrap().unwrap();
        assert_eq!(cp.cursor, 50);
    }

    #[tokio::test]
    async fn test_complete_checkpoint_rejects_further_advances() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteCheckpointRepository::new(pool.clone());
        repo.get_or_create(&account(), Section::Movies)
            .await
            .unwrap();

        advance(&repo, &pool, 100, 100, true).await.unwrap();
        let late = advance(&repo, &pool, 150, 150, false).await;
        assert!(matches!(late, Err(CatalogError::Cancelled)));

        let cp = repo.get(&account(), Section::Movies).await.unwrap().unwrap();
        assert!(cp.is_complete);
        assert_eq!(cp.cursor, 100);
    }

    #[tokio::test]
    async fn test_reset_is_the_only_rewind() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteCheckpointRepository::new(pool.clone());
        repo.get_or_create(&account(), Section::Movies)
            .await
            .unwrap();
        advance(&repo, &pool, 100, 100, true).await.unwrap();

        repo.reset(&account(), Section::Movies).await.unwrap();
        assert!(repo.get(&account(), Section::Movies).await.unwrap().is_none());

        let fresh = repo
            .get_or_create(&account(), Section::Movies)
            .await
            .unwrap();
        assert_eq!(fresh.cursor, 0);
    }

    #[tokio::test]
    async fn test_all_complete_and_any_items() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteCheckpointRepository::new(pool.clone());
        let sections = [Section::Movies, Section::Series];

        assert!(!repo.all_complete(&account(), &sections).await.unwrap());
        assert!(!repo.any_items(&account()).await.unwrap());

        for section in sections {
            repo.get_or_create(&account(), section).await.unwrap();
            let mut tx = pool.begin().await.unwrap();
            repo.advance(&mut tx, &account(), section, 10, 10, Some(10), true)
                .await
                .unwrap();
            tx.commit().await.unwrap();
        }

        assert!(repo.all_complete(&account(), &sections).await.unwrap());
        assert!(repo.any_items(&account()).await.unwrap());
    }
}
