use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use super::repo_types::FoodEntry;

/// Per-user partitioned entry storage.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// All entries become visible or none do.
    async fn insert_batch(&self, entries: &[FoodEntry]) -> anyhow::Result<()>;

    /// Removing an id that does not exist (or belongs to someone else) is not an error.
    async fn delete(&self, user_id: Uuid, entry_id: Uuid) -> anyhow::Result<()>;

    /// Entries with `since <= created_at < until`, newest first, at most `limit`.
    async fn list_range(
        &self,
        user_id: Uuid,
        since: OffsetDateTime,
        until: Option<OffsetDateTime>,
        limit: i64,
    ) -> anyhow::Result<Vec<FoodEntry>>;
}

#[derive(Clone)]
pub struct PgEntryStore {
    db: PgPool,
}

impl PgEntryStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

async fn insert_entry_tx(tx: &mut Transaction<'_, Postgres>, entry: &FoodEntry) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO food_entries (id, user_id, name, calories, protein, carbs, fats, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(entry.id)
    .bind(entry.user_id)
    .bind(&entry.name)
    .bind(entry.calories)
    .bind(entry.protein)
    .bind(entry.carbs)
    .bind(entry.fats)
    .bind(entry.created_at)
    .execute(&mut **tx)
    .await
    .with_context(|| format!("insert food entry {}", entry.id))?;
    Ok(())
}

#[async_trait]
impl EntryStore for PgEntryStore {
    async fn insert_batch(&self, entries: &[FoodEntry]) -> anyhow::Result<()> {
        let mut tx = self.db.begin().await.context("begin tx")?;
        for e in entries {
            insert_entry_tx(&mut tx, e).await?;
        }
        tx.commit().await.context("commit tx")?;
        Ok(())
    }

    async fn delete(&self, user_id: Uuid, entry_id: Uuid) -> anyhow::Result<()> {
        let res = sqlx::query(r#"DELETE FROM food_entries WHERE id = $1 AND user_id = $2"#)
            .bind(entry_id)
            .bind(user_id)
            .execute(&self.db)
            .await
            .context("delete food entry")?;
        debug!(%user_id, %entry_id, rows = res.rows_affected(), "delete food entry");
        Ok(())
    }

    async fn list_range(
        &self,
        user_id: Uuid,
        since: OffsetDateTime,
        until: Option<OffsetDateTime>,
        limit: i64,
    ) -> anyhow::Result<Vec<FoodEntry>> {
        let rows = sqlx::query_as::<_, FoodEntry>(
            r#"
            SELECT id, user_id, name, calories, protein, carbs, fats, created_at
              FROM food_entries
             WHERE user_id = $1
               AND created_at >= $2
               AND ($3::timestamptz IS NULL OR created_at < $3)
             ORDER BY created_at DESC
             LIMIT $4
            "#,
        )
        .bind(user_id)
        .bind(since)
        .bind(until)
        .bind(limit)
        .fetch_all(&self.db)
        .await
        .context("list food entries")?;
        Ok(rows)
    }
}
