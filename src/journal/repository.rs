use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::database::like_pattern;
use crate::error::Result;
use crate::journal::Journal;

/// Persisted journal entries.
#[async_trait]
pub trait JournalRepository: Send + Sync {
    async fn create(&self, journal: &Journal) -> Result<()>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Journal>>;

    async fn update(&self, journal: &Journal) -> Result<()>;

    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Every entry, oldest first.
    async fn list(&self) -> Result<Vec<Journal>>;

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Journal>>;

    /// Latest entries by journal date.
    async fn recent(&self, limit: i64) -> Result<Vec<Journal>>;

    /// Entries sharing at least one tag with `tags`.
    async fn search_tags(&self, tags: &[String]) -> Result<Vec<Journal>>;

    /// Entries whose title contains `title`, ignoring case.
    async fn search_title(&self, title: &str) -> Result<Vec<Journal>>;

    async fn count_by_user(&self, user_id: Uuid) -> Result<i64>;
}

const SELECT_JOURNAL: &str = r#"SELECT id, title, date, location, journal_entry, photos, tags,
                user_id, created_at, updated_at
            FROM journals"#;

#[derive(Clone)]
pub struct PgJournalRepository {
    pool: Pool<Postgres>,
}

impl PgJournalRepository {
    /// Create a new [`PgJournalRepository`].
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JournalRepository for PgJournalRepository {
    async fn create(&self, journal: &Journal) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO journals (id, title, date, location, journal_entry, photos, tags,
                    user_id, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"#,
        )
        .bind(journal.id)
        .bind(&journal.title)
        .bind(journal.date)
        .bind(&journal.location)
        .bind(&journal.journal_entry)
        .bind(&journal.photos)
        .bind(&journal.tags)
        .bind(journal.user_id)
        .bind(journal.created_at)
        .bind(journal.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Journal>> {
        let query = format!("{SELECT_JOURNAL} WHERE id = $1");

        Ok(sqlx::query_as::<_, Journal>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update(&self, journal: &Journal) -> Result<()> {
        sqlx::query(
            r#"UPDATE journals
                SET title = $1, date = $2, location = $3, journal_entry = $4, photos = $5,
                    tags = $6, updated_at = $7
                WHERE id = $8"#,
        )
        .bind(&journal.title)
        .bind(journal.date)
        .bind(&journal.location)
        .bind(&journal.journal_entry)
        .bind(&journal.photos)
        .bind(&journal.tags)
        .bind(journal.updated_at)
        .bind(journal.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        sqlx::query(r#"DELETE FROM journals WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn list(&self) -> Result<Vec<Journal>> {
        let query = format!("{SELECT_JOURNAL} ORDER BY created_at");

        Ok(sqlx::query_as::<_, Journal>(&query)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Journal>> {
        let query =
            format!("{SELECT_JOURNAL} WHERE user_id = $1 ORDER BY created_at");

        Ok(sqlx::query_as::<_, Journal>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn recent(&self, limit: i64) -> Result<Vec<Journal>> {
        let query = format!(
            "{SELECT_JOURNAL} ORDER BY date DESC, created_at DESC LIMIT $1"
        );

        Ok(sqlx::query_as::<_, Journal>(&query)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn search_tags(&self, tags: &[String]) -> Result<Vec<Journal>> {
        let query =
            format!("{SELECT_JOURNAL} WHERE tags && $1 ORDER BY created_at");

        Ok(sqlx::query_as::<_, Journal>(&query)
            .bind(tags)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn search_title(&self, title: &str) -> Result<Vec<Journal>> {
        let query = format!(
            r#"{SELECT_JOURNAL} WHERE title ILIKE $1 ESCAPE '\' ORDER BY created_at"#
        );

        Ok(sqlx::query_as::<_, Journal>(&query)
            .bind(like_pattern(title))
            .fetch_all(&self.pool)
            .await?)
    }

    async fn count_by_user(&self, user_id: Uuid) -> Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as(r#"SELECT COUNT(*) FROM journals WHERE user_id = $1"#)
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}
