use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::database::like_pattern;
use crate::error::Result;
use crate::lore::{Creator, Lore, LoreType, LoreView};

/// Persisted lores. Lists are ordered newest first.
#[async_trait]
pub trait LoreRepository: Send + Sync {
    async fn create(&self, lore: &Lore) -> Result<()>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Lore>>;

    async fn find_view(&self, id: Uuid) -> Result<Option<LoreView>>;

    async fn update(&self, lore: &Lore) -> Result<()>;

    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Every lore, or only those of `kind`.
    async fn list(&self, kind: Option<LoreType>) -> Result<Vec<LoreView>>;

    /// Lores whose title, location or content contains `term`.
    async fn search(&self, term: &str) -> Result<Vec<LoreView>>;
}

#[derive(sqlx::FromRow)]
struct LoreRow {
    #[sqlx(flatten)]
    lore: Lore,
    creator_username: String,
}

impl From<LoreRow> for LoreView {
    fn from(row: LoreRow) -> Self {
        LoreView {
            lore: row.lore,
            creator: Creator {
                username: row.creator_username,
            },
        }
    }
}

const SELECT_LORE: &str = r#"SELECT id, title, location, type, content, image, user_id,
                created_at, updated_at
            FROM lores"#;

const SELECT_VIEW: &str = r#"SELECT l.id, l.title, l.location, l.type, l.content, l.image,
                l.user_id, l.created_at, l.updated_at, u.username AS creator_username
            FROM lores l
            JOIN users u ON u.id = l.user_id"#;

#[derive(Clone)]
pub struct PgLoreRepository {
    pool: Pool<Postgres>,
}

impl PgLoreRepository {
    /// Create a new [`PgLoreRepository`].
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoreRepository for PgLoreRepository {
    async fn create(&self, lore: &Lore) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO lores (id, title, location, type, content, image, user_id,
                    created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"#,
        )
        .bind(lore.id)
        .bind(&lore.title)
        .bind(&lore.location)
        .bind(lore.kind)
        .bind(&lore.content)
        .bind(&lore.image)
        .bind(lore.user_id)
        .bind(lore.created_at)
        .bind(lore.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Lore>> {
        let query = format!("{SELECT_LORE} WHERE id = $1");

        Ok(sqlx::query_as::<_, Lore>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_view(&self, id: Uuid) -> Result<Option<LoreView>> {
        let query = format!("{SELECT_VIEW} WHERE l.id = $1");

        Ok(sqlx::query_as::<_, LoreRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(LoreView::from))
    }

    async fn update(&self, lore: &Lore) -> Result<()> {
        sqlx::query(
            r#"UPDATE lores
                SET title = $1, location = $2, type = $3, content = $4, image = $5,
                    updated_at = $6
                WHERE id = $7"#,
        )
        .bind(&lore.title)
        .bind(&lore.location)
        .bind(lore.kind)
        .bind(&lore.content)
        .bind(&lore.image)
        .bind(lore.updated_at)
        .bind(lore.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        sqlx::query(r#"DELETE FROM lores WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn list(&self, kind: Option<LoreType>) -> Result<Vec<LoreView>> {
        let query = format!(
            "{SELECT_VIEW} WHERE $1::lore_type IS NULL OR l.type = $1 ORDER BY l.created_at DESC"
        );

        let rows = sqlx::query_as::<_, LoreRow>(&query)
            .bind(kind)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(LoreView::from).collect())
    }

    async fn search(&self, term: &str) -> Result<Vec<LoreView>> {
        let query = format!(
            r#"{SELECT_VIEW}
            WHERE l.title ILIKE $1 ESCAPE '\' OR l.location ILIKE $1 ESCAPE '\'
                OR l.content ILIKE $1 ESCAPE '\'
            ORDER BY l.created_at DESC"#
        );

        let rows = sqlx::query_as::<_, LoreRow>(&query)
            .bind(like_pattern(term))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(LoreView::from).collect())
    }
}
