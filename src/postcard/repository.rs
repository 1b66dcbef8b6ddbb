use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error::Result;
use crate::postcard::{Postcard, PostcardView};
use crate::user::UserSummary;

/// Persisted postcards.
#[async_trait]
pub trait PostcardRepository: Send + Sync {
    async fn create(&self, postcard: &Postcard) -> Result<()>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Postcard>>;

    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Postcards sent by `sender_id`, with their recipient.
    async fn list_sent(&self, sender_id: Uuid) -> Result<Vec<PostcardView>>;

    /// Postcards received by `recipient_id`, with their sender.
    async fn list_received(
        &self,
        recipient_id: Uuid,
    ) -> Result<Vec<PostcardView>>;

    async fn count_sent(&self, sender_id: Uuid) -> Result<i64>;
}

#[derive(sqlx::FromRow)]
struct PostcardRow {
    #[sqlx(flatten)]
    postcard: Postcard,
    other_id: Uuid,
    other_username: String,
    other_email: String,
}

impl PostcardRow {
    fn other(&self) -> UserSummary {
        UserSummary {
            id: self.other_id,
            username: self.other_username.clone(),
            email: self.other_email.clone(),
        }
    }
}

/// Join postcards with the user on `join_column`, filtered by `filter_column`.
fn with_other_query(join_column: &str, filter_column: &str) -> String {
    format!(
        r#"SELECT p.id, p.message, p.location, p.background_image, p.font_style, p.stamp,
                p.sender_id, p.recipient_id, p.created_at, p.updated_at,
                u.id AS other_id, u.username AS other_username, u.email AS other_email
            FROM postcards p
            JOIN users u ON u.id = p.{join_column}
            WHERE p.{filter_column} = $1
            ORDER BY p.created_at"#
    )
}

#[derive(Clone)]
pub struct PgPostcardRepository {
    pool: Pool<Postgres>,
}

impl PgPostcardRepository {
    /// Create a new [`PgPostcardRepository`].
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostcardRepository for PgPostcardRepository {
    async fn create(&self, postcard: &Postcard) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO postcards (id, message, location, background_image, font_style, stamp,
                    sender_id, recipient_id, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"#,
        )
        .bind(postcard.id)
        .bind(&postcard.message)
        .bind(&postcard.location)
        .bind(&postcard.background_image)
        .bind(postcard.font_style)
        .bind(postcard.stamp)
        .bind(postcard.sender_id)
        .bind(postcard.recipient_id)
        .bind(postcard.created_at)
        .bind(postcard.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Postcard>> {
        Ok(sqlx::query_as::<_, Postcard>(
            r#"SELECT id, message, location, background_image, font_style, stamp, sender_id,
                    recipient_id, created_at, updated_at
                FROM postcards WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        sqlx::query(r#"DELETE FROM postcards WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn list_sent(&self, sender_id: Uuid) -> Result<Vec<PostcardView>> {
        let query = with_other_query("recipient_id", "sender_id");
        let rows = sqlx::query_as::<_, PostcardRow>(&query)
            .bind(sender_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| PostcardView {
                recipient: Some(row.other()),
                sender: None,
                postcard: row.postcard,
            })
            .collect())
    }

    async fn list_received(
        &self,
        recipient_id: Uuid,
    ) -> Result<Vec<PostcardView>> {
        let query = with_other_query("sender_id", "recipient_id");
        let rows = sqlx::query_as::<_, PostcardRow>(&query)
            .bind(recipient_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| PostcardView {
                sender: Some(row.other()),
                recipient: None,
                postcard: row.postcard,
            })
            .collect())
    }

    async fn count_sent(&self, sender_id: Uuid) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"SELECT COUNT(*) FROM postcards WHERE sender_id = $1"#,
        )
        .bind(sender_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_query() {
        let query = with_other_query("recipient_id", "sender_id");
        assert!(query.contains("JOIN users u ON u.id = p.recipient_id"));
        assert!(query.contains("WHERE p.sender_id = $1"));
    }
}
