//! Handle database requests.

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error::Result;
use crate::user::User;

/// Persisted users.
///
/// Implementations reject a write that would duplicate an email or a
/// username.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert [`User`].
    async fn create(&self, user: &User) -> Result<()>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Find user whose email or username equals `identifier`.
    async fn find_by_identifier(&self, identifier: &str)
    -> Result<Option<User>>;

    /// Whether `email` or `username` is already taken.
    async fn exists(&self, email: &str, username: &str) -> Result<bool>;

    /// Overwrite every mutable column of [`User`].
    async fn update(&self, user: &User) -> Result<()>;

    async fn list(&self) -> Result<Vec<User>>;
}

#[derive(Clone)]
pub struct PgUserRepository {
    pool: Pool<Postgres>,
}

impl PgUserRepository {
    /// Create a new [`PgUserRepository`].
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn find_by(&self, field: Field, value: &str) -> Result<Option<User>> {
        let query = get_by_field_query(field);

        Ok(sqlx::query_as::<_, User>(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?)
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO users (id, username, email, password, is_verified, otp, otp_expires,
                    role, location, description, profile_picture, cover_image, countries_visited,
                    created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)"#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password)
        .bind(user.is_verified)
        .bind(&user.otp)
        .bind(user.otp_expires)
        .bind(user.role)
        .bind(&user.location)
        .bind(&user.description)
        .bind(&user.profile_picture)
        .bind(&user.cover_image)
        .bind(&user.countries_visited)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let query = format!("{SELECT_USER} WHERE id = $1");

        Ok(sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.find_by(Field::Email, email).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        self.find_by(Field::Username, username).await
    }

    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<User>> {
        let query =
            format!("{SELECT_USER} WHERE email = $1 OR username = $1 LIMIT 1");

        Ok(sqlx::query_as::<_, User>(&query)
            .bind(identifier)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn exists(&self, email: &str, username: &str) -> Result<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            r#"SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 OR username = $2)"#,
        )
        .bind(email)
        .bind(username)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn update(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"UPDATE users
                SET username = $1, email = $2, password = $3, is_verified = $4, otp = $5,
                    otp_expires = $6, role = $7, location = $8, description = $9,
                    profile_picture = $10, cover_image = $11, countries_visited = $12,
                    updated_at = $13
                WHERE id = $14"#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password)
        .bind(user.is_verified)
        .bind(&user.otp)
        .bind(user.otp_expires)
        .bind(user.role)
        .bind(&user.location)
        .bind(&user.description)
        .bind(&user.profile_picture)
        .bind(&user.cover_image)
        .bind(&user.countries_visited)
        .bind(user.updated_at)
        .bind(user.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self) -> Result<Vec<User>> {
        let query = format!("{SELECT_USER} ORDER BY created_at");

        Ok(sqlx::query_as::<_, User>(&query)
            .fetch_all(&self.pool)
            .await?)
    }
}

const SELECT_USER: &str = r#"SELECT
                id,
                username,
                email,
                password,
                is_verified,
                otp,
                otp_expires,
                role,
                location,
                description,
                profile_picture,
                cover_image,
                countries_visited,
                created_at,
                updated_at
            FROM users"#;

#[derive(Debug, Clone, Copy)]
enum Field {
    Email,
    Username,
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Field::Email => write!(f, "email"),
            Field::Username => write!(f, "username"),
        }
    }
}

fn get_by_field_query(field: Field) -> String {
    format!("{SELECT_USER} WHERE {field} = $1")
}
