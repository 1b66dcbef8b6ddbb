//! database (db) union structure.

pub mod memory;

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::AppState;
use crate::config::Postgres;
use crate::journal::{JournalRepository, PgJournalRepository};
use crate::lore::{LoreRepository, PgLoreRepository};
use crate::postcard::{PgPostcardRepository, PostcardRepository};
use crate::user::{PgUserRepository, UserRepository};

pub const DEFAULT_CREDENTIALS: &str = "postgres";
pub const DEFAULT_DATABASE_NAME: &str = "wanderlog";
pub const DEFAULT_POOL_SIZE: u32 = 10;

/// Custom db structure to pass to Axum.
#[derive(Clone)]
pub struct Database {
    pub users: Arc<dyn UserRepository>,
    pub journals: Arc<dyn JournalRepository>,
    pub postcards: Arc<dyn PostcardRepository>,
    pub lores: Arc<dyn LoreRepository>,
}

impl Database {
    /// Init database connections and run pending migrations.
    pub async fn new(
        config: &Postgres,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let username = config.username.as_deref().unwrap_or(DEFAULT_CREDENTIALS);
        let password = config.password.as_deref().unwrap_or(DEFAULT_CREDENTIALS);
        let db = config.database.as_deref().unwrap_or(DEFAULT_DATABASE_NAME);
        let hostname = &config.address;

        let addr = format!("postgres://{username}:{password}@{hostname}/{db}");
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size.unwrap_or(DEFAULT_POOL_SIZE));
        let postgres = pool.connect(&addr).await?;

        tracing::info!(%hostname, %db, "postgres connected");

        // execute migrations scripts on start.
        sqlx::migrate!().run(&postgres).await?;

        Ok(Self::postgres(postgres))
    }

    /// Repositories backed by PostgreSQL.
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            journals: Arc::new(PgJournalRepository::new(pool.clone())),
            postcards: Arc::new(PgPostcardRepository::new(pool.clone())),
            lores: Arc::new(PgLoreRepository::new(pool)),
        }
    }

    /// Repositories kept in process memory. Lost on restart.
    pub fn memory() -> Self {
        let store = Arc::new(memory::MemoryStore::default());

        Self {
            users: store.clone(),
            journals: store.clone(),
            postcards: store.clone(),
            lores: store,
        }
    }
}

impl FromRef<AppState> for Database {
    fn from_ref(app_state: &AppState) -> Database {
        app_state.db.clone()
    }
}

/// Build an `ILIKE` pattern matching `term` anywhere, with `\` as escape.
pub fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern() {
        assert_eq!(like_pattern("paris"), "%paris%");
        assert_eq!(like_pattern("100%_off"), "%100\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
        assert_eq!(like_pattern(""), "%%");
    }
}
