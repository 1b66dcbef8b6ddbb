//! In-memory repositories.
//!
//! Used when no PostgreSQL instance is configured and by tests. Uniqueness
//! and foreign keys are enforced like the SQL schema does.

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{Result, ServerError};
use crate::journal::{Journal, JournalRepository};
use crate::lore::{Creator, Lore, LoreRepository, LoreType, LoreView};
use crate::postcard::{Postcard, PostcardRepository, PostcardView};
use crate::user::{User, UserRepository};

const DUPLICATE_USER: &str = "User with this email or username already exists.";

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    journals: Vec<Journal>,
    postcards: Vec<Postcard>,
    lores: Vec<Lore>,
}

impl Tables {
    fn user(&self, id: Uuid) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    fn require_user(&self, id: Uuid) -> Result<&User> {
        self.user(id)
            .ok_or_else(|| ServerError::internal(format!("unknown user {id}")))
    }

    fn lore_view(&self, lore: &Lore) -> LoreView {
        LoreView {
            lore: lore.clone(),
            creator: Creator {
                username: self
                    .user(lore.user_id)
                    .map(|u| u.username.clone())
                    .unwrap_or_default(),
            },
        }
    }

    /// Lores matching `filter`, newest first.
    fn lore_views(&self, filter: impl Fn(&Lore) -> bool) -> Vec<LoreView> {
        let mut lores: Vec<&Lore> =
            self.lores.iter().filter(|l| filter(*l)).collect();
        lores.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        lores.into_iter().map(|l| self.lore_view(l)).collect()
    }
}

/// A verified account never keeps a code.
fn check_verification(user: &User) -> Result<()> {
    if user.is_verified && (user.otp.is_some() || user.otp_expires.is_some()) {
        return Err(ServerError::internal(format!(
            "verified user {} still holds an OTP",
            user.id
        )));
    }
    Ok(())
}

/// Every table behind a single lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, user: &User) -> Result<()> {
        check_verification(user)?;
        let mut tables = self.tables.write().await;

        if tables
            .users
            .iter()
            .any(|u| u.email == user.email || u.username == user.username)
        {
            return Err(ServerError::Conflict(DUPLICATE_USER.into()));
        }

        tables.users.push(user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.tables.read().await.user(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.email == identifier || u.username == identifier)
            .cloned())
    }

    async fn exists(&self, email: &str, username: &str) -> Result<bool> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .any(|u| u.email == email || u.username == username))
    }

    async fn update(&self, user: &User) -> Result<()> {
        check_verification(user)?;
        let mut tables = self.tables.write().await;

        if tables.users.iter().any(|u| {
            u.id != user.id
                && (u.email == user.email || u.username == user.username)
        }) {
            return Err(ServerError::Conflict(DUPLICATE_USER.into()));
        }

        if let Some(stored) = tables.users.iter_mut().find(|u| u.id == user.id)
        {
            *stored = user.clone();
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<User>> {
        Ok(self.tables.read().await.users.clone())
    }
}

#[async_trait]
impl JournalRepository for MemoryStore {
    async fn create(&self, journal: &Journal) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.require_user(journal.user_id)?;
        tables.journals.push(journal.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Journal>> {
        let tables = self.tables.read().await;
        Ok(tables.journals.iter().find(|j| j.id == id).cloned())
    }

    async fn update(&self, journal: &Journal) -> Result<()> {
        let mut tables = self.tables.write().await;
        if let Some(stored) =
            tables.journals.iter_mut().find(|j| j.id == journal.id)
        {
            *stored = journal.clone();
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.tables.write().await.journals.retain(|j| j.id != id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Journal>> {
        Ok(self.tables.read().await.journals.clone())
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Journal>> {
        let tables = self.tables.read().await;
        Ok(tables
            .journals
            .iter()
            .filter(|j| j.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn recent(&self, limit: i64) -> Result<Vec<Journal>> {
        let mut journals = self.tables.read().await.journals.clone();
        journals.sort_by(|a, b| {
            b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at))
        });
        journals.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(journals)
    }

    async fn search_tags(&self, tags: &[String]) -> Result<Vec<Journal>> {
        let tables = self.tables.read().await;
        Ok(tables
            .journals
            .iter()
            .filter(|j| j.has_any_tag(tags))
            .cloned()
            .collect())
    }

    async fn search_title(&self, title: &str) -> Result<Vec<Journal>> {
        let needle = title.to_lowercase();
        let tables = self.tables.read().await;
        Ok(tables
            .journals
            .iter()
            .filter(|j| j.title.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn count_by_user(&self, user_id: Uuid) -> Result<i64> {
        let tables = self.tables.read().await;
        Ok(tables.journals.iter().filter(|j| j.user_id == user_id).count() as i64)
    }
}

#[async_trait]
impl PostcardRepository for MemoryStore {
    async fn create(&self, postcard: &Postcard) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.require_user(postcard.sender_id)?;
        tables.require_user(postcard.recipient_id)?;
        tables.postcards.push(postcard.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Postcard>> {
        let tables = self.tables.read().await;
        Ok(tables.postcards.iter().find(|p| p.id == id).cloned())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.tables.write().await.postcards.retain(|p| p.id != id);
        Ok(())
    }

    async fn list_sent(&self, sender_id: Uuid) -> Result<Vec<PostcardView>> {
        let tables = self.tables.read().await;
        Ok(tables
            .postcards
            .iter()
            .filter(|p| p.sender_id == sender_id)
            .map(|p| PostcardView {
                postcard: p.clone(),
                recipient: tables.user(p.recipient_id).map(User::summary),
                sender: None,
            })
            .collect())
    }

    async fn list_received(
        &self,
        recipient_id: Uuid,
    ) -> Result<Vec<PostcardView>> {
        let tables = self.tables.read().await;
        Ok(tables
            .postcards
            .iter()
            .filter(|p| p.recipient_id == recipient_id)
            .map(|p| PostcardView {
                postcard: p.clone(),
                recipient: None,
                sender: tables.user(p.sender_id).map(User::summary),
            })
            .collect())
    }

    async fn count_sent(&self, sender_id: Uuid) -> Result<i64> {
        let tables = self.tables.read().await;
        Ok(tables
            .postcards
            .iter()
            .filter(|p| p.sender_id == sender_id)
            .count() as i64)
    }
}

#[async_trait]
impl LoreRepository for MemoryStore {
    async fn create(&self, lore: &Lore) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.require_user(lore.user_id)?;
        tables.lores.push(lore.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Lore>> {
        let tables = self.tables.read().await;
        Ok(tables.lores.iter().find(|l| l.id == id).cloned())
    }

    async fn find_view(&self, id: Uuid) -> Result<Option<LoreView>> {
        let tables = self.tables.read().await;
        Ok(tables
            .lores
            .iter()
            .find(|l| l.id == id)
            .map(|l| tables.lore_view(l)))
    }

    async fn update(&self, lore: &Lore) -> Result<()> {
        let mut tables = self.tables.write().await;
        if let Some(stored) = tables.lores.iter_mut().find(|l| l.id == lore.id)
        {
            *stored = lore.clone();
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.tables.write().await.lores.retain(|l| l.id != id);
        Ok(())
    }

    async fn list(&self, kind: Option<LoreType>) -> Result<Vec<LoreView>> {
        let tables = self.tables.read().await;
        Ok(tables.lore_views(|l| kind.is_none_or(|kind| l.kind == kind)))
    }

    async fn search(&self, term: &str) -> Result<Vec<LoreView>> {
        let tables = self.tables.read().await;
        Ok(tables.lore_views(|l| l.matches(term)))
    }
}
