use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use crate::database::Database;
use crate::error::{Result, ServerError};
use crate::journal::{Journal, JournalChanges, RECENT_LIMIT, parse_tags};
use crate::ownership::{Action, authorize_owner};
use crate::router::{Message, Valid, parse_id};
use crate::token::Claims;

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct Body {
    #[validate(length(min = 1, message = "Title, date, location and journal entry are required."))]
    pub title: String,
    #[validate(required(message = "Title, date, location and journal entry are required."))]
    pub date: Option<NaiveDate>,
    #[validate(length(min = 1, message = "Title, date, location and journal entry are required."))]
    pub location: String,
    #[validate(length(min = 1, message = "Title, date, location and journal entry are required."))]
    pub journal_entry: String,
    pub photos: Vec<String>,
    pub tags: Vec<String>,
}

/// Handler to create a journal owned by the caller.
pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Valid(body): Valid<Body>,
) -> Result<(StatusCode, Json<Journal>)> {
    let now = state.clock.now();
    let journal = Journal {
        id: Uuid::new_v4(),
        title: body.title,
        date: body.date.unwrap_or_default(),
        location: body.location,
        journal_entry: body.journal_entry,
        photos: body.photos,
        tags: body.tags,
        user_id: claims.id,
        created_at: now,
        updated_at: now,
    };

    state.db.journals.create(&journal).await?;

    tracing::info!(journal_id = %journal.id, user_id = %claims.id, "journal created");

    Ok((StatusCode::CREATED, Json(journal)))
}

/// Handler to update a journal. Only its owner may.
pub async fn update(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    changes: std::result::Result<Json<JournalChanges>, JsonRejection>,
) -> Result<Json<Journal>> {
    let id = parse_id(&id, "Journal")?;
    let Json(changes) = changes?;
    let mut journal = authorize_owner(claims.id, Action::Update, || {
        state.db.journals.find_by_id(id)
    })
    .await?;

    journal.apply(changes, state.clock.now());
    state.db.journals.update(&journal).await?;

    Ok(Json(journal))
}

/// Handler to delete a journal. Only its owner may.
pub async fn delete(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<Message>> {
    let id = parse_id(&id, "Journal")?;
    let journal = authorize_owner(claims.id, Action::Delete, || {
        state.db.journals.find_by_id(id)
    })
    .await?;

    state.db.journals.delete(journal.id).await?;

    tracing::info!(journal_id = %journal.id, user_id = %claims.id, "journal deleted");

    Ok(Message::new("Journal deleted successfully."))
}

pub async fn list(State(db): State<Database>) -> Result<Json<Vec<Journal>>> {
    Ok(Json(db.journals.list().await?))
}

/// Journals of the caller.
pub async fn list_mine(
    State(db): State<Database>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Journal>>> {
    Ok(Json(db.journals.list_by_user(claims.id).await?))
}

pub async fn recent(State(db): State<Database>) -> Result<Json<Vec<Journal>>> {
    Ok(Json(db.journals.recent(RECENT_LIMIT).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct TagsQuery {
    pub tags: Option<String>,
}

/// Journals sharing at least one tag with `?tags=a,b`.
pub async fn search_tags(
    State(db): State<Database>,
    Query(query): Query<TagsQuery>,
) -> Result<Json<Vec<Journal>>> {
    let tags = query.tags.as_deref().map(parse_tags).unwrap_or_default();
    if tags.is_empty() {
        return Err(ServerError::BadRequest(
            "Tags query parameter required.".into(),
        ));
    }

    Ok(Json(db.journals.search_tags(&tags).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct TitleQuery {
    pub title: Option<String>,
}

/// Journals whose title contains `?title=`, ignoring case.
pub async fn search_title(
    State(db): State<Database>,
    Query(query): Query<TitleQuery>,
) -> Result<Json<Vec<Journal>>> {
    let title = query
        .title
        .as_deref()
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .ok_or_else(|| {
            ServerError::BadRequest("Title query parameter required.".into())
        })?;

    Ok(Json(db.journals.search_title(title).await?))
}
