use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use crate::database::Database;
use crate::error::{Result, ServerError};
use crate::mail::postcard_email;
use crate::ownership::{Action, authorize_owner};
use crate::postcard::{FontStyle, Postcard, PostcardView, Stamp};
use crate::router::{Message, Valid, parse_id};
use crate::token::Claims;

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct Body {
    #[validate(length(min = 1, message = "All fields are required."))]
    pub message: String,
    #[validate(length(min = 1, message = "All fields are required."))]
    pub location: String,
    #[validate(length(min = 1, message = "All fields are required."))]
    pub background_image: String,
    #[validate(required(message = "All fields are required."))]
    pub font_style: Option<FontStyle>,
    #[validate(required(message = "All fields are required."))]
    pub stamp: Option<Stamp>,
    /// Username of the recipient.
    #[validate(length(min = 1, message = "All fields are required."))]
    pub recipient: String,
}

/// Handler to send a postcard to another user.
///
/// The recipient is notified by email once the postcard is saved.
pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Valid(body): Valid<Body>,
) -> Result<(StatusCode, Json<Postcard>)> {
    let recipient = state
        .db
        .users
        .find_by_username(&body.recipient)
        .await?
        .ok_or(ServerError::NotFound("Recipient"))?;

    let now = state.clock.now();
    let postcard = Postcard {
        id: Uuid::new_v4(),
        message: body.message,
        location: body.location,
        background_image: body.background_image,
        font_style: body.font_style.unwrap_or_default(),
        stamp: body.stamp.unwrap_or_default(),
        sender_id: claims.id,
        recipient_id: recipient.id,
        created_at: now,
        updated_at: now,
    };

    state.db.postcards.create(&postcard).await?;

    tracing::info!(
        postcard_id = %postcard.id,
        sender_id = %claims.id,
        recipient_id = %recipient.id,
        "postcard sent"
    );

    let (subject, html) = postcard_email(&postcard, &state.config.url);
    state.mail.send(&recipient.email, subject, &html).await?;

    Ok((StatusCode::CREATED, Json(postcard)))
}

/// Handler to delete a postcard. Only its sender may.
pub async fn delete(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<Message>> {
    let id = parse_id(&id, "Postcard")?;
    let postcard = authorize_owner(claims.id, Action::Delete, || {
        state.db.postcards.find_by_id(id)
    })
    .await?;

    state.db.postcards.delete(postcard.id).await?;

    Ok(Message::new("Postcard deleted successfully."))
}

/// Postcards sent by the caller, with their recipient.
pub async fn sent(
    State(db): State<Database>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<PostcardView>>> {
    Ok(Json(db.postcards.list_sent(claims.id).await?))
}

/// Postcards received by the caller, with their sender.
pub async fn received(
    State(db): State<Database>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<PostcardView>>> {
    Ok(Json(db.postcards.list_received(claims.id).await?))
}
