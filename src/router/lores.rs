use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use crate::database::Database;
use crate::error::{Result, ServerError};
use crate::lore::{Lore, LoreType, LoreView};
use crate::ownership::{Action, authorize_owner};
use crate::router::{Message, Valid, parse_id};
use crate::token::Claims;

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Body {
    #[validate(length(
        min = 1,
        message = "Title, location, type, content, and image are required."
    ))]
    pub title: String,
    #[validate(length(
        min = 1,
        message = "Title, location, type, content, and image are required."
    ))]
    pub location: String,
    #[serde(rename = "type")]
    #[validate(length(
        min = 1,
        message = "Title, location, type, content, and image are required."
    ))]
    pub kind: String,
    #[validate(length(
        min = 1,
        message = "Title, location, type, content, and image are required."
    ))]
    pub content: String,
    #[validate(length(
        min = 1,
        message = "Title, location, type, content, and image are required."
    ))]
    pub image: String,
}

/// On update, an empty or absent `image` keeps the current one.
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct UpdateBody {
    #[validate(length(
        min = 1,
        message = "Title, location, type, and content are required."
    ))]
    pub title: String,
    #[validate(length(
        min = 1,
        message = "Title, location, type, and content are required."
    ))]
    pub location: String,
    #[serde(rename = "type")]
    #[validate(length(
        min = 1,
        message = "Title, location, type, and content are required."
    ))]
    pub kind: String,
    #[validate(length(
        min = 1,
        message = "Title, location, type, and content are required."
    ))]
    pub content: String,
    pub image: Option<String>,
}

fn lore_type(raw: &str) -> Result<LoreType> {
    raw.parse().map_err(|_| {
        ServerError::BadRequest(
            "Type must be one of: Historical, Cultural, Folklore".into(),
        )
    })
}

/// Load a lore with its creator, as just written.
async fn view(db: &Database, id: Uuid) -> Result<LoreView> {
    db.lores
        .find_view(id)
        .await?
        .ok_or(ServerError::NotFound("Lore"))
}

/// Handler to publish a lore.
pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Valid(body): Valid<Body>,
) -> Result<(StatusCode, Json<LoreView>)> {
    let kind = lore_type(&body.kind)?;

    let now = state.clock.now();
    let lore = Lore {
        id: Uuid::new_v4(),
        title: body.title,
        location: body.location,
        kind,
        content: body.content,
        image: body.image,
        user_id: claims.id,
        created_at: now,
        updated_at: now,
    };

    state.db.lores.create(&lore).await?;

    tracing::info!(lore_id = %lore.id, user_id = %claims.id, "lore created");

    Ok((StatusCode::CREATED, Json(view(&state.db, lore.id).await?)))
}

/// Every lore, newest first.
pub async fn list(State(db): State<Database>) -> Result<Json<Vec<LoreView>>> {
    Ok(Json(db.lores.list(None).await?))
}

pub async fn list_by_type(
    State(db): State<Database>,
    Path(kind): Path<String>,
) -> Result<Json<Vec<LoreView>>> {
    let kind = kind.parse::<LoreType>().map_err(|_| {
        ServerError::BadRequest(
            "Invalid type. Must be one of: Historical, Cultural, Folklore"
                .into(),
        )
    })?;

    Ok(Json(db.lores.list(Some(kind)).await?))
}

pub async fn get(
    State(db): State<Database>,
    Path(id): Path<String>,
) -> Result<Json<LoreView>> {
    let id = parse_id(&id, "Lore")?;
    Ok(Json(view(&db, id).await?))
}

/// Lores whose title, location or content contains `term`.
pub async fn search(
    State(db): State<Database>,
    Path(term): Path<String>,
) -> Result<Json<Vec<LoreView>>> {
    Ok(Json(db.lores.search(&term).await?))
}

/// Handler to update a lore. Only its creator may.
pub async fn update(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Valid(body): Valid<UpdateBody>,
) -> Result<Json<LoreView>> {
    let id = parse_id(&id, "Lore")?;
    let mut lore = authorize_owner(claims.id, Action::Update, || {
        state.db.lores.find_by_id(id)
    })
    .await?;

    lore.kind = lore_type(&body.kind)?;
    lore.title = body.title;
    lore.location = body.location;
    lore.content = body.content;
    if let Some(image) = body.image.filter(|image| !image.is_empty()) {
        lore.image = image;
    }
    lore.updated_at = state.clock.now();

    state.db.lores.update(&lore).await?;

    Ok(Json(view(&state.db, lore.id).await?))
}

/// Handler to delete a lore. Only its creator may.
pub async fn delete(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<Message>> {
    let id = parse_id(&id, "Lore")?;
    let lore = authorize_owner(claims.id, Action::Delete, || {
        state.db.lores.find_by_id(id)
    })
    .await?;

    state.db.lores.delete(lore.id).await?;

    tracing::info!(lore_id = %lore.id, user_id = %claims.id, "lore deleted");

    Ok(Message::new("Lore deleted successfully."))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use chrono::Duration;
    use serde_json::{Value, json};

    use super::*;
    use crate::mail::tests::RecordingMailer;
    use crate::router::tests::{json, login_as, state, state_with};
    use crate::*;

    fn lore_body(title: &str, kind: &str, content: &str) -> Value {
        json!({
            "title": title,
            "location": "Brittany",
            "type": kind,
            "content": content,
            "image": "https://cdn.wanderlog.app/lore.jpg",
        })
    }

    async fn publish(state: &AppState, token: &str, body: Value) -> (StatusCode, Value) {
        let response = make_request(
            Some(token),
            app(state.clone()),
            Method::POST,
            "/lores",
            body.to_string(),
        )
        .await;
        (response.status(), json(response).await)
    }

    async fn get(state: &AppState, path: &str) -> (StatusCode, Value) {
        let response =
            make_request(None, app(state.clone()), Method::GET, path, String::default())
                .await;
        (response.status(), json(response).await)
    }

    fn titles(body: &Value) -> Vec<&str> {
        body.as_array()
            .unwrap()
            .iter()
            .map(|l| l["title"].as_str().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_create_lore() {
        let (state, _) = state();
        let (alice, token) = login_as(&state, "alice").await;

        let (status, body) =
            publish(&state, &token, lore_body("Ys", "Folklore", "A drowned city.")).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["type"], "Folklore");
        assert_eq!(body["userId"], alice.id.to_string());
        assert_eq!(body["creator"]["username"], "alice");

        let (status, body) =
            publish(&state, &token, lore_body("Ys", "Myth", "A drowned city.")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["message"],
            "Type must be one of: Historical, Cultural, Folklore"
        );

        let (status, body) =
            publish(&state, &token, json!({ "title": "Ys", "type": "Folklore" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["message"],
            "Title, location, type, content, and image are required."
        );
    }

    #[tokio::test]
    async fn test_read_lores() {
        let mailer = std::sync::Arc::new(RecordingMailer::default());
        let (state, clock) = state_with(mailer);
        let (_, token) = login_as(&state, "alice").await;

        let (_, ys) =
            publish(&state, &token, lore_body("Ys", "Folklore", "A drowned city.")).await;
        clock.advance(Duration::seconds(1));
        publish(&state, &token, lore_body("Carnac", "Historical", "Standing stones.")).await;
        clock.advance(Duration::seconds(1));
        publish(&state, &token, lore_body("Fest-noz", "Cultural", "Night dances by the SEA."))
            .await;

        let (status, body) = get(&state, "/lores").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(titles(&body), ["Fest-noz", "Carnac", "Ys"]);

        let (_, body) = get(&state, "/lores/type/Folklore").await;
        assert_eq!(titles(&body), ["Ys"]);

        let (status, body) = get(&state, "/lores/type/Myth").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["message"],
            "Invalid type. Must be one of: Historical, Cultural, Folklore"
        );

        let (_, body) = get(&state, "/lores/search/sea").await;
        assert_eq!(titles(&body), ["Fest-noz"]);

        let (_, body) = get(&state, "/lores/search/brittany").await;
        assert_eq!(body.as_array().unwrap().len(), 3);

        let path = format!("/lores/{}", ys["id"].as_str().unwrap());
        let (status, body) = get(&state, &path).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["creator"]["username"], "alice");

        let (status, body) = get(&state, &format!("/lores/{}", Uuid::new_v4())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Lore not found.");
    }

    #[tokio::test]
    async fn test_only_creator_mutates_lore() {
        let (state, _) = state();
        let (_, alice) = login_as(&state, "alice").await;
        let (_, bob) = login_as(&state, "bob").await;

        let (_, ys) =
            publish(&state, &alice, lore_body("Ys", "Folklore", "A drowned city.")).await;
        let path = format!("/lores/{}", ys["id"].as_str().unwrap());

        let mut changes = lore_body("Ys, again", "Historical", "Rebuilt.");
        changes.as_object_mut().unwrap().remove("image");

        let response = make_request(
            Some(&bob),
            app(state.clone()),
            Method::PUT,
            &path,
            changes.to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            json(response).await["message"],
            "You are not allowed to update this lore."
        );

        let response = make_request(
            Some(&alice),
            app(state.clone()),
            Method::PUT,
            &path,
            changes.to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body["title"], "Ys, again");
        assert_eq!(body["type"], "Historical");
        assert_eq!(body["image"], "https://cdn.wanderlog.app/lore.jpg");

        let response = make_request(
            Some(&alice),
            app(state.clone()),
            Method::PUT,
            &path,
            json!({ "title": "Ys" }).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json(response).await["message"],
            "Title, location, type, and content are required."
        );

        let response = make_request(
            Some(&bob),
            app(state.clone()),
            Method::DELETE,
            &path,
            String::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = make_request(
            Some(&alice),
            app(state.clone()),
            Method::DELETE,
            &path,
            String::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["message"], "Lore deleted successfully.");

        let (status, _) = get(&state, &path).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
