//! HTTP API.

pub mod journals;
pub mod login;
pub mod lores;
pub mod postcards;
pub mod signup;
pub mod status;
pub mod user;
pub mod users;
pub mod verify_otp;

use axum::extract::{FromRequest, Request};
use axum::routing::{delete, get, patch, post, put};
use axum::{Json, Router, middleware};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use crate::error::ServerError;

/// Body made of a single `message` field.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

/// JSON body checked with [`Validate`] before reaching the handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct Valid<T>(pub T);

impl<T, S> FromRequest<S> for Valid<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(Valid(value))
    }
}

/// Parse a resource id from a path segment.
///
/// Anything that is not a UUID cannot exist, so it reads as missing.
pub fn parse_id(raw: &str, kind: &'static str) -> Result<Uuid, ServerError> {
    Uuid::parse_str(raw).map_err(|_| ServerError::NotFound(kind))
}

/// Routes open to everyone.
fn public() -> Router<AppState> {
    Router::new()
        // `GET /status.json` goes to `status`.
        .route("/status.json", get(status::handler))
        .route("/signup", post(signup::handler))
        .route("/verify-otp", post(verify_otp::handler))
        .route("/login", post(login::handler))
        .route("/users", get(users::handler))
        .route("/journals", get(journals::list))
        .route("/journals/recent", get(journals::recent))
        .route("/journals/search/tags", get(journals::search_tags))
        .route("/journals/search/title", get(journals::search_title))
        .route("/lores", get(lores::list))
        .route("/lores/type/{kind}", get(lores::list_by_type))
        .route("/lores/search/{term}", get(lores::search))
        .route("/lores/{id}", get(lores::get))
}

/// Routes requiring a valid bearer token.
fn protected(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/user", get(user::get).patch(user::update))
        .route("/user/role", patch(user::role))
        .route("/user/destinations", get(user::destinations))
        .route("/user/destinations/recent", get(user::recent_destinations))
        .route("/journals", post(journals::create))
        .route("/journals/user", get(journals::list_mine))
        .route(
            "/journals/{id}",
            put(journals::update).delete(journals::delete),
        )
        .route("/postcards", post(postcards::create))
        .route("/postcards/sent", get(postcards::sent))
        .route("/postcards/received", get(postcards::received))
        .route("/postcards/{id}", delete(postcards::delete))
        .route("/lores", post(lores::create))
        .route("/lores/{id}", put(lores::update).delete(lores::delete))
        .route_layer(middleware::from_fn_with_state(
            state,
            crate::middleware::authenticate,
        ))
}

/// Every route of the API.
pub fn router(state: AppState) -> Router<AppState> {
    public().merge(protected(state))
}
