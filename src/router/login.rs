use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use validator::Validate;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::Result;
use crate::router::Valid;
use crate::user::UserService;

#[derive(Debug, Default, Serialize, Deserialize, Validate, Zeroize, ZeroizeOnDrop)]
pub struct Body {
    /// Email or username.
    #[serde(default)]
    #[validate(length(min = 1, message = "Identifier and password are required."))]
    pub identifier: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Identifier and password are required."))]
    pub password: String,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub message: String,
    pub token: String,
}

/// Handler to log a user in.
pub async fn handler(
    State(service): State<UserService>,
    Valid(body): Valid<Body>,
) -> Result<Json<Response>> {
    let token = service.login(&body.identifier, &body.password).await?;

    Ok(Json(Response {
        message: "Logged in successfully.".into(),
        token,
    }))
}
