use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{REQUIRED, Result};
use crate::router::{Message, Valid};
use crate::user::{Role, UserBuilder, UserService};

#[derive(Debug, Default, Serialize, Deserialize, Validate, Zeroize, ZeroizeOnDrop)]
#[validate(schema(function = "required_fields", skip_on_field_errors = false))]
pub struct Body {
    #[serde(default)]
    #[validate(email(message = "Email must be formatted."))]
    pub email: String,
    #[serde(default)]
    #[validate(length(
        min = 3,
        max = 30,
        message = "Username must be between 3 and 30 characters."
    ))]
    pub username: String,
    #[serde(default)]
    #[validate(length(max = 255, message = "Password is too long."))]
    pub password: String,
    #[serde(default)]
    #[zeroize(skip)]
    pub role: Option<Role>,
}

/// Every field but `role` must be present before format is checked.
fn required_fields(body: &Body) -> std::result::Result<(), ValidationError> {
    if body.email.is_empty() || body.username.is_empty() || body.password.is_empty()
    {
        return Err(ValidationError::new(REQUIRED)
            .with_message("Email, username, and password are required.".into()));
    }
    Ok(())
}

/// Handler to create user.
pub async fn handler(
    State(service): State<UserService>,
    Valid(body): Valid<Body>,
) -> Result<(StatusCode, Json<Message>)> {
    let builder = UserBuilder::new()
        .email(&body.email)
        .username(&body.username)
        .password(&body.password)
        .role(body.role);

    service.signup(builder).await?;

    Ok((
        StatusCode::CREATED,
        Message::new("User registered. OTP sent to email."),
    ))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::mail::tests::RecordingMailer;
    use crate::router::tests::{json, state, state_with};
    use crate::*;

    #[tokio::test]
    async fn test_signup_handler() {
        let (state, mailer) = state();
        let app = app(state.clone());

        let body = json!({
            "email": "a@b.com",
            "username": "alice",
            "password": "secret123",
        });
        let response =
            make_request(None, app, Method::POST, "/signup", body.to_string())
                .await;

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            json(response).await["message"],
            "User registered. OTP sent to email."
        );
        assert_eq!(mailer.count(), 1);

        let user = state.db.users.find_by_email("a@b.com").await.unwrap().unwrap();
        assert!(!user.is_verified);
        assert_eq!(user.role, user::Role::Regulars);
    }

    #[tokio::test]
    async fn test_signup_duplicate() {
        let (state, _) = state();
        let body = json!({
            "email": "a@b.com",
            "username": "alice",
            "password": "secret123",
            "role": "NATIVES",
        })
        .to_string();

        let response =
            make_request(None, app(state.clone()), Method::POST, "/signup", body.clone())
                .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let response =
            make_request(None, app(state), Method::POST, "/signup", body).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(
            json(response).await["message"],
            "User with this email or username already exists."
        );
    }

    #[tokio::test]
    async fn test_signup_invalid_body() {
        let (state, mailer) = state();

        let body = json!({ "email": "not-an-email", "username": "alice", "password": "secret123" });
        let response = make_request(
            None,
            app(state.clone()),
            Method::POST,
            "/signup",
            body.to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(response).await["message"], "Email must be formatted.");

        let body = json!({ "email": "a@b.com", "username": "al", "password": "secret123" });
        let response = make_request(
            None,
            app(state.clone()),
            Method::POST,
            "/signup",
            body.to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = json!({ "email": "a@b.com", "username": "alice" });
        let response = make_request(
            None,
            app(state.clone()),
            Method::POST,
            "/signup",
            body.to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json(response).await["message"],
            "Email, username, and password are required."
        );

        // A missing field wins over the format of the others.
        for body in [
            json!({ "username": "alice", "password": "secret123" }),
            json!({ "email": "", "username": "al", "password": "secret123" }),
            json!({ "email": "not-an-email", "password": "secret123" }),
        ] {
            let response = make_request(
                None,
                app(state.clone()),
                Method::POST,
                "/signup",
                body.to_string(),
            )
            .await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(
                json(response).await["message"],
                "Email, username, and password are required."
            );
        }

        assert_eq!(mailer.count(), 0);
    }

    #[tokio::test]
    async fn test_signup_mail_failure() {
        let (state, _) = state_with(Arc::new(RecordingMailer::failing()));

        let body = json!({
            "email": "a@b.com",
            "username": "alice",
            "password": "secret123",
        });
        let response = make_request(
            None,
            app(state.clone()),
            Method::POST,
            "/signup",
            body.to_string(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json(response).await["message"], "Internal server error.");
        assert!(state.db.users.find_by_email("a@b.com").await.unwrap().is_some());
    }
}
