use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::Result;
use crate::router::{Message, Valid};
use crate::user::UserService;

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Body {
    #[validate(length(min = 1, message = "Email and OTP are required."))]
    pub email: String,
    #[validate(length(min = 1, message = "Email and OTP are required."))]
    pub otp: String,
}

/// Handler to verify a user with its one-time code.
pub async fn handler(
    State(service): State<UserService>,
    Valid(body): Valid<Body>,
) -> Result<Json<Message>> {
    service.verify_otp(&body.email, &body.otp).await?;

    Ok(Message::new("User verified successfully."))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use chrono::Duration;
    use serde_json::json;

    use crate::router::tests::{json, state, state_with};
    use crate::*;

    async fn signup(state: &AppState) {
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
        assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    }

    async fn stored_code(state: &AppState) -> String {
        state
            .db
            .users
            .find_by_email("a@b.com")
            .await
            .unwrap()
            .and_then(|u| u.otp)
            .unwrap()
    }

    async fn verify(state: &AppState, email: &str, otp: &str) -> (StatusCode, serde_json::Value) {
        let body = json!({ "email": email, "otp": otp });
        let response = make_request(
            None,
            app(state.clone()),
            Method::POST,
            "/verify-otp",
            body.to_string(),
        )
        .await;
        (response.status(), json(response).await)
    }

    #[tokio::test]
    async fn test_verify_otp_handler() {
        let (state, _) = state();
        signup(&state).await;
        let code = stored_code(&state).await;

        let (status, body) = verify(&state, "a@b.com", &code).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "User verified successfully.");

        let user = state.db.users.find_by_email("a@b.com").await.unwrap().unwrap();
        assert!(user.is_verified);
        assert_eq!(user.otp, None);
        assert_eq!(user.otp_expires, None);

        let (status, body) = verify(&state, "a@b.com", &code).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "User is already verified.");
    }

    #[tokio::test]
    async fn test_verify_otp_errors() {
        let (state, _) = state();
        signup(&state).await;
        let code = stored_code(&state).await;
        let wrong = if code == "999999" { "000000" } else { "999999" };

        let (status, body) = verify(&state, "a@b.com", wrong).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid OTP.");

        let (status, body) = verify(&state, "nobody@b.com", &code).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "User not found.");

        let (status, body) = verify(&state, "", "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Email and OTP are required.");

        // A failed attempt leaves the code usable.
        let (status, _) = verify(&state, "a@b.com", &code).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_verify_otp_expiry_boundary() {
        let mailer = std::sync::Arc::new(crate::mail::tests::RecordingMailer::default());
        let (state, clock) = state_with(mailer);
        signup(&state).await;
        let code = stored_code(&state).await;

        clock.advance(Duration::minutes(10) + Duration::seconds(1));
        let (status, body) = verify(&state, "a@b.com", &code).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "OTP has expired.");
    }
}
