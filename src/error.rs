//! Error handler for wanderlog.

use axum::extract::rejection::JsonRejection;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use sqlx::Error as SQLxError;
use thiserror::Error;
use validator::ValidationErrors;

use crate::crypto::CryptoError;
use crate::mail::MailError;
use crate::otp::OtpError;
use crate::token::TokenError;

pub type Result<T> = std::result::Result<T, ServerError>;

/// Validation code of presence checks. Their message takes precedence.
pub const REQUIRED: &str = "required";

/// PostgreSQL `unique_violation` SQLSTATE.
const UNIQUE_VIOLATION: &str = "23505";

/// Enum representing server-side errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("validation error occurred")]
    Validation(#[from] ValidationErrors),

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Axum(#[from] JsonRejection),

    #[error("{0}")]
    Conflict(String),

    #[error("Invalid identifier or password.")]
    InvalidCredentials,

    #[error("Please verify your OTP before logging in.")]
    NotVerified,

    #[error("{0} not found.")]
    NotFound(&'static str),

    #[error("You are not allowed to {action} this {kind}.")]
    Forbidden {
        action: &'static str,
        kind: String,
    },

    #[error(transparent)]
    Otp(#[from] OtpError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Mail(#[from] MailError),

    #[error("SQL request failed: {0}")]
    Sql(#[from] SQLxError),

    #[error("internal server error, {details}")]
    Internal {
        details: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ServerError {
    /// Create an internal error without source.
    pub fn internal(details: impl Into<String>) -> Self {
        Self::Internal {
            details: details.into(),
            source: None,
        }
    }
}

/// Structure for error responses.
#[derive(Debug, Serialize)]
pub struct ResponseError {
    #[serde(skip)]
    status: u16,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<FieldError>>,
}

impl ResponseError {
    /// Update error status code.
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code.as_u16();
        self
    }

    /// Update `message` field.
    pub fn message(mut self, message: &str) -> Self {
        self.message = message.into();
        self
    }

    /// Automatically add errors field.
    ///
    /// The first presence failure, or else the first field message, becomes
    /// the top-level message.
    pub fn errors(mut self, errors: &ValidationErrors) -> Self {
        let errors = parse_validation_errors(errors);
        if let Some(first) = errors
            .iter()
            .find(|e| e.code == REQUIRED)
            .or_else(|| errors.first())
        {
            self.message = first.message.clone();
        }
        self.errors = Some(errors);
        self
    }

    /// Transform [`ResponseError`] into axum [`Response`].
    pub fn into_response(
        self,
    ) -> std::result::Result<Response, axum::http::Error> {
        if let Ok(body) = serde_json::to_string(&self) {
            Response::builder()
                .status(self.status)
                .header(header::CONTENT_TYPE, "application/json")
                .body(body.into())
        } else {
            Ok(internal_server_error())
        }
    }
}

impl Default for ResponseError {
    fn default() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            message: "Internal server error.".to_owned(),
            errors: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct FieldError {
    field: String,
    #[serde(skip)]
    code: String,
    message: String,
}

fn parse_validation_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut errors: Vec<FieldError> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, issues)| {
            issues.iter().map(move |issue| FieldError {
                field: field.to_string(),
                code: issue.code.to_string(),
                message: issue
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid '{field}' field.")),
            })
        })
        .collect();
    errors.sort_by(|a, b| a.field.cmp(&b.field));
    errors
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let response = ResponseError::default()
            .message(&self.to_string())
            .status(StatusCode::BAD_REQUEST);

        let response = match &self {
            ServerError::Validation(validation_errors) => {
                response.errors(validation_errors)
            },

            ServerError::Axum(rejection) => {
                response.message(&rejection.body_text())
            },

            ServerError::Conflict(_) => response.status(StatusCode::CONFLICT),

            ServerError::InvalidCredentials => {
                response.status(StatusCode::UNAUTHORIZED)
            },

            ServerError::NotVerified | ServerError::Forbidden { .. } => {
                response.status(StatusCode::FORBIDDEN)
            },

            ServerError::NotFound(_) => response.status(StatusCode::NOT_FOUND),

            ServerError::Otp(OtpError::NotFound) => {
                response.status(StatusCode::NOT_FOUND)
            },

            ServerError::Token(TokenError::Missing) => {
                response.status(StatusCode::UNAUTHORIZED)
            },

            ServerError::Token(
                TokenError::Malformed(_) | TokenError::Expired,
            ) => response
                .message("Invalid token.")
                .status(StatusCode::FORBIDDEN),

            ServerError::Sql(err)
                if err
                    .as_database_error()
                    .and_then(|e| e.code())
                    .is_some_and(|code| code == UNIQUE_VIOLATION) =>
            {
                response
                    .message("Resource already exists.")
                    .status(StatusCode::CONFLICT)
            },

            ServerError::Token(TokenError::Encode(_))
            | ServerError::Crypto(_)
            | ServerError::Mail(_)
            | ServerError::Sql(_) => {
                tracing::error!(error = %self, "server returned 500 status");

                ResponseError::default()
            },

            ServerError::Internal { details, source } => {
                tracing::error!(
                    err = source.as_ref().map(|e| e.to_string()),
                    %details,
                    "server returned 500 status"
                );

                ResponseError::default()
            },

            _ => response,
        };

        response
            .into_response()
            .unwrap_or_else(|_| internal_server_error())
    }
}

fn internal_server_error() -> Response {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(header::CONTENT_TYPE, "application/json")
        .body(
            serde_json::json!({
                "message": "Internal server error.",
            })
            .to_string()
            .into(),
        )
        .unwrap_or_else(|_| Response::new("Internal server error".into()))
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;
    use validator::ValidationError;

    use super::*;

    async fn body(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_otp_errors_are_distinguishable() {
        let expired = ServerError::Otp(OtpError::Expired).into_response();
        assert_eq!(expired.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body(expired).await["message"], "OTP has expired.");

        let mismatch = ServerError::Otp(OtpError::Mismatch).into_response();
        assert_eq!(mismatch.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body(mismatch).await["message"], "Invalid OTP.");

        let verified =
            ServerError::Otp(OtpError::AlreadyVerified).into_response();
        assert_eq!(verified.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body(verified).await["message"], "User is already verified.");

        let unknown = ServerError::Otp(OtpError::NotFound).into_response();
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_token_errors() {
        let missing = ServerError::Token(TokenError::Missing).into_response();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body(missing).await["message"], "Missing token.");

        let expired = ServerError::Token(TokenError::Expired).into_response();
        assert_eq!(expired.status(), StatusCode::FORBIDDEN);
        assert_eq!(body(expired).await["message"], "Invalid token.");
    }

    #[tokio::test]
    async fn test_internal_hides_details() {
        let response = ServerError::internal("database exploded").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body(response).await["message"], "Internal server error.");
    }

    #[tokio::test]
    async fn test_validation_message() {
        let mut errors = ValidationErrors::new();
        errors.add(
            "email",
            ValidationError::new("required")
                .with_message("Email and OTP are required.".into()),
        );

        let response = ServerError::Validation(errors).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body(response).await;
        assert_eq!(body["message"], "Email and OTP are required.");
        assert_eq!(body["errors"][0]["field"], "email");
    }

    #[tokio::test]
    async fn test_presence_message_comes_first() {
        let mut errors = ValidationErrors::new();
        errors.add(
            "email",
            ValidationError::new("email")
                .with_message("Email must be formatted.".into()),
        );
        errors.add(
            "password",
            ValidationError::new(REQUIRED)
                .with_message("Password is required.".into()),
        );

        let body = body(ServerError::Validation(errors).into_response()).await;
        assert_eq!(body["message"], "Password is required.");
        assert_eq!(body["errors"][0]["message"], "Email must be formatted.");
    }

    #[tokio::test]
    async fn test_forbidden_message() {
        let response = ServerError::Forbidden {
            action: "delete",
            kind: "journal".into(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            body(response).await["message"],
            "You are not allowed to delete this journal."
        );
    }
}
