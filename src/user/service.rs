use std::sync::Arc;

use axum::extract::FromRef;

use crate::AppState;
use crate::clock::Clock;
use crate::crypto::PasswordManager;
use crate::error::{Result, ServerError};
use crate::mail::{Mailer, otp_email};
use crate::otp::OtpManager;
use crate::token::TokenManager;
use crate::user::{Present, User, UserBuilder, UserRepository};

/// Account lifecycle: signup, verification and login.
#[derive(Clone)]
pub struct UserService {
    pub repo: Arc<dyn UserRepository>,
    pub crypto: Arc<PasswordManager>,
    pub otp: OtpManager,
    pub token: TokenManager,
    pub mail: Arc<dyn Mailer>,
    pub clock: Arc<dyn Clock>,
}

impl FromRef<AppState> for UserService {
    fn from_ref(state: &AppState) -> UserService {
        UserService {
            repo: Arc::clone(&state.db.users),
            crypto: Arc::clone(&state.crypto),
            otp: state.otp.clone(),
            token: state.token.clone(),
            mail: Arc::clone(&state.mail),
            clock: Arc::clone(&state.clock),
        }
    }
}

impl UserService {
    /// Create an unverified user and mail its one-time code.
    ///
    /// The user stays created even if the email cannot be sent.
    pub async fn signup(
        &self,
        builder: UserBuilder<Present<String>, Present<String>>,
    ) -> Result<User> {
        if self
            .repo
            .exists(builder.email_ref(), builder.username_ref())
            .await?
        {
            return Err(ServerError::Conflict(
                "User with this email or username already exists.".into(),
            ));
        }

        let (user, code) =
            builder.build(&self.crypto, &self.otp, self.clock.now())?;
        self.repo.create(&user).await?;

        tracing::info!(user_id = %user.id, "user created");

        let (subject, body) = otp_email(&code, self.otp.validity());
        self.mail.send(&user.email, subject, &body).await?;

        Ok(user)
    }

    /// Check a one-time code and mark the user verified.
    pub async fn verify_otp(&self, email: &str, code: &str) -> Result<User> {
        let now = self.clock.now();
        let user = self.repo.find_by_email(email).await?;

        let mut user = self.otp.validate(user, code, now)?;
        user.updated_at = now;
        self.repo.update(&user).await?;

        tracing::info!(user_id = %user.id, "user verified");

        Ok(user)
    }

    /// Check credentials and issue a bearer token.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<String> {
        let user = self
            .repo
            .find_by_identifier(identifier)
            .await?
            .ok_or(ServerError::InvalidCredentials)?;

        if !user.is_verified {
            return Err(ServerError::NotVerified);
        }

        if !self.crypto.verify_password(password, &user.password)? {
            return Err(ServerError::InvalidCredentials);
        }

        Ok(self.token.create(&user, self.clock.now())?)
    }
}
