//! Typed builder for User.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::crypto::PasswordManager;
use crate::error::Result;
use crate::otp::OtpManager;
use crate::user::{Role, User};

/// [`User`] builder.
#[derive(Debug, Clone)]
pub struct UserBuilder<Email, Username> {
    email: Email,
    username: Username,
    password: String,
    role: Role,
}

/// Value is missing on [`UserBuilder`].
#[derive(Debug, Clone)]
pub struct Missing;

/// Value is present on [`UserBuilder`].
#[derive(Debug, Clone)]
pub struct Present<T>(pub T);

impl Default for UserBuilder<Missing, Missing> {
    fn default() -> Self {
        Self::new()
    }
}

impl UserBuilder<Missing, Missing> {
    /// Create a new [`UserBuilder`].
    pub fn new() -> Self {
        Self {
            email: Missing,
            username: Missing,
            password: String::default(),
            role: Role::default(),
        }
    }
}

impl<Username> UserBuilder<Missing, Username> {
    /// Update `email` field on [`UserBuilder`].
    pub fn email(
        self,
        email: impl Into<String>,
    ) -> UserBuilder<Present<String>, Username> {
        UserBuilder {
            email: Present(email.into()),
            username: self.username,
            password: self.password,
            role: self.role,
        }
    }
}

impl<Email> UserBuilder<Email, Missing> {
    /// Update `username` field on [`UserBuilder`].
    pub fn username(
        self,
        username: impl Into<String>,
    ) -> UserBuilder<Email, Present<String>> {
        UserBuilder {
            email: self.email,
            username: Present(username.into()),
            password: self.password,
            role: self.role,
        }
    }
}

impl<Email, Username> UserBuilder<Email, Username> {
    /// Update `password` field on [`UserBuilder`].
    pub fn password(mut self, password: impl ToString) -> Self {
        self.password = password.to_string();
        self
    }

    /// Update `role` field on [`UserBuilder`].
    pub fn role(mut self, role: Option<Role>) -> Self {
        self.role = role.unwrap_or_default();
        self
    }
}

impl UserBuilder<Present<String>, Present<String>> {
    /// Email the user will be created with.
    pub fn email_ref(&self) -> &str {
        &self.email.0
    }

    /// Username the user will be created with.
    pub fn username_ref(&self) -> &str {
        &self.username.0
    }

    /// Build an unverified [`User`] with a hashed password and a fresh
    /// one-time code.
    ///
    /// Returns the user and the plaintext code to send.
    pub fn build(
        self,
        crypto: &PasswordManager,
        otp: &OtpManager,
        now: DateTime<Utc>,
    ) -> Result<(User, String)> {
        let mut user = User {
            id: Uuid::new_v4(),
            username: self.username.0,
            email: self.email.0,
            password: crypto.hash_password(&self.password)?,
            is_verified: false,
            role: self.role,
            created_at: now,
            updated_at: now,
            ..Default::default()
        };
        let code = otp.issue(&mut user, now);

        Ok((user, code))
    }
}
