//! Manage json web tokens.
//!
//! Tokens are stateless: verification never reaches the store and an issued
//! token stays valid until it expires. There is no revocation.

use axum::extract::FromRef;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use crate::user::User;

/// Validity of a token, in seconds.
pub const EXPIRATION_TIME: i64 = 60 * 60 * 24; // 1 day.

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Missing token.")]
    Missing,
    #[error("invalid token: {0}")]
    Malformed(jsonwebtoken::errors::Error),
    #[error("token expired")]
    Expired,
    #[error("failed to sign token: {0}")]
    Encode(jsonwebtoken::errors::Error),
}

/// Pieces of information asserted on a JWT.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID.
    pub id: Uuid,
    pub email: String,
    pub username: String,
    /// Identifies the time at which the JWT was issued.
    pub iat: i64,
    /// Identifies the expiration time after which the JWT must not be
    /// accepted for processing.
    pub exp: i64,
}

/// Manage JWT tokens.
#[derive(Clone)]
pub struct TokenManager {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl FromRef<AppState> for TokenManager {
    fn from_ref(state: &AppState) -> TokenManager {
        state.token.clone()
    }
}

impl TokenManager {
    /// Create a new [`TokenManager`] from a shared secret.
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            algorithm: Algorithm::HS256,
            encoding_key: EncodingKey::from_secret(secret.as_ref()),
            decoding_key: DecodingKey::from_secret(secret.as_ref()),
        }
    }

    /// Create a new token for `user`, issued at `now`.
    pub fn create(
        &self,
        user: &User,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(EXPIRATION_TIME)).timestamp(),
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(TokenError::Encode)
    }

    /// Decode and check a token.
    pub fn decode(&self, token: Option<&str>) -> Result<Claims, TokenError> {
        let token = token
            .filter(|t| !t.is_empty())
            .ok_or(TokenError::Missing)?;

        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.validate_aud = false;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed(err),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "a@b.com".into(),
            username: "alice".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_then_decode() {
        let manager = TokenManager::new("secret");
        let user = user();
        let now = Utc::now();

        let token = manager.create(&user, now).unwrap();
        let claims = manager.decode(Some(&token)).unwrap();

        assert_eq!(claims.id, user.id);
        assert_eq!(claims.email, "a@b.com");
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.exp - claims.iat, EXPIRATION_TIME);
    }

    #[test]
    fn test_flipped_signature_byte() {
        let manager = TokenManager::new("secret");
        let token = manager.create(&user(), Utc::now()).unwrap();

        let (head, signature) = token.rsplit_once('.').unwrap();
        let mut signature = signature.as_bytes().to_vec();
        signature[5] = if signature[5] == b'A' { b'B' } else { b'A' };
        let tampered =
            format!("{head}.{}", String::from_utf8(signature).unwrap());

        assert!(matches!(
            manager.decode(Some(&tampered)),
            Err(TokenError::Malformed(_))
        ));
    }

    #[test]
    fn test_other_secret() {
        let token = TokenManager::new("secret")
            .create(&user(), Utc::now())
            .unwrap();

        assert!(matches!(
            TokenManager::new("other").decode(Some(&token)),
            Err(TokenError::Malformed(_))
        ));
    }

    #[test]
    fn test_expired() {
        let manager = TokenManager::new("secret");
        let issued = Utc::now() - Duration::seconds(EXPIRATION_TIME + 5);
        let token = manager.create(&user(), issued).unwrap();

        assert!(matches!(
            manager.decode(Some(&token)),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn test_missing_and_garbage() {
        let manager = TokenManager::new("secret");

        assert!(matches!(manager.decode(None), Err(TokenError::Missing)));
        assert!(matches!(manager.decode(Some("")), Err(TokenError::Missing)));
        assert!(matches!(
            manager.decode(Some("not.a.jwt")),
            Err(TokenError::Malformed(_))
        ));
    }
}
