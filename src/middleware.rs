//! Middlewares for routes.

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;

use crate::error::Result;
use crate::token::{TokenError, TokenManager};

const BEARER: &str = "Bearer ";

/// Extract the token of a `Bearer <token>` authorization header.
fn bearer(req: &Request) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|value| value.strip_prefix(BEARER))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Custom middleware for authentification.
///
/// Verified [`crate::token::Claims`] are inserted into request extensions.
/// Only the signature and expiry are checked; the store is never read.
pub async fn authenticate(
    State(token): State<TokenManager>,
    mut req: Request,
    next: Next,
) -> Result<Response> {
    let Some(raw) = bearer(&req) else {
        return Err(TokenError::Missing.into());
    };

    let claims = token.decode(Some(raw))?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
