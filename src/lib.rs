//! Wanderlog is a travel journaling API: OTP-verified accounts, journals,
//! postcards and community lore.

#![forbid(unsafe_code)]
pub mod clock;
pub mod config;
mod crypto;
pub mod database;
pub mod error;
mod journal;
mod lore;
pub mod mail;
mod middleware;
mod otp;
mod ownership;
mod postcard;
mod router;
pub mod telemetry;
mod token;
mod user;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::{Router, middleware as AxumMiddleware};
use tower::ServiceBuilder;
use tower_http::LatencyUnit;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::sensitive_headers::SetSensitiveHeadersLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{
    DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer,
};

use crate::clock::{Clock, SystemClock};
use crate::mail::{BrevoMailer, LogMailer, Mailer};

/// MUST NEVER be used in production.
#[cfg(test)]
pub async fn make_request(
    token: Option<&str>,
    app: Router,
    method: Method,
    path: &str,
    body: String,
) -> axum::http::Response<axum::body::Body> {
    use axum::extract::Request;
    use tower::util::ServiceExt;

    let mut request = Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    app.oneshot(request.body(axum::body::Body::from(body)).unwrap())
        .await
        .unwrap()
}

/// State sharing between routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Configuration>,
    pub db: database::Database,
    pub crypto: Arc<crypto::PasswordManager>,
    pub otp: otp::OtpManager,
    pub token: token::TokenManager,
    pub mail: Arc<dyn Mailer>,
    pub clock: Arc<dyn Clock>,
}

fn cors(origin: Option<&str>) -> CorsLayer {
    let allow_origin = match origin.and_then(|o| HeaderValue::from_str(o).ok()) {
        Some(origin) => AllowOrigin::exact(origin),
        None => AllowOrigin::from(Any),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
        .vary([header::AUTHORIZATION])
}

/// Create router.
pub fn app(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        // Mark sensitive headers before anything records them.
        .layer(SetSensitiveHeadersLayer::new([header::AUTHORIZATION, header::COOKIE]))
        // Add high level tracing/logging to all requests.
        .layer(
            TraceLayer::new_for_http()
                .on_body_chunk(|chunk: &Bytes, latency: Duration, _span: &tracing::Span| {
                    tracing::trace!(size_bytes = chunk.len(), latency = ?latency, "sending body chunk")
                })
                .make_span_with(DefaultMakeSpan::new().include_headers(true).level(tracing::Level::INFO))
                .on_request(DefaultOnRequest::new())
                .on_response(DefaultOnResponse::new().include_headers(true).latency_unit(LatencyUnit::Micros)),
        )
        // Set a timeout.
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, Duration::from_secs(10)))
        // Add CORS preflight support.
        .layer(cors(state.config.cors_origin.as_deref()));

    router::router(state.clone())
        .route_layer(AxumMiddleware::from_fn(telemetry::track))
        .with_state(state)
        .layer(middleware)
}

/// Initialize the application state.
pub async fn initialize_state(
    config: config::Configuration,
) -> Result<AppState, Box<dyn std::error::Error + Send + Sync>> {
    let db = match config.postgres {
        Some(ref postgres) => database::Database::new(postgres).await?,
        None => {
            tracing::warn!(
                "missing `postgres` entry on `config.yaml` file, data is kept in memory"
            );
            database::Database::memory()
        },
    };

    let crypto = Arc::new(crypto::PasswordManager::new(config.argon2.clone())?);
    let otp = otp::OtpManager::new(config.otp.clone());

    // handle jwt.
    let Some(secret) = config.token.as_ref().and_then(|t| t.secret.as_deref())
    else {
        return Err("missing `JWT_SECRET` environment variable or `token.secret` entry".into());
    };
    let token = token::TokenManager::new(secret);

    // handle mail sender.
    let mail: Arc<dyn Mailer> = match &config.mail {
        Some(cfg) => Arc::new(BrevoMailer::new(cfg)?),
        None => {
            tracing::warn!("missing `mail` entry on `config.yaml` file, emails are only logged");
            Arc::new(LogMailer)
        },
    };

    Ok(AppState {
        config: Arc::new(config),
        db,
        crypto,
        otp,
        token,
        mail,
        clock: Arc::new(SystemClock),
    })
}
