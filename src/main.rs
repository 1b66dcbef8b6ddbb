use std::path::PathBuf;

use axum::routing::get;
use opentelemetry::global;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use wanderlog::config::Configuration;
use wanderlog::{app, initialize_state, telemetry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    // Export spans only when a collector is configured.
    let tracer = match std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") {
        Ok(endpoint) if !endpoint.is_empty() => {
            let provider = telemetry::setup_tracer(&endpoint)?;
            global::set_tracer_provider(provider.clone());
            Some(provider)
        },
        _ => None,
    };
    let metrics = telemetry::setup_metrics_recorder()?;

    // read configuration file. let it in memory.
    let path = std::env::var("CONFIG_PATH").unwrap_or_default();
    let config = Configuration::default()
        .path(PathBuf::from(path))
        .read()?
        .with_env_secrets(
            std::env::var("JWT_SECRET").ok(),
            std::env::var("BREVO_API_KEY").ok(),
        );
    let port = config.port();

    let state = initialize_state(config).await?;
    let app = app(state).route(
        "/metrics",
        get(move || std::future::ready(metrics.render())),
    );

    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(%port, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(provider) = tracer {
        provider.shutdown()?;
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(%err, "cannot listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(
            tokio::signal::unix::SignalKind::terminate(),
        ) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(err) => {
                tracing::error!(%err, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received, draining connections");
}
