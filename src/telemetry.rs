//! Telemetry: OTLP traces, Prometheus metrics and per-request tracking.

use std::time::{Duration, Instant};

use axum::extract::{MatchedPath, Request};
use axum::http::Version;
use axum::middleware::Next;
use axum::response::Response;
use metrics::{Unit, gauge};
use metrics_exporter_prometheus::{
    BuildError, Matcher, PrometheusBuilder, PrometheusHandle,
};
use opentelemetry::trace::{Span, TraceError, Tracer};
use opentelemetry::{KeyValue, global};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::SdkTracerProvider;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, RefreshKind, System};

const SERVICE_NAME: &str = "wanderlog";
const REQUESTS_TOTAL: &str = "http_requests_total";
const REQUESTS_DURATION: &str = "http_requests_duration_seconds";
const PROCESS_REFRESH: Duration = Duration::from_secs(10);

/// Create tracer exporting spans to the OTLP collector at `endpoint`.
pub fn setup_tracer(endpoint: &str) -> Result<SdkTracerProvider, TraceError> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(Resource::builder().with_service_name(SERVICE_NAME).build())
        .build())
}

/// Install the Prometheus recorder and start sampling process usage.
///
/// Must be called inside a tokio runtime.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle, BuildError> {
    const BUCKETS: &[f64] =
        &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(REQUESTS_DURATION.to_owned()),
            BUCKETS,
        )?
        .install_recorder()?;

    metrics::describe_counter!(REQUESTS_TOTAL, "Handled HTTP requests.");
    metrics::describe_histogram!(
        REQUESTS_DURATION,
        Unit::Seconds,
        "Time spent handling HTTP requests."
    );
    metrics::describe_gauge!(
        "process_cpu_usage",
        Unit::Percent,
        "CPU usage of the process in percentage."
    );
    metrics::describe_gauge!(
        "process_memory_used_bytes",
        Unit::Bytes,
        "Total process memory in bytes."
    );

    tokio::spawn(sample_process());

    Ok(handle)
}

/// Refresh CPU and memory gauges of the current process, forever.
async fn sample_process() {
    let mut system = System::new_with_specifics(RefreshKind::nothing());
    let pid = Pid::from_u32(std::process::id());

    loop {
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_memory().with_cpu(),
        );

        if let Some(process) = system.process(pid) {
            gauge!("process_memory_used_bytes").set(process.memory() as f64);
            gauge!("process_cpu_usage").set(f64::from(process.cpu_usage()));
        }

        tokio::time::sleep(PROCESS_REFRESH).await;
    }
}

fn http_version(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_11 => "HTTP/1.1",
        Version::HTTP_2 => "HTTP/2",
        Version::HTTP_3 => "HTTP/3",
        _ => "UNKNOWN",
    }
}

/// Record request count and latency, labelled by method, route and status,
/// inside an OpenTelemetry span.
///
/// The route template (`/journals/{id}`) is used over the raw path to keep
/// label cardinality bounded.
pub async fn track(req: Request, next: Next) -> Response {
    let mut span = global::tracer("wanderlog-http").start("http-request");

    let start = Instant::now();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| req.uri().path().to_owned());
    let method = req.method().to_string();
    let version = http_version(req.version());

    let response = next.run(req).await;

    let latency = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    span.set_attributes([
        KeyValue::new("version", version),
        KeyValue::new("path", route.clone()),
        KeyValue::new("method", method.clone()),
        KeyValue::new("status", status.clone()),
    ]);
    span.end();

    let labels = [("method", method), ("path", route), ("status", status)];
    metrics::counter!(REQUESTS_TOTAL, &labels).increment(1);
    metrics::histogram!(REQUESTS_DURATION, &labels).record(latency);

    response
}
