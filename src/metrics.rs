// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the service DNS controller.
//!
//! All metrics carry the namespace prefix `svcdns_` and are exposed on
//! `/metrics` by [`serve_metrics`], next to a `/healthz` liveness endpoint.
//!
//! # Metrics Categories
//!
//! - **Notification Metrics** - Watch notifications received, by change kind
//! - **Reconciliation Metrics** - Reconciliation outcomes and duration, by action
//! - **Error Metrics** - Errors by component and reason
//! - **Watch Metrics** - Watch reopens after a server-side timeout
//!
//! # Example
//!
//! ```rust,no_run
//! use svcdns::metrics::record_reconciliation;
//!
//! record_reconciliation("upsert", true, std::time::Duration::from_millis(40));
//! ```

use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};
use prometheus::core::Collector;
use prometheus::{
    Counter, CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::net::SocketAddr;
use std::sync::LazyLock;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::constants::{HEALTH_SERVER_PATH, METRICS_SERVER_PATH};

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all metrics
const METRICS_NAMESPACE: &str = "svcdns";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Registry behind the `/metrics` endpoint
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

/// Register `collector` with [`METRICS_REGISTRY`] and hand it back.
///
/// Metric definitions are static, so a failure here is a programming error.
fn registered<C: Collector + Clone + 'static>(collector: C) -> C {
    METRICS_REGISTRY
        .register(Box::new(collector.clone()))
        .unwrap_or_else(|e| panic!("metric registration failed: {e}"));
    collector
}

// ============================================================================
// Notification Metrics
// ============================================================================

/// Total number of watch notifications received
///
/// Labels:
/// - `change_kind`: `added`, `modified`, `deleted` or `error`
pub static NOTIFICATIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_notifications_total"),
        "Total number of service watch notifications by change kind",
    );
    registered(CounterVec::new(opts, &["change_kind"]).expect("valid metric definition"))
});

// ============================================================================
// Reconciliation Metrics
// ============================================================================

/// Total number of reconciliations by action and status
///
/// Labels:
/// - `action`: `upsert`, `delete` or `skip`
/// - `status`: Outcome (`success`, `error`)
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_reconciliations_total"),
        "Total number of reconciliations by action and status",
    );
    registered(CounterVec::new(opts, &["action", "status"]).expect("valid metric definition"))
});

/// Duration of reconciliations in seconds, retries included
///
/// Labels:
/// - `action`: `upsert` or `delete`
pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Duration of reconciliations in seconds by action",
    )
    .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]);
    registered(HistogramVec::new(opts, &["action"]).expect("valid metric definition"))
});

// ============================================================================
// Error Metrics
// ============================================================================

/// Total number of errors by component and reason
///
/// Labels:
/// - `component`: `watch`, `reconciler` or `provider`
/// - `reason`: Stable reason identifier of the error (e.g. `NoMatchingZone`)
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_errors_total"),
        "Total number of errors by component and reason",
    );
    registered(CounterVec::new(opts, &["component", "reason"]).expect("valid metric definition"))
});

// ============================================================================
// Watch Metrics
// ============================================================================

/// Total number of times the watch was reopened from its last cursor
pub static WATCH_REOPENS_TOTAL: LazyLock<Counter> = LazyLock::new(|| {
    registered(Counter::new(
        format!("{METRICS_NAMESPACE}_watch_reopens_total"),
        "Total number of watch reopens after the server ended the stream",
    )
    .expect("valid metric definition"))
});

// ============================================================================
// Recording Helpers
// ============================================================================

/// Record a received watch notification
pub fn record_notification(change_kind: &str) {
    NOTIFICATIONS_TOTAL.with_label_values(&[change_kind]).inc();
}

/// Record a finished `upsert` or `delete` reconciliation and how long it took,
/// retries included.
pub fn record_reconciliation(action: &str, succeeded: bool, duration: Duration) {
    let status = if succeeded { "success" } else { "error" };
    RECONCILIATION_TOTAL
        .with_label_values(&[action, status])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[action])
        .observe(duration.as_secs_f64());
}

/// Record a skipped notification (nothing to publish)
pub fn record_reconciliation_skipped() {
    RECONCILIATION_TOTAL
        .with_label_values(&["skip", "success"])
        .inc();
}

/// Count an error raised by `component` (`watch`, `reconciler`, `provider`).
pub fn record_error(component: &str, reason: &str) {
    ERRORS_TOTAL.with_label_values(&[component, reason]).inc();
}

/// Record a watch reopen
pub fn record_watch_reopened() {
    WATCH_REOPENS_TOTAL.inc();
}

/// Encode every registered metric in the Prometheus text format.
///
/// # Errors
///
/// Returns an error if encoding fails.
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}

// ============================================================================
// HTTP Endpoint
// ============================================================================

async fn metrics_handler() -> impl IntoResponse {
    match gather_metrics() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn healthz_handler() -> impl IntoResponse {
    "ok"
}

/// Router serving `/metrics` and `/healthz`.
pub fn metrics_router() -> Router {
    Router::new()
        .route(METRICS_SERVER_PATH, get(metrics_handler))
        .route(HEALTH_SERVER_PATH, get(healthz_handler))
}

/// Serve the metrics router on `addr` until `shutdown` is cancelled.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve_metrics(addr: SocketAddr, shutdown: CancellationToken) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, path = METRICS_SERVER_PATH, "Metrics server listening");

    axum::serve(listener, metrics_router())
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
}
