//! Prometheus scrape endpoint for the moderation pipeline.
//!
//! The queue exports `analysis_queue_depth` plus the
//! `analysis_runs_total` / `analysis_flagged_total` counters; everything
//! else comes from the exporter itself.

use axum::{routing::get, Router};
use metrics::gauge;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the global Prometheus recorder and return the `/metrics`
/// router. Call once at startup, before the first message is queued.
pub fn install() -> Router {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("prometheus recorder installed twice");

    // Seed the gauge so scrapes show the queue at zero before any
    // chat activity.
    gauge!("analysis_queue_depth").set(0.0);

    Router::new().route(
        "/metrics",
        get(move || {
            let handle = handle.clone();
            async move { handle.render() }
        }),
    )
}
