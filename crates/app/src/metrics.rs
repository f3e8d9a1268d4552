//! Prometheus metrics
//!
//! The agent records through the `metrics` facade; this installs the
//! exporter that serves them over HTTP.

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Serve `/metrics` on `0.0.0.0:{port}`
///
/// Must be called from within the tokio runtime.
pub fn init_metrics(port: u16) -> Result<(), BuildError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    describe();
    tracing::info!(%addr, "Prometheus metrics exporter listening");
    Ok(())
}

fn describe() {
    metrics::describe_counter!(
        "voice_chat_turns_total",
        "Conversation turns by outcome"
    );
    metrics::describe_counter!(
        "voice_chat_llm_failures_total",
        "Language model queries that failed or returned nothing"
    );
    metrics::describe_histogram!(
        "voice_chat_llm_latency_seconds",
        metrics::Unit::Seconds,
        "Language model round-trip time"
    );
}
