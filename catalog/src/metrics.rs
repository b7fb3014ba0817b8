//! Prometheus metrics for seeding and interactive LLM usage.

use std::net::SocketAddr;

use metrics::{counter, histogram};

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new().with_http_listener(addr);
    if let Err(e) = builder.install() {
        tracing::warn!("Failed to install Prometheus exporter: {}", e);
    } else {
        tracing::info!(%addr, "Prometheus exporter listening");
    }
}

/// Record one chat-completion call and its latency.
pub fn llm_request(outcome: &'static str, duration_ms: u64) {
    counter!("portfolio_llm_requests_total", "outcome" => outcome).increment(1);
    histogram!("portfolio_llm_request_duration_ms").record(duration_ms as f64);
}

/// Record one generation attempt of a seeding phase.
pub fn seed_attempt(phase: &'static str, outcome: &'static str) {
    counter!("portfolio_seed_attempts_total", "phase" => phase, "outcome" => outcome)
        .increment(1);
}

/// Record items accepted by a generation phase.
pub fn seed_items(phase: &'static str, count: usize) {
    counter!("portfolio_seed_items_total", "phase" => phase).increment(count as u64);
}

pub fn integrations_skipped(count: usize) {
    counter!("portfolio_integrations_skipped_total").increment(count as u64);
}

pub fn ring_edges_added(count: usize) {
    counter!("portfolio_ring_edges_total").increment(count as u64);
}

/// Record an interactive assistant request.
pub fn assistant_request(kind: &'static str, outcome: &'static str) {
    counter!("portfolio_assistant_requests_total", "kind" => kind, "outcome" => outcome)
        .increment(1);
}
