//! Metrics and observability utilities
//!
//! Prometheus metrics for the RAG pipeline: HTTP requests, per-stage
//! latency, relevance filtering outcomes and embedding calls.

use crate::context::ComplexityTier;
use crate::errors::Stage;
use metrics::{counter, describe_counter, describe_histogram, gauge, describe_gauge, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all CaseForge metrics
pub const METRICS_PREFIX: &str = "caseforge";

/// Histogram buckets for HTTP request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.010,  // 10ms
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
    10.00,  // 10s
    30.00,  // 30s
];

/// Buckets for a single upstream call (embedding, search, generation)
pub const STAGE_BUCKETS: &[f64] = &[
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.000,  // 2s
    5.000,  // 5s
    10.00,  // 10s
    30.00,  // 30s
];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    describe_counter!(
        format!("{}_rag_requests_total", METRICS_PREFIX),
        Unit::Count,
        "RAG requests by tier and outcome"
    );

    describe_histogram!(
        format!("{}_stage_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Latency of each pipeline stage"
    );

    describe_counter!(
        format!("{}_stage_errors_total", METRICS_PREFIX),
        Unit::Count,
        "Pipeline stage failures"
    );

    describe_gauge!(
        format!("{}_candidates_retrieved", METRICS_PREFIX),
        Unit::Count,
        "Candidates returned by the last search"
    );

    describe_gauge!(
        format!("{}_candidates_kept", METRICS_PREFIX),
        Unit::Count,
        "Candidates kept by the last relevance pass"
    );

    describe_counter!(
        format!("{}_relevance_fallback_total", METRICS_PREFIX),
        Unit::Count,
        "Requests where no candidate cleared the threshold"
    );

    describe_counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total embedding API requests"
    );

    describe_histogram!(
        format!("{}_embedding_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Embedding generation latency in seconds"
    );

    describe_counter!(
        format!("{}_embedding_truncations_total", METRICS_PREFIX),
        Unit::Count,
        "Embedding inputs truncated to the model limit"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Latency and outcome of one pipeline stage
pub fn record_stage(stage: Stage, duration_secs: f64, success: bool) {
    histogram!(
        format!("{}_stage_duration_seconds", METRICS_PREFIX),
        "stage" => stage.as_str()
    )
    .record(duration_secs);

    if !success {
        counter!(
            format!("{}_stage_errors_total", METRICS_PREFIX),
            "stage" => stage.as_str()
        )
        .increment(1);
    }
}

/// `outcome` is "success" or the name of the failing stage
pub fn record_rag_request(tier: ComplexityTier, outcome: &str) {
    counter!(
        format!("{}_rag_requests_total", METRICS_PREFIX),
        "tier" => tier.as_str(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

pub fn record_candidates(retrieved: usize, kept: usize, fallback: bool) {
    gauge!(format!("{}_candidates_retrieved", METRICS_PREFIX)).set(retrieved as f64);
    gauge!(format!("{}_candidates_kept", METRICS_PREFIX)).set(kept as f64);

    if fallback {
        counter!(format!("{}_relevance_fallback_total", METRICS_PREFIX)).increment(1);
    }
}

/// Helper to record embedding metrics
pub fn record_embedding(duration_secs: f64, model: &str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => status
    )
    .increment(1);

    if success {
        histogram!(
            format!("{}_embedding_duration_seconds", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .record(duration_secs);
    }
}

pub fn record_truncation() {
    counter!(format!("{}_embedding_truncations_total", METRICS_PREFIX)).increment(1);
}
