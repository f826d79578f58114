//! Metrics definitions for Token Gate.
//!
//! All metrics follow Prometheus naming conventions:
//! - `gate_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded by code:
//! - `outcome`: allow, reject
//! - `reason`: the rejection reason labels produced by the orchestrator
//! - `status`: success, error
//! - `result`: hit, miss
//!
//! Subjects, resources and key IDs are never used as labels.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // Authorization is on every request's control path: sub-10ms expected on warm cache
        .set_buckets_for_metric(
            Matcher::Full("gate_authorize_duration_seconds".to_string()),
            &[
                0.0005, 0.001, 0.002, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000,
            ],
        )
        .map_err(|e| format!("Failed to set authorize buckets: {e}"))?
        // JWKS fetches cross the network to the identity provider
        .set_buckets_for_metric(
            Matcher::Prefix("gate_jwks_fetch".to_string()),
            &[
                0.010, 0.025, 0.050, 0.100, 0.200, 0.500, 1.000, 2.000, 5.000, 10.000,
            ],
        )
        .map_err(|e| format!("Failed to set JWKS fetch buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// Decision Metrics
// ============================================================================

/// Record a granted request.
///
/// Metric: `gate_decisions_total{outcome="allow"}`, `gate_authorize_duration_seconds`
pub fn record_allow(duration: Duration) {
    counter!("gate_decisions_total", "outcome" => "allow").increment(1);
    histogram!("gate_authorize_duration_seconds", "outcome" => "allow")
        .record(duration.as_secs_f64());
}

/// Record a rejected request with its (bounded) reason label.
///
/// Metric: `gate_decisions_total{outcome="reject"}`, `gate_rejections_total{reason}`,
/// `gate_authorize_duration_seconds`
pub fn record_reject(reason: &'static str, duration: Duration) {
    counter!("gate_decisions_total", "outcome" => "reject").increment(1);
    counter!("gate_rejections_total", "reason" => reason).increment(1);
    histogram!("gate_authorize_duration_seconds", "outcome" => "reject")
        .record(duration.as_secs_f64());
}

// ============================================================================
// Key Resolver Metrics
// ============================================================================

/// Record a key cache lookup.
///
/// Metric: `gate_key_cache_lookups_total{result}`
pub fn record_key_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("gate_key_cache_lookups_total", "result" => result).increment(1);
}

/// Record a JWKS fetch attempt.
///
/// Metric: `gate_jwks_fetch_total{status}`, `gate_jwks_fetch_duration_seconds`
pub fn record_jwks_fetch(success: bool, duration: Duration) {
    let status = if success { "success" } else { "error" };
    counter!("gate_jwks_fetch_total", "status" => status).increment(1);
    histogram!("gate_jwks_fetch_duration_seconds", "status" => status)
        .record(duration.as_secs_f64());
}
