//! Liveness check.

/// Handler for GET /v1/health
///
/// Returns "OK" while the process is serving. Does not contact the issuer;
/// keys are fetched on demand during verification.
pub async fn health_check() -> &'static str {
    "OK"
}
