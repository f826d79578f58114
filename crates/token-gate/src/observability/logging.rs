//! Log filter setup for Token Gate.
//!
//! Components log on dotted `gate.*` targets (`gate.orchestrator`,
//! `gate.auth.jwks`, `gate.auth.jwt`, `gate.handlers`). `EnvFilter` matches
//! targets by prefix, so the default directive names `gate` alongside the
//! crate's own module path.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_LOG_FILTER: &str = "token_gate=info,gate=info,tower_http=info";

/// The default filter, ignoring `RUST_LOG`.
pub fn default_env_filter() -> EnvFilter {
    EnvFilter::new(DEFAULT_LOG_FILTER)
}

/// `RUST_LOG` when set and valid, otherwise [`DEFAULT_LOG_FILTER`].
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| default_env_filter())
}
