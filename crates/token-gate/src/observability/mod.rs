//! Observability module for Token Gate.
//!
//! Provides the log filter, metrics definitions and the Prometheus recorder setup.

pub mod logging;
pub mod metrics;
