//! Token Gate Library
//!
//! A request authorizer that sits in front of a protected service. For each
//! authorization event it:
//!
//! - Extracts the bearer credential from the authorization header
//! - Verifies the JWT against the trusted issuer's published JWKS
//! - Emits an allow policy scoped to the requested resource, or a generic
//!   401 rejection
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> gate.rs -> auth/{extract,jwt,jwks}.rs -> decision.rs
//! ```
//!
//! # Modules
//!
//! - `auth` - Credential extraction, key resolution and token verification
//! - `config` - Service configuration from environment
//! - `decision` - Authorization decisions and policy documents
//! - `errors` - HTTP-facing error type
//! - `gate` - Orchestration of one authorization event
//! - `handlers` - HTTP request handlers
//! - `observability` - Metrics
//! - `routes` - Axum router setup

pub mod auth;
pub mod config;
pub mod decision;
pub mod errors;
pub mod gate;
pub mod handlers;
pub mod observability;
pub mod routes;
