//! # Gate Test Utilities
//!
//! Shared test utilities for Token Gate.
//!
//! This crate provides:
//! - Deterministic crypto fixtures (fixed Ed25519 keys for reproducible tests)
//! - Test data builders (`TestTokenBuilder`)
//! - A mocked identity provider JWKS endpoint (`MockJwksServer`)
//! - In-memory log capture (`CapturedLogs`)
//! - Server test harness (`TestGateServer` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gate_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let keypair = TestKeypair::new(1, "key-01");
//!     let idp = MockJwksServer::start(&[&keypair]).await;
//!
//!     let token = keypair.sign_token(
//!         &TestTokenBuilder::new()
//!             .issued_by(&idp.issuer())
//!             .for_user("alice")
//!             .build(),
//!     );
//! }
//! ```

pub mod crypto_fixtures;
pub mod jwks_server;
pub mod log_capture;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use jwks_server::*;
pub use log_capture::*;
pub use server_harness::*;
pub use token_builders::*;
