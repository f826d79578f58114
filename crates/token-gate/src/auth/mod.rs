//! Authentication module for Token Gate.
//!
//! Validates bearer JWTs against the issuer's published JWKS.
//!
//! # Components
//!
//! - `extract` - Bearer credential extraction from the authorization header
//! - `jwks` - JWKS client for fetching and caching signing keys
//! - `jwt` - JWT verification using resolved keys
//! - `claims` - Verified claims structure

pub mod claims;
pub mod extract;
pub mod jwks;
pub mod jwt;

pub use claims::Claims;
pub use extract::extract_bearer;
pub use jwks::{JwkConversionError, JwksClient, KeyResolutionError, KeyResolver, SigningKey};
pub use jwt::{TokenVerifier, VerificationError};
