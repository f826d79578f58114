//! JWT utilities shared across Token Gate components.
//!
//! This module provides the pieces of JWT handling that do not depend on a
//! particular key source:
//! - Size limits for DoS prevention
//! - Leeway bounds for expiration checks
//! - Unverified header decoding (`kid` and `alg` lookup)
//! - Decoding of JWK key material
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Header values are only ever used to select a key from a trusted JWKS;
//!   the token MUST still be verified against that key
//! - Error messages are generic to prevent information leakage
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::decode_unverified_header;
//!
//! let header = decode_unverified_header(token)?;
//! let key = resolver.resolve_key(&header.kid).await?;
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// Typical identity-provider access tokens are well under 2KB. Anything larger
/// is rejected before base64 decoding or signature verification.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// Default leeway applied to `exp`/`nbf` checks.
///
/// Zero: a token is expired as soon as its `exp` has passed.
pub const DEFAULT_LEEWAY: Duration = Duration::from_secs(0);

/// Maximum allowed leeway (10 minutes).
///
/// Prevents misconfiguration that would keep expired tokens usable for long.
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

/// Length of an Ed25519 public key in bytes.
pub const ED25519_PUBLIC_KEY_LEN: usize = 32;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while inspecting a JWT before verification.
///
/// Messages are intentionally generic. Details are logged at debug level.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Token format is invalid (not a valid JWT structure).
    #[error("The access token is invalid or expired")]
    MalformedToken,

    /// Token is missing required `kid` header.
    #[error("The access token is invalid or expired")]
    MissingKid,

    /// JWK key material could not be decoded.
    #[error("Invalid key material")]
    InvalidKeyMaterial,
}

// =============================================================================
// Header Types
// =============================================================================

/// The fields of a JWT header needed to select a verification key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenHeader {
    /// Key ID naming the JWKS entry that signed the token.
    pub kid: String,

    /// Algorithm the token claims to be signed with (e.g. `RS256`).
    pub alg: String,
}

#[derive(Deserialize)]
struct RawHeader {
    #[serde(default)]
    kid: Option<serde_json::Value>,
    #[serde(default)]
    alg: Option<serde_json::Value>,
}

// =============================================================================
// Functions
// =============================================================================

/// Decode the JWT header without verifying the signature.
///
/// # Security
///
/// - Token size is checked BEFORE any parsing
/// - This function does NOT validate the token signature
/// - `kid` is only to be used for lookup in a trusted JWKS
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds `MAX_JWT_SIZE_BYTES`
/// - `MalformedToken` - Wrong number of segments, bad base64, invalid JSON,
///   or a missing/non-string `alg`
/// - `MissingKid` - Header has no non-empty string `kid`
pub fn decode_unverified_header(token: &str) -> Result<TokenHeader, JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    // JWT format: header.payload.signature
    let mut parts = token.split('.');
    let (Some(header_part), Some(_), Some(_), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        tracing::debug!(target: "common.jwt", "Token rejected: invalid JWT format");
        return Err(JwtValidationError::MalformedToken);
    };

    let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header base64");
        JwtValidationError::MalformedToken
    })?;

    let header: RawHeader = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
        JwtValidationError::MalformedToken
    })?;

    let alg = header
        .alg
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .ok_or(JwtValidationError::MalformedToken)?;

    // Empty kid is rejected as missing
    let kid = header
        .kid
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .ok_or(JwtValidationError::MissingKid)?;

    Ok(TokenHeader { kid, alg })
}

/// Decode an Ed25519 public key from a JWK `x` field (base64url, no padding).
///
/// # Errors
///
/// Returns `InvalidKeyMaterial` if the value is not base64url or does not
/// decode to exactly 32 bytes.
pub fn decode_ed25519_public_key_jwk(x_b64url: &str) -> Result<Vec<u8>, JwtValidationError> {
    let bytes = URL_SAFE_NO_PAD.decode(x_b64url).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWK x value");
        JwtValidationError::InvalidKeyMaterial
    })?;

    if bytes.len() != ED25519_PUBLIC_KEY_LEN {
        tracing::debug!(
            target: "common.jwt",
            len = bytes.len(),
            "Ed25519 public key has unexpected length"
        );
        return Err(JwtValidationError::InvalidKeyMaterial);
    }

    Ok(bytes)
}

// =============================================================================
// Tests
// =============================================================================
