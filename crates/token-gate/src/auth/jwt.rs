//! JWT verification against the issuer's published keys.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Only the algorithm bound to the resolved key is accepted
//! - The signature is verified before any claim is looked at
//! - `exp`, `iss` and `aud` are required; `nbf` is honoured when present
//! - Each failure carries a specific cause for logs; callers only ever see
//!   a generic rejection

use crate::auth::claims::{Claims, RawClaims};
use crate::auth::jwks::{KeyResolutionError, KeyResolver};
use common::jwt::decode_unverified_header;
use jsonwebtoken::{decode, errors::ErrorKind, Validation};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::instrument;

/// Why a token failed verification.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VerificationError {
    /// Not a structurally valid JWT (or too large, or missing `kid`/`exp`).
    #[error("token is malformed")]
    Malformed,

    /// No usable signing key for the token's `kid`.
    #[error("signing key unavailable: {0}")]
    KeyUnavailable(KeyResolutionError),

    /// Signature did not verify, or the algorithm does not match the key.
    #[error("signature verification failed")]
    BadSignature,

    /// `exp` is in the past.
    #[error("token has expired")]
    Expired,

    /// `nbf` is in the future.
    #[error("token is not yet valid")]
    NotYetValid,

    /// `iss` is missing or not the trusted issuer.
    #[error("issuer mismatch")]
    IssuerMismatch,

    /// `aud` is missing or does not include the expected audience.
    #[error("audience mismatch")]
    AudienceMismatch,

    /// The token verified but carries no subject.
    #[error("token has no subject")]
    MissingSubject,
}

impl VerificationError {
    /// Stable, low-cardinality label for logs and metrics.
    pub fn cause(&self) -> &'static str {
        match self {
            VerificationError::Malformed => "malformed",
            VerificationError::KeyUnavailable(_) => "key_unavailable",
            VerificationError::BadSignature => "bad_signature",
            VerificationError::Expired => "expired",
            VerificationError::NotYetValid => "not_yet_valid",
            VerificationError::IssuerMismatch => "issuer_mismatch",
            VerificationError::AudienceMismatch => "audience_mismatch",
            VerificationError::MissingSubject => "missing_subject",
        }
    }
}

impl From<&jsonwebtoken::errors::Error> for VerificationError {
    fn from(err: &jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidAlgorithmName
            | ErrorKind::Crypto(_) => VerificationError::BadSignature,
            ErrorKind::ExpiredSignature => VerificationError::Expired,
            ErrorKind::ImmatureSignature => VerificationError::NotYetValid,
            ErrorKind::InvalidIssuer => VerificationError::IssuerMismatch,
            ErrorKind::InvalidAudience => VerificationError::AudienceMismatch,
            ErrorKind::MissingRequiredClaim(claim) => match claim.as_str() {
                "iss" => VerificationError::IssuerMismatch,
                "aud" => VerificationError::AudienceMismatch,
                _ => VerificationError::Malformed,
            },
            ErrorKind::InvalidKeyFormat | ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidEcdsaKey => {
                VerificationError::KeyUnavailable(KeyResolutionError::MalformedKeySet(
                    err.to_string(),
                ))
            }
            _ => VerificationError::Malformed,
        }
    }
}

/// JWT verifier bound to one trusted issuer and audience.
pub struct TokenVerifier {
    /// Source of signing keys.
    key_resolver: Arc<dyn KeyResolver>,

    /// Exact `iss` value tokens must carry.
    issuer: String,

    /// Value that must appear in a token's `aud`.
    audience: String,

    /// Leeway for `exp`/`nbf`.
    leeway: Duration,
}

impl TokenVerifier {
    /// Create a new verifier.
    ///
    /// # Arguments
    ///
    /// * `key_resolver` - Resolves `kid` to signing keys (usually a shared `JwksClient`)
    /// * `issuer` - Trusted issuer
    /// * `audience` - Expected audience
    /// * `leeway` - Tolerance for `exp`/`nbf`
    pub fn new(
        key_resolver: Arc<dyn KeyResolver>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        leeway: Duration,
    ) -> Self {
        Self {
            key_resolver,
            issuer: issuer.into(),
            audience: audience.into(),
            leeway,
        }
    }

    /// Verify a raw bearer token and return its claims.
    ///
    /// # Steps
    ///
    /// 1. Decode the unverified header for `kid` (size-checked first)
    /// 2. Resolve the signing key
    /// 3. Verify the signature with the key's algorithm
    /// 4. Validate `exp`, `nbf`, `iss`, `aud`
    /// 5. Require a non-empty `sub`
    ///
    /// # Errors
    ///
    /// Returns the [`VerificationError`] for the first step that fails.
    #[instrument(skip_all)]
    pub async fn verify(&self, token: &str) -> Result<Claims, VerificationError> {
        let header = decode_unverified_header(token).map_err(|e| {
            tracing::debug!(target: "gate.auth.jwt", error = ?e, "Token header decode failed");
            VerificationError::Malformed
        })?;

        let key = self
            .key_resolver
            .resolve_key(&header.kid)
            .await
            .map_err(VerificationError::KeyUnavailable)?;

        let mut validation = Validation::new(key.algorithm());
        validation.leeway = self.leeway.as_secs();
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_audience(&[self.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);

        // jsonwebtoken checks the signature before it validates any claim
        let token_data = decode::<RawClaims>(token, key.decoding_key(), &validation).map_err(|e| {
            let error = VerificationError::from(&e);
            tracing::debug!(
                target: "gate.auth.jwt",
                kid = %header.kid,
                cause = error.cause(),
                error = %e,
                "Token verification failed"
            );
            error
        })?;

        // jsonwebtoken still accepts `exp == now - leeway`; expiry must be strictly later
        let now = i64::try_from(jsonwebtoken::get_current_timestamp()).unwrap_or(i64::MAX);
        let leeway = i64::try_from(self.leeway.as_secs()).unwrap_or(i64::MAX);
        if token_data
            .claims
            .exp
            .is_some_and(|exp| exp <= now.saturating_sub(leeway))
        {
            tracing::debug!(
                target: "gate.auth.jwt",
                kid = %header.kid,
                cause = VerificationError::Expired.cause(),
                "Token expires at the verification instant"
            );
            return Err(VerificationError::Expired);
        }

        let claims = Claims::from_validated(token_data.claims)?;

        tracing::debug!(target: "gate.auth.jwt", kid = %header.kid, "Token verified");
        Ok(claims)
    }
}
