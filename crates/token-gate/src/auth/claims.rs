//! JWT claims structures.
//!
//! [`RawClaims`] is the shape `jsonwebtoken` deserializes a payload into.
//! [`Claims`] is what callers see: it can only be built by the verifier
//! after signature and claims validation have passed, and its subject is
//! guaranteed non-empty. The `sub` field is redacted in Debug output.

use crate::auth::jwt::VerificationError;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;

/// `aud` may be a single string or an array of strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Many(Vec<String>),
}

impl Audience {
    fn into_vec(self) -> Vec<String> {
        match self {
            Audience::Single(aud) => vec![aud],
            Audience::Many(auds) => auds,
        }
    }
}

/// Token payload as decoded, before the subject requirement is applied.
///
/// Registered claims are optional here so that a missing claim surfaces as
/// a validation failure from `jsonwebtoken` rather than a parse error.
#[derive(Debug, Deserialize)]
pub(crate) struct RawClaims {
    #[serde(default)]
    pub sub: Option<String>,

    #[serde(default)]
    pub iss: Option<String>,

    #[serde(default)]
    pub aud: Option<Audience>,

    #[serde(default)]
    pub exp: Option<i64>,

    #[serde(default)]
    pub iat: Option<i64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Verified token claims.
#[derive(Clone, PartialEq)]
pub struct Claims {
    sub: String,
    iss: String,
    aud: Vec<String>,
    exp: i64,
    iat: Option<i64>,
    extra: Map<String, Value>,
}

/// Custom Debug implementation that redacts the `sub` field.
impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("sub", &"[REDACTED]")
            .field("iss", &self.iss)
            .field("aud", &self.aud)
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .field("extra", &self.extra.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Claims {
    /// Promote validated raw claims, enforcing a non-empty subject.
    ///
    /// Only called after `jsonwebtoken` has verified the signature and the
    /// `exp`/`iss`/`aud` claims.
    pub(crate) fn from_validated(raw: RawClaims) -> Result<Self, VerificationError> {
        let sub = raw
            .sub
            .filter(|s| !s.is_empty())
            .ok_or(VerificationError::MissingSubject)?;
        let iss = raw.iss.ok_or(VerificationError::IssuerMismatch)?;
        let aud = raw
            .aud
            .map(Audience::into_vec)
            .ok_or(VerificationError::AudienceMismatch)?;
        let exp = raw.exp.ok_or(VerificationError::Malformed)?;

        Ok(Self {
            sub,
            iss,
            aud,
            exp,
            iat: raw.iat,
            extra: raw.extra,
        })
    }

    /// Subject (the principal the decision is bound to).
    pub fn subject(&self) -> &str {
        &self.sub
    }

    /// Issuer.
    pub fn issuer(&self) -> &str {
        &self.iss
    }

    /// Audiences the token was issued for.
    pub fn audience(&self) -> &[String] {
        &self.aud
    }

    /// Expiration timestamp (Unix epoch seconds).
    pub fn expires_at(&self) -> i64 {
        self.exp
    }

    /// Issued-at timestamp, when present.
    pub fn issued_at(&self) -> Option<i64> {
        self.iat
    }

    /// Any claim other than the registered ones above.
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.extra.get(name)
    }
}
