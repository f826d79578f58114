//! Gate orchestrator.
//!
//! Runs one authorization event through credential extraction, token
//! verification and decision building. Every failure branch collapses into
//! a [`Rejection`] whose display text is only `Unauthorized`; the specific
//! reason is logged here and counted in metrics, never returned to the caller.

use crate::auth::{extract_bearer, TokenVerifier, VerificationError};
use crate::decision::{build_decision, AuthorizationDecision};
use crate::observability::metrics;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Kind of authorization event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventKind {
    /// Bearer token carried in a single header value.
    Token,

    /// Whole-request authorization. Not supported.
    Request,

    #[serde(other)]
    Unknown,
}

/// Inbound authorization event.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizerEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,

    /// Raw authorization header value, when the caller sent one.
    #[serde(rename = "authorizationToken", default)]
    pub authorization_header: Option<String>,

    /// Resource the caller wants to reach, echoed into the decision.
    #[serde(rename = "methodArn")]
    pub requested_resource: String,
}

/// Why a request was rejected. Internal only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The event body did not parse as an authorization event, or names no
    /// resource.
    InvalidEvent,

    /// Event kind other than `TOKEN`.
    UnsupportedEventKind,

    /// No bearer credential in the authorization header.
    MissingCredential,

    /// The credential failed verification.
    Verification(VerificationError),
}

impl RejectReason {
    /// Stable label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            RejectReason::InvalidEvent => "invalid_event",
            RejectReason::UnsupportedEventKind => "unsupported_event_kind",
            RejectReason::MissingCredential => "missing_credential",
            RejectReason::Verification(err) => err.cause(),
        }
    }
}

/// Generic rejection returned for every failed authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    reason: RejectReason,
}

impl Rejection {
    fn new(reason: RejectReason) -> Self {
        Self { reason }
    }

    /// The specific reason, for operators and tests.
    pub fn reason(&self) -> &RejectReason {
        &self.reason
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Unauthorized")
    }
}

impl std::error::Error for Rejection {}

/// Authorization gate shared by all requests.
pub struct Gate {
    verifier: Arc<TokenVerifier>,
}

impl Gate {
    /// Create a gate around a shared verifier.
    pub fn new(verifier: Arc<TokenVerifier>) -> Self {
        Self { verifier }
    }

    /// Authorize a raw JSON event body.
    ///
    /// A body that does not parse as an [`AuthorizerEvent`] is rejected like
    /// any other failure.
    ///
    /// # Errors
    ///
    /// Returns a [`Rejection`] when the event is unparsable or not authorized.
    pub async fn authorize_body(&self, body: &[u8]) -> Result<AuthorizationDecision, Rejection> {
        let started = Instant::now();
        match serde_json::from_slice::<AuthorizerEvent>(body) {
            Ok(event) => self.authorize_event(&event, started).await,
            Err(e) => {
                tracing::debug!(target: "gate.orchestrator", error = %e, "Unparsable authorization event");
                Err(reject(RejectReason::InvalidEvent, started))
            }
        }
    }

    /// Authorize one event.
    ///
    /// # Errors
    ///
    /// Returns a [`Rejection`] when the event kind is unsupported, the
    /// credential is absent, or verification fails.
    pub async fn authorize(
        &self,
        event: &AuthorizerEvent,
    ) -> Result<AuthorizationDecision, Rejection> {
        self.authorize_event(event, Instant::now()).await
    }

    #[instrument(skip_all, fields(resource = %event.requested_resource))]
    async fn authorize_event(
        &self,
        event: &AuthorizerEvent,
        started: Instant,
    ) -> Result<AuthorizationDecision, Rejection> {
        if event.kind != EventKind::Token {
            return Err(reject(RejectReason::UnsupportedEventKind, started));
        }

        // A decision is always scoped to a concrete resource
        if event.requested_resource.is_empty() {
            return Err(reject(RejectReason::InvalidEvent, started));
        }

        let Some(token) = extract_bearer(event.authorization_header.as_deref()) else {
            return Err(reject(RejectReason::MissingCredential, started));
        };

        let outcome = self.verifier.verify(token).await;

        match build_decision(outcome, &event.requested_resource) {
            Ok(decision) => {
                metrics::record_allow(started.elapsed());
                tracing::info!(target: "gate.orchestrator", "Request authorized");
                Ok(decision)
            }
            Err(err) => Err(reject(RejectReason::Verification(err), started)),
        }
    }
}

fn reject(reason: RejectReason, started: Instant) -> Rejection {
    tracing::warn!(target: "gate.orchestrator", reason = reason.label(), "Request rejected");
    metrics::record_reject(reason.label(), started.elapsed());
    Rejection::new(reason)
}
