//! Authorization decisions and the policy document they render to.
//!
//! A decision can only be built from verified [`Claims`], so an `Allow`
//! always carries the principal of a token that passed verification.

use crate::auth::{Claims, VerificationError};
use serde::Serialize;

/// Policy language version stamped on every document.
pub const POLICY_VERSION: &str = "2012-10-17";

/// Action granted by an `Allow` statement.
pub const INVOKE_ACTION: &str = "execute-api:Invoke";

/// Effect of a policy statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Effect {
    Allow,
    Deny,
}

/// Access decision for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationDecision {
    principal: String,
    effect: Effect,
    resource: String,
}

impl AuthorizationDecision {
    /// Grant `resource` to the subject of verified claims.
    pub fn allow(claims: &Claims, resource: impl Into<String>) -> Self {
        Self {
            principal: claims.subject().to_string(),
            effect: Effect::Allow,
            resource: resource.into(),
        }
    }

    /// Principal the decision is bound to (the token subject).
    pub fn principal(&self) -> &str {
        &self.principal
    }

    /// Effect granted; always `Allow` for a decision built from claims.
    pub fn effect(&self) -> Effect {
        self.effect
    }

    /// Resource the decision applies to, exactly as requested.
    pub fn resource(&self) -> &str {
        &self.resource
    }
}

/// Turn a verification outcome into a decision.
///
/// Verified claims become an `Allow` for `resource`. A verification error is
/// passed through unchanged as the rejection cause; no `Deny` document is
/// produced for it.
///
/// # Errors
///
/// Returns the verification error when `outcome` is an error.
pub fn build_decision(
    outcome: Result<Claims, VerificationError>,
    resource: &str,
) -> Result<AuthorizationDecision, VerificationError> {
    outcome.map(|claims| AuthorizationDecision::allow(&claims, resource))
}

/// One statement of a policy document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statement {
    #[serde(rename = "Action")]
    pub action: String,

    #[serde(rename = "Effect")]
    pub effect: Effect,

    #[serde(rename = "Resource")]
    pub resource: String,
}

/// Policy document carried in a [`PolicyResponse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyDocument {
    #[serde(rename = "Version")]
    pub version: String,

    #[serde(rename = "Statement")]
    pub statement: Vec<Statement>,
}

/// Response body returned to the caller for a granted request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyResponse {
    pub principal_id: String,
    pub policy_document: PolicyDocument,
}

impl From<&AuthorizationDecision> for PolicyResponse {
    fn from(decision: &AuthorizationDecision) -> Self {
        Self {
            principal_id: decision.principal.clone(),
            policy_document: PolicyDocument {
                version: POLICY_VERSION.to_string(),
                statement: vec![Statement {
                    action: INVOKE_ACTION.to_string(),
                    effect: decision.effect,
                    resource: decision.resource.clone(),
                }],
            },
        }
    }
}
