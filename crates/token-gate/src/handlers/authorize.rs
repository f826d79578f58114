//! Authorization endpoint.
//!
//! Accepts an authorizer event as the raw request body and answers with a
//! policy document or a generic 401. The body is taken as bytes rather than
//! through the `Json` extractor so that an unparsable event is rejected with
//! the same 401 as every other failure.

use crate::decision::PolicyResponse;
use crate::errors::GateError;
use crate::routes::AppState;
use axum::{body::Bytes, extract::State, Json};
use std::sync::Arc;

/// Handler for POST /v1/authorize
///
/// # Response
///
/// - 200 OK with the policy document when the bearer token verifies
/// - 401 Unauthorized with `{"message":"Unauthorized"}` otherwise
#[tracing::instrument(skip_all, name = "gate.handlers.authorize")]
pub async fn authorize(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<PolicyResponse>, GateError> {
    let decision = state.gate.authorize_body(&body).await?;

    tracing::debug!(target: "gate.handlers", "Returning allow policy");
    Ok(Json(PolicyResponse::from(&decision)))
}
