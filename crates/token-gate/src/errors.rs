//! HTTP-facing error type for the gate.
//!
//! Every failure the gate can produce collapses into a single generic
//! rejection. The response body never carries the underlying cause; that is
//! logged server-side by the orchestrator before it reaches this type.

use crate::gate::Rejection;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Message returned to callers on every rejection path.
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized";

/// Gate error type.
///
/// Maps to HTTP status codes:
/// - Unauthorized: 401 Unauthorized
#[derive(Debug, Error)]
pub enum GateError {
    #[error("Unauthorized")]
    Unauthorized,
}

impl GateError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            GateError::Unauthorized => 401,
        }
    }
}

impl From<Rejection> for GateError {
    fn from(_: Rejection) -> Self {
        GateError::Unauthorized
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    message: &'static str,
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        match self {
            GateError::Unauthorized => {
                let mut response = (
                    StatusCode::UNAUTHORIZED,
                    Json(ErrorResponse {
                        message: UNAUTHORIZED_MESSAGE,
                    }),
                )
                    .into_response();

                response.headers_mut().insert(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static("Bearer realm=\"token-gate\""),
                );

                response
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn test_status_code_mapping() {
        assert_eq!(GateError::Unauthorized.status_code(), 401);
    }

    #[tokio::test]
    async fn test_unauthorized_response_is_generic() {
        let response = GateError::Unauthorized.into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer realm=\"token-gate\""
        );

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({"message": "Unauthorized"}));
    }
}
