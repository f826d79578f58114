//! Mocked identity provider JWKS endpoint
//!
//! Serves `/.well-known/jwks.json` from a wiremock server so tests can point
//! the gate at a real HTTP key set.

use crate::crypto_fixtures::TestKeypair;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the gate derives from the issuer.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// Identity provider stand-in.
///
/// # Example
/// ```rust,ignore
/// let keypair = TestKeypair::new(1, "key-01");
/// let idp = MockJwksServer::start(&[&keypair]).await;
/// let server = TestGateServer::spawn(&idp.issuer(), TEST_AUDIENCE, None).await?;
/// ```
pub struct MockJwksServer {
    server: MockServer,
}

impl MockJwksServer {
    /// Serve a key set containing `keys`.
    pub async fn start(keys: &[&TestKeypair]) -> Self {
        let jwks = jwks_document(keys);
        Self::start_with_body(ResponseTemplate::new(200).set_body_json(jwks), None).await
    }

    /// Serve a key set and require exactly `times` fetches.
    ///
    /// Verified when the server is dropped.
    pub async fn start_expecting(keys: &[&TestKeypair], times: u64) -> Self {
        let jwks = jwks_document(keys);
        Self::start_with_body(ResponseTemplate::new(200).set_body_json(jwks), Some(times)).await
    }

    /// Serve an arbitrary response on the JWKS path (errors, malformed bodies).
    pub async fn start_with_response(response: ResponseTemplate) -> Self {
        Self::start_with_body(response, None).await
    }

    async fn start_with_body(response: ResponseTemplate, expected: Option<u64>) -> Self {
        let server = MockServer::start().await;

        let mock = Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(response);
        let mock = match expected {
            Some(times) => mock.expect(times),
            None => mock,
        };
        mock.mount(&server).await;

        Self { server }
    }

    /// Replace the published key set, as an identity provider does on rotation.
    ///
    /// Clears recorded requests and any fetch expectation.
    pub async fn rotate_to(&self, keys: &[&TestKeypair]) {
        self.server.reset().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_document(keys)))
            .mount(&self.server)
            .await;
    }

    /// Issuer URL whose derived JWKS location is this server.
    pub fn issuer(&self) -> String {
        format!("{}/", self.server.uri())
    }

    /// Full JWKS URL.
    pub fn jwks_url(&self) -> String {
        format!("{}{}", self.server.uri(), JWKS_PATH)
    }

    /// Number of JWKS requests served so far.
    pub async fn fetch_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or(0)
    }
}

/// JWKS document for `keys`.
pub fn jwks_document(keys: &[&TestKeypair]) -> serde_json::Value {
    serde_json::json!({
        "keys": keys.iter().map(|k| k.jwk_json()).collect::<Vec<_>>()
    })
}
