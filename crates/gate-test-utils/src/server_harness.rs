//! Test server harness for E2E testing
//!
//! Provides `TestGateServer` for spawning real Token Gate instances in tests.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use token_gate::auth::{JwksClient, TokenVerifier};
use token_gate::config::Config;
use token_gate::gate::Gate;
use token_gate::observability::metrics::init_metrics_recorder;
use token_gate::routes::{self, AppState};
use tokio::task::JoinHandle;

/// Global metrics handle for test servers
static TEST_METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn test_metrics_handle() -> PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| {
            // Only one recorder can be installed per process
            init_metrics_recorder()
                .unwrap_or_else(|_| PrometheusBuilder::new().build_recorder().handle())
        })
        .clone()
}

/// Test harness for spawning Token Gate in E2E tests
///
/// # Example
/// ```rust,ignore
/// let server = TestGateServer::spawn(&idp.issuer(), TEST_AUDIENCE, None).await?;
/// let response = reqwest::Client::new()
///     .post(format!("{}/v1/authorize", server.url()))
///     .json(&event)
///     .send()
///     .await?;
/// ```
pub struct TestGateServer {
    addr: SocketAddr,
    config: Config,
    _handle: JoinHandle<()>,
}

impl TestGateServer {
    /// Spawn a gate trusting `issuer` and `audience`.
    ///
    /// `jwks_url` overrides the location derived from the issuer.
    pub async fn spawn(
        issuer: &str,
        audience: &str,
        jwks_url: Option<&str>,
    ) -> Result<Self, anyhow::Error> {
        let mut vars = HashMap::from([
            ("AUTH_ISSUER".to_string(), issuer.to_string()),
            ("AUTH_AUDIENCE".to_string(), audience.to_string()),
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
        ]);
        if let Some(url) = jwks_url {
            vars.insert("AUTH_JWKS_URL".to_string(), url.to_string());
        }

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let jwks_client = Arc::new(JwksClient::with_settings(
            config.jwks_url.clone(),
            config.jwks_cache_ttl,
            config.jwks_cache_max_keys,
            config.jwks_fetch_timeout,
        ));
        let verifier = Arc::new(TokenVerifier::new(
            jwks_client,
            config.issuer.clone(),
            config.audience.clone(),
            config.jwt_leeway,
        ));
        let state = Arc::new(AppState {
            gate: Arc::new(Gate::new(verifier)),
        });

        let app = routes::build_routes(state, test_metrics_handle());

        let listener = tokio::net::TcpListener::bind(&config.bind_address)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            _handle: handle,
        })
    }

    /// Base URL of the running server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Configuration the server was started with
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for TestGateServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
