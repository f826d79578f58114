//! Token Gate
//!
//! Entry point for the bearer-token request authorizer.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use token_gate::auth::{JwksClient, TokenVerifier};
use token_gate::config::{Config, LogFormat};
use token_gate::gate::Gate;
use token_gate::observability::logging;
use token_gate::observability::metrics::init_metrics_recorder;
use token_gate::routes::{self, AppState};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Configuration is read before logging so LOG_FORMAT can pick the layer
    let config_result = Config::from_env();
    let json_logs = matches!(&config_result, Ok(c) if c.log_format == LogFormat::Json);

    tracing_subscriber::registry()
        .with(logging::env_filter())
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    info!("Starting Token Gate");

    let config = config_result.map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        issuer = %config.issuer,
        audience = %config.audience,
        jwks_url = %config.jwks_url,
        bind_address = %config.bind_address,
        jwks_cache_ttl_seconds = config.jwks_cache_ttl.as_secs(),
        jwks_cache_max_keys = config.jwks_cache_max_keys,
        jwt_leeway_seconds = config.jwt_leeway.as_secs(),
        "Configuration loaded successfully"
    );

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics recorder: {}", e);
        e
    })?;

    // One key cache for the whole process
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
    let gate = Arc::new(Gate::new(verifier));

    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    let state = Arc::new(AppState { gate });
    let app = routes::build_routes(state, metrics_handle);

    info!("Token Gate listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Token Gate shutdown complete");

    Ok(())
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
