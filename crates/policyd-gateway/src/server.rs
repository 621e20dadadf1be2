// SPDX-FileCopyrightText: 2026 policyd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTPS server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, put},
};
use axum_server::Handle;
use axum_server::tls_rustls::RustlsConfig;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use policyd_auth::{Authenticator, TokenIssuer, VerificationCache};
use policyd_config::model::ServerConfig;
use policyd_core::{PolicydError, Scheme};
use policyd_policy::{PolicyStore, PolicyValidator};

use crate::auth::{AuthGate, auth_middleware};
use crate::handlers;

pub const TOKEN_PATH: &str = "/api/v1/auth/token";
pub const POLICY_PATH: &str = "/api/v1/policy";

/// Health state for unauthenticated health/metrics endpoints.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: Instant,
    /// Optional Prometheus metrics render function.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
}

impl HealthState {
    pub fn new(prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>) -> Self {
        Self {
            start_time: Instant::now(),
            prometheus_render,
        }
    }
}

/// The document policy updates are written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyTarget {
    pub namespace: String,
    pub name: String,
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub authenticator: Authenticator,
    pub issuer: Arc<TokenIssuer>,
    pub validator: Arc<PolicyValidator>,
    pub store: PolicyStore,
    pub target: Arc<PolicyTarget>,
    pub health: HealthState,
}

/// Build the application router.
///
/// - GET/OPTIONS /api/v1/auth/token (Basic auth)
/// - PUT/OPTIONS /api/v1/policy (Bearer auth)
/// - GET /health, GET /metrics (no auth)
pub fn build_router(state: GatewayState) -> Router {
    // Unauthenticated public routes (health + metrics for probes and Prometheus).
    let public_routes = Router::new()
        .route("/health", get(handlers::get_public_health))
        .route("/metrics", get(handlers::get_public_metrics))
        .with_state(state.clone());

    let token_routes = Router::new()
        .route(
            TOKEN_PATH,
            get(handlers::issue_token).options(handlers::preflight),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            AuthGate::new(state.authenticator.clone(), &[Scheme::Basic]),
            auth_middleware,
        ))
        .with_state(state.clone());

    let policy_routes = Router::new()
        .route(
            POLICY_PATH,
            put(handlers::update_policy).options(handlers::preflight),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            AuthGate::new(state.authenticator.clone(), &[Scheme::Bearer]),
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(token_routes)
        .merge(policy_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Periodically drop expired entries from the verification cache.
pub fn spawn_cache_sweeper(
    cache: Arc<VerificationCache>,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let purged = cache.purge_expired().await;
            if purged > 0 {
                tracing::debug!(purged, "expired verification cache entries removed");
            }
        }
    })
}

/// Start the HTTPS server and run until `handle` is shut down.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    handle: Handle,
) -> Result<(), PolicydError> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| PolicydError::Config(format!("invalid listen address: {e}")))?;

    let tls = RustlsConfig::from_pem_file(&config.tls_cert_path, &config.tls_key_path)
        .await
        .map_err(|e| {
            PolicydError::Config(format!(
                "failed to load TLS certificate {} / key {}: {e}",
                config.tls_cert_path, config.tls_key_path
            ))
        })?;

    let sweeper = spawn_cache_sweeper(
        state.authenticator.cache().clone(),
        state.authenticator.cache().ttl(),
    );
    let app = build_router(state);

    tracing::info!(%addr, "policyd listening (TLS)");

    let result = axum_server::bind_rustls(addr, tls)
        .handle(handle)
        .serve(app.into_make_service())
        .await
        .map_err(|e| PolicydError::Internal(format!("server error: {e}")));

    sweeper.abort();
    result
}

/// Resolve when the process receives Ctrl-C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use policyd_auth::TokenSettings;
    use policyd_config::model::AuthConfig;
    use policyd_policy::MemoryBackend;

    #[test]
    fn gateway_state_is_clone() {
        let auth = AuthConfig {
            username: "u".into(),
            password: "p".into(),
            signing_key: "k".into(),
            ..AuthConfig::default()
        };
        let state = GatewayState {
            authenticator: Authenticator::from_config(&auth),
            issuer: Arc::new(TokenIssuer::new(&TokenSettings::from_config(&auth))),
            validator: Arc::new(PolicyValidator::default()),
            store: PolicyStore::new(
                Arc::new(MemoryBackend::new()),
                "policy",
                Duration::from_secs(1),
            ),
            target: Arc::new(PolicyTarget {
                namespace: "ns".into(),
                name: "doc".into(),
            }),
            health: HealthState::new(None),
        };
        let _cloned = state.clone();
        let _router = build_router(state);
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_purges_expired_entries() {
        let cache = Arc::new(VerificationCache::new(Duration::from_secs(5), 8));
        cache
            .insert("k".into(), policyd_core::Identity::new("op"))
            .await;
        let sweeper = spawn_cache_sweeper(cache.clone(), Duration::from_secs(1));

        tokio::time::sleep(Duration::from_secs(7)).await;
        assert!(cache.is_empty().await);
        sweeper.abort();
    }
}
