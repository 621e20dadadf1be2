// SPDX-FileCopyrightText: 2026 policyd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `policyd serve` command implementation.
//!
//! Wires the authenticator, token issuer, validator and store into the
//! gateway and serves HTTPS until SIGINT or SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use axum_server::Handle;
use tracing::{info, warn};

use policyd_auth::{Authenticator, TokenIssuer, TokenSettings};
use policyd_config::PolicydConfig;
use policyd_core::PolicydError;
use policyd_gateway::{GatewayState, HealthState, PolicyTarget, shutdown_signal, start_server};
use policyd_policy::{PolicyStore, PolicyValidator};
use policyd_prometheus::PrometheusAdapter;

/// In-flight requests get this long to finish after a shutdown signal.
const GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Runs the `policyd serve` command.
pub async fn run_serve(config: PolicydConfig) -> Result<(), PolicydError> {
    init_tracing(&config.observability.log_level);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.server.port,
        "starting policyd serve"
    );

    let prometheus_render = if config.observability.metrics_enabled {
        match PrometheusAdapter::new() {
            Ok(adapter) => {
                info!("prometheus metrics enabled");
                let render: Arc<dyn Fn() -> String + Send + Sync> =
                    Arc::new(move || adapter.render());
                Some(render)
            }
            Err(e) => {
                warn!(error = %e, "prometheus initialization failed, continuing without metrics");
                None
            }
        }
    } else {
        None
    };

    let store = PolicyStore::from_config(&config.store);
    info!(
        backend = store.backend_name(),
        namespace = %config.store.namespace,
        name = %config.store.document_name,
        "policy store configured"
    );

    let state = GatewayState {
        authenticator: Authenticator::from_config(&config.auth),
        issuer: Arc::new(TokenIssuer::new(&TokenSettings::from_config(&config.auth))),
        validator: Arc::new(PolicyValidator::new(config.server.max_body_bytes)),
        store,
        target: Arc::new(PolicyTarget {
            namespace: config.store.namespace.clone(),
            name: config.store.document_name.clone(),
        }),
        health: HealthState::new(prometheus_render),
    };

    let handle = Handle::new();
    let shutdown = handle.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.graceful_shutdown(Some(GRACE_PERIOD));
    });

    start_server(&config.server, state, handle).await?;

    info!("policyd serve shutdown complete");
    Ok(())
}

/// Initialize the tracing subscriber. `RUST_LOG` overrides the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "policyd={log_level},policyd_gateway={log_level},policyd_auth={log_level},\
             policyd_policy={log_level},warn"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
