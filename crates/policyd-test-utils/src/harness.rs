// SPDX-FileCopyrightText: 2026 policyd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the full gateway router over an in-memory store
//! with fixed operator credentials and signing key. Requests are driven
//! through the router directly with `tower::ServiceExt::oneshot`, so no
//! socket or TLS setup is needed.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, header};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use http_body_util::BodyExt;
use tower::ServiceExt;

use policyd_auth::{Authenticator, TokenIssuer, TokenSettings};
use policyd_config::model::{PolicydConfig, StoreBackend};
use policyd_core::{ConfigDocument, Identity, Policy};
use policyd_gateway::{GatewayState, HealthState, PolicyTarget, build_router};
use policyd_policy::{MemoryBackend, PolicyStore, PolicyValidator};

pub const TEST_USERNAME: &str = "operator";
pub const TEST_PASSWORD: &str = "correct horse battery staple";
pub const TEST_SIGNING_KEY: &str = "policyd-test-signing-key-0123456789abcdef";
pub const TEST_NAMESPACE: &str = "icap-adaptation";
pub const TEST_DOCUMENT: &str = "policy-update";

/// The configuration every harness starts from.
pub fn test_config() -> PolicydConfig {
    let mut config = PolicydConfig::default();
    config.server.port = 8443;
    config.store.backend = StoreBackend::Memory;
    config.store.namespace = TEST_NAMESPACE.to_string();
    config.store.document_name = TEST_DOCUMENT.to_string();
    config.store.timeout_secs = 2;
    config.auth.username = TEST_USERNAME.to_string();
    config.auth.password = TEST_PASSWORD.to_string();
    config.auth.signing_key = TEST_SIGNING_KEY.to_string();
    config
}

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: PolicydConfig,
    seed_document: bool,
    metrics_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            config: test_config(),
            seed_document: true,
            metrics_render: None,
        }
    }

    /// Adjust the configuration before the harness is built.
    pub fn with_config(mut self, configure: impl FnOnce(&mut PolicydConfig)) -> Self {
        configure(&mut self.config);
        self
    }

    /// Leave the target document absent from the store.
    pub fn without_document(mut self) -> Self {
        self.seed_document = false;
        self
    }

    /// Serve `/metrics` from the given render function.
    pub fn with_metrics(mut self, render: Arc<dyn Fn() -> String + Send + Sync>) -> Self {
        self.metrics_render = Some(render);
        self
    }

    pub fn build(self) -> TestHarness {
        let config = self.config;
        let backend = MemoryBackend::new();
        if self.seed_document {
            backend.seed(
                &config.store.namespace,
                &config.store.document_name,
                ConfigDocument::default(),
            );
        }

        let settings = TokenSettings::from_config(&config.auth);
        let issuer = Arc::new(TokenIssuer::new(&settings));
        let authenticator = Authenticator::from_config(&config.auth);
        let store = PolicyStore::new(
            Arc::new(backend.clone()),
            config.store.data_key.clone(),
            Duration::from_secs(config.store.timeout_secs),
        );

        let state = GatewayState {
            authenticator: authenticator.clone(),
            issuer: issuer.clone(),
            validator: Arc::new(PolicyValidator::new(config.server.max_body_bytes)),
            store,
            target: Arc::new(PolicyTarget {
                namespace: config.store.namespace.clone(),
                name: config.store.document_name.clone(),
            }),
            health: HealthState::new(self.metrics_render),
        };

        TestHarness {
            router: build_router(state),
            backend,
            issuer,
            authenticator,
            config,
        }
    }
}

/// A fully wired gateway over an in-memory store.
pub struct TestHarness {
    router: Router,
    backend: MemoryBackend,
    issuer: Arc<TokenIssuer>,
    authenticator: Authenticator,
    config: PolicydConfig,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn backend(&self) -> &MemoryBackend {
        &self.backend
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    pub fn config(&self) -> &PolicydConfig {
        &self.config
    }

    /// A valid bearer token for the operator.
    pub fn token(&self) -> String {
        self.issuer
            .issue(&Identity::new(TEST_USERNAME))
            .expect("test token signs")
    }

    /// The policy currently stored in the target document.
    pub fn stored_policy(&self) -> Option<Policy> {
        self.backend
            .get(&self.config.store.namespace, &self.config.store.document_name)
            .and_then(|doc| doc.policy(&self.config.store.data_key))
    }

    /// Send a request through the router.
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// `Authorization` header value for Basic credentials.
pub fn basic_auth(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

/// `Authorization` header value for a bearer token.
pub fn bearer_auth(token: &str) -> String {
    format!("Bearer {token}")
}

/// A JSON `PUT` to the policy route with the given authorization.
pub fn policy_request(authorization: Option<&str>, body: impl Into<Body>) -> Request<Body> {
    let mut builder = Request::put(policyd_gateway::POLICY_PATH)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(body.into()).expect("valid request")
}

/// A `GET` to the token route with the given authorization.
pub fn token_request(authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(policyd_gateway::TOKEN_PATH);
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::empty()).expect("valid request")
}

/// Collect a response body as UTF-8 text.
pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body collects")
        .to_bytes();
    String::from_utf8_lossy(&bytes).into_owned()
}
