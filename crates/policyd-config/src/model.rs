// SPDX-FileCopyrightText: 2026 policyd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for policyd.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup. Values the service cannot run without (port,
//! store location, operator credentials, signing key) default to empty and
//! are rejected by [`crate::validation::validate_config`].

use serde::{Deserialize, Serialize};

/// Top-level policyd configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PolicydConfig {
    /// Listener and TLS settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// External configuration store settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Operator credentials, token signing, and verification cache settings.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Logging and metrics settings.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// HTTPS listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on. Required (`LISTENING_PORT`).
    #[serde(default)]
    pub port: u16,

    /// PEM certificate chain presented to clients.
    #[serde(default = "default_tls_cert_path")]
    pub tls_cert_path: String,

    /// PEM private key for the certificate.
    #[serde(default = "default_tls_key_path")]
    pub tls_key_path: String,

    /// Maximum accepted request body, in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: 0,
            tls_cert_path: default_tls_cert_path(),
            tls_key_path: default_tls_key_path(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_tls_cert_path() -> String {
    "/etc/ssl/certs/server.crt".to_string()
}

fn default_tls_key_path() -> String {
    "/etc/ssl/private/server.key".to_string()
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// Which external store backend to write policies to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Kubernetes ConfigMap via the in-cluster API server.
    #[default]
    Kubernetes,
    /// Process-local map, for development.
    Memory,
}

/// External configuration store settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Backend implementation.
    #[serde(default)]
    pub backend: StoreBackend,

    /// Namespace holding the policy document. Required (`NAMESPACE`).
    #[serde(default)]
    pub namespace: String,

    /// Name of the policy document. Required (`CONFIGMAP_NAME`).
    #[serde(default)]
    pub document_name: String,

    /// Key inside the document's data the policy is written under.
    #[serde(default = "default_data_key")]
    pub data_key: String,

    /// Deadline for one read-modify-write, in seconds.
    #[serde(default = "default_store_timeout_secs")]
    pub timeout_secs: u64,

    /// API server base URL. When unset, the in-cluster service address is used.
    #[serde(default)]
    pub api_server: Option<String>,

    /// Directory holding the service-account `token` and `ca.crt`.
    #[serde(default = "default_service_account_dir")]
    pub service_account_dir: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            namespace: String::new(),
            document_name: String::new(),
            data_key: default_data_key(),
            timeout_secs: default_store_timeout_secs(),
            api_server: None,
            service_account_dir: default_service_account_dir(),
        }
    }
}

fn default_data_key() -> String {
    "policy".to_string()
}

fn default_store_timeout_secs() -> u64 {
    10
}

fn default_service_account_dir() -> String {
    "/var/run/secrets/kubernetes.io/serviceaccount".to_string()
}

/// Authentication settings.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Operator username. Required (`USERNAME`).
    #[serde(default)]
    pub username: String,

    /// Operator password. Required (`PASSWORD`).
    #[serde(default)]
    pub password: String,

    /// HMAC key for signing bearer tokens. Required (`JWT_SECRET`).
    #[serde(default)]
    pub signing_key: String,

    /// `iss` claim of issued tokens.
    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// `aud` claim of issued tokens.
    #[serde(default = "default_audience")]
    pub audience: String,

    /// Lifetime of issued tokens, in seconds.
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,

    /// How long a verified credential stays cached, in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Maximum number of cached verifications.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            signing_key: String::new(),
            issuer: default_issuer(),
            audience: default_audience(),
            token_ttl_secs: default_token_ttl_secs(),
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("username", &self.username)
            .field("password", &redacted(&self.password))
            .field("signing_key", &redacted(&self.signing_key))
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .field("cache_capacity", &self.cache_capacity)
            .finish()
    }
}

fn redacted(value: &str) -> &'static str {
    if value.is_empty() { "<unset>" } else { "[redacted]" }
}

fn default_issuer() -> String {
    "auth-app".to_string()
}

fn default_audience() -> String {
    "any".to_string()
}

fn default_token_ttl_secs() -> u64 {
    300
}

fn default_cache_ttl_secs() -> u64 {
    600
}

fn default_cache_capacity() -> usize {
    1024
}

/// Logging and metrics configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ObservabilityConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Install the Prometheus recorder and serve `/metrics`.
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}
