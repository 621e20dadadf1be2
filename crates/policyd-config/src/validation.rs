// SPDX-FileCopyrightText: 2026 policyd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks that every setting the service cannot start without is present,
//! and that numeric limits are usable.

use crate::diagnostic::ConfigError;
use crate::model::{PolicydConfig, StoreBackend};

/// Minimum recommended HMAC key length in bytes.
const RECOMMENDED_SIGNING_KEY_LEN: usize = 32;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &PolicydConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.server.port == 0 {
        errors.push(ConfigError::missing("server.port"));
    }

    let required = [
        ("store.namespace", &config.store.namespace),
        ("store.document_name", &config.store.document_name),
        ("auth.username", &config.auth.username),
        ("auth.password", &config.auth.password),
        ("auth.signing_key", &config.auth.signing_key),
    ];
    for (key, value) in required {
        if value.trim().is_empty() {
            errors.push(ConfigError::missing(key));
        }
    }

    let host = config.server.host.trim();
    let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
    let is_valid_hostname = !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
    if !is_valid_ip && !is_valid_hostname {
        errors.push(ConfigError::Validation {
            message: format!("server.host `{host}` is not a valid IP address or hostname"),
        });
    }

    if config.server.max_body_bytes == 0 {
        errors.push(ConfigError::Validation {
            message: "server.max_body_bytes must be greater than zero".to_string(),
        });
    }

    // ConfigMap data keys: alphanumerics, '-', '_' and '.'.
    let data_key = &config.store.data_key;
    if data_key.is_empty()
        || !data_key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        errors.push(ConfigError::Validation {
            message: format!("store.data_key `{data_key}` is not a valid document key"),
        });
    }

    if config.store.timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "store.timeout_secs must be greater than zero".to_string(),
        });
    }

    if config.store.backend == StoreBackend::Kubernetes
        && let Some(api_server) = &config.store.api_server
        && !(api_server.starts_with("https://") || api_server.starts_with("http://"))
    {
        errors.push(ConfigError::Validation {
            message: format!("store.api_server `{api_server}` must be an http(s) URL"),
        });
    }

    if config.auth.token_ttl_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "auth.token_ttl_secs must be greater than zero".to_string(),
        });
    }

    if config.auth.cache_ttl_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "auth.cache_ttl_secs must be greater than zero".to_string(),
        });
    }

    if config.auth.cache_capacity == 0 {
        errors.push(ConfigError::Validation {
            message: "auth.cache_capacity must be greater than zero".to_string(),
        });
    }

    if !config.auth.signing_key.is_empty()
        && config.auth.signing_key.len() < RECOMMENDED_SIGNING_KEY_LEN
    {
        tracing::warn!(
            len = config.auth.signing_key.len(),
            "auth.signing_key is shorter than the recommended {RECOMMENDED_SIGNING_KEY_LEN} bytes"
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
