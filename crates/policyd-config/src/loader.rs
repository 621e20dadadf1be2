// SPDX-FileCopyrightText: 2026 policyd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Files: `/etc/policyd/policyd.toml` then `./policyd.toml`. Environment:
//! the deployment's unprefixed variables (`LISTENING_PORT`, `NAMESPACE`,
//! `CONFIGMAP_NAME`, `USERNAME`, `PASSWORD`, `JWT_SECRET`), then any
//! `POLICYD_*` variable.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::PolicydConfig;

/// System-wide config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/policyd/policyd.toml";

/// Config file in the working directory.
pub const LOCAL_CONFIG_PATH: &str = "policyd.toml";

/// Unprefixed environment variables and the keys they set.
pub const DEPLOYMENT_ENV: &[(&str, &str)] = &[
    ("LISTENING_PORT", "server.port"),
    ("NAMESPACE", "store.namespace"),
    ("CONFIGMAP_NAME", "store.document_name"),
    ("USERNAME", "auth.username"),
    ("PASSWORD", "auth.password"),
    ("JWT_SECRET", "auth.signing_key"),
];

/// Settings of string type.
///
/// `Env` parses every value as a TOML scalar, so `PASSWORD=0123` would
/// arrive as the integer 123. These keys are read from the environment
/// verbatim instead.
pub const STRING_KEYS: &[&str] = &[
    "server.host",
    "server.tls_cert_path",
    "server.tls_key_path",
    "store.backend",
    "store.namespace",
    "store.document_name",
    "store.data_key",
    "store.api_server",
    "store.service_account_dir",
    "auth.username",
    "auth.password",
    "auth.signing_key",
    "auth.issuer",
    "auth.audience",
    "observability.log_level",
];

/// Load configuration from the standard file locations with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/policyd/policyd.toml`
/// 3. `./policyd.toml`
/// 4. Deployment environment variables
/// 5. `POLICYD_*` environment variables
pub fn load_config() -> Result<PolicydConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no environment).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<PolicydConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PolicydConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<PolicydConfig, figment::Error> {
    merge_env(
        Figment::new()
            .merge(Serialized::defaults(PolicydConfig::default()))
            .merge(Toml::file(path)),
    )
    .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    merge_env(
        Figment::new()
            .merge(Serialized::defaults(PolicydConfig::default()))
            .merge(Toml::file(SYSTEM_CONFIG_PATH))
            .merge(Toml::file(LOCAL_CONFIG_PATH)),
    )
}

/// Environment variables that can set `key`, deployment name first.
pub fn env_names(key: &str) -> Vec<String> {
    DEPLOYMENT_ENV
        .iter()
        .filter(|(_, target)| *target == key)
        .map(|(name, _)| name.to_string())
        .chain(std::iter::once(prefixed_name(key)))
        .collect()
}

fn prefixed_name(key: &str) -> String {
    format!("POLICYD_{}", key.replace('.', "_").to_ascii_uppercase())
}

fn is_string_key(key: &str) -> bool {
    STRING_KEYS.contains(&key)
}

/// Layer the deployment variables, then the `POLICYD_*` variables, over `figment`.
fn merge_env(figment: Figment) -> Figment {
    let deployment_strings = DEPLOYMENT_ENV
        .iter()
        .filter(|(_, key)| is_string_key(key))
        .map(|(name, key)| (name.to_string(), *key));
    let prefixed_strings = STRING_KEYS.iter().map(|key| (prefixed_name(key), *key));

    let figment = verbatim_env(figment.merge(deployment_env_provider()), deployment_strings);
    verbatim_env(figment.merge(env_provider()), prefixed_strings)
}

/// Merge each set variable's raw text at its key.
fn verbatim_env<'a>(
    figment: Figment,
    vars: impl Iterator<Item = (String, &'a str)>,
) -> Figment {
    vars.fold(figment, |figment, (name, key)| match std::env::var(&name) {
        Ok(value) => figment.merge(Serialized::default(key, value)),
        Err(_) => figment,
    })
}

/// Provider for the non-string unprefixed variables (`LISTENING_PORT`).
fn deployment_env_provider() -> Env {
    let names: Vec<&str> = DEPLOYMENT_ENV
        .iter()
        .filter(|(_, key)| !is_string_key(key))
        .map(|(name, _)| *name)
        .collect();
    Env::raw().only(&names).map(|key| {
        let upper = key.as_str().to_ascii_uppercase();
        DEPLOYMENT_ENV
            .iter()
            .find(|(name, _)| *name == upper)
            .map(|(_, target)| target.to_string())
            .unwrap_or_else(|| key.as_str().to_string())
            .into()
    })
}

/// Create the `POLICYD_` environment provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `POLICYD_STORE_DOCUMENT_NAME` must map to
/// `store.document_name`, not `store.document.name`. String keys are left
/// to [`verbatim_env`]; unknown keys still pass through so they are
/// reported.
fn env_provider() -> Env {
    Env::prefixed("POLICYD_")
        .filter(|key| !is_string_key(&map_section_key(key.as_str())))
        .map(|key| map_section_key(key.as_str()).into())
}

fn map_section_key(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    for section in ["server", "store", "auth", "observability"] {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key
}
