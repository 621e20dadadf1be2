// SPDX-FileCopyrightText: 2026 policyd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the policyd configuration system.

use figment::Jail;
use policyd_config::diagnostic::ConfigError;
use policyd_config::model::{PolicydConfig, StoreBackend};
use policyd_config::{load_and_validate_str, load_config, load_config_from_str};

const COMPLETE: &str = r#"
[server]
port = 8443

[store]
namespace = "icap-adaptation"
document_name = "policy-update"

[auth]
username = "operator"
password = "hunter2"
signing_key = "0123456789abcdef0123456789abcdef"
"#;

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_policyd_config() {
    let toml = r#"
[server]
host = "127.0.0.1"
port = 9443
tls_cert_path = "/tmp/tls.crt"
tls_key_path = "/tmp/tls.key"
max_body_bytes = 2048

[store]
backend = "memory"
namespace = "ns"
document_name = "doc"
data_key = "policy.json"
timeout_secs = 3

[auth]
username = "op"
password = "pw"
signing_key = "key"
issuer = "policyd"
audience = "icap"
token_ttl_secs = 60
cache_ttl_secs = 30
cache_capacity = 16

[observability]
log_level = "debug"
metrics_enabled = false
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 9443);
    assert_eq!(config.server.tls_cert_path, "/tmp/tls.crt");
    assert_eq!(config.server.max_body_bytes, 2048);
    assert_eq!(config.store.backend, StoreBackend::Memory);
    assert_eq!(config.store.data_key, "policy.json");
    assert_eq!(config.store.timeout_secs, 3);
    assert_eq!(config.auth.issuer, "policyd");
    assert_eq!(config.auth.audience, "icap");
    assert_eq!(config.auth.token_ttl_secs, 60);
    assert_eq!(config.auth.cache_capacity, 16);
    assert_eq!(config.observability.log_level, "debug");
    assert!(!config.observability.metrics_enabled);
}

/// Defaults match the deployment's conventional paths and limits.
#[test]
fn serialized_defaults_are_sensible() {
    let config = PolicydConfig::default();

    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.tls_cert_path, "/etc/ssl/certs/server.crt");
    assert_eq!(config.server.tls_key_path, "/etc/ssl/private/server.key");
    assert_eq!(config.server.max_body_bytes, 1_048_576);
    assert_eq!(config.store.backend, StoreBackend::Kubernetes);
    assert_eq!(config.auth.issuer, "auth-app");
    assert_eq!(config.auth.audience, "any");
    assert_eq!(config.auth.token_ttl_secs, 300);
    assert_eq!(config.auth.cache_ttl_secs, 600);
    assert_eq!(config.observability.log_level, "info");
}

/// Unknown field in [store] section produces an UnknownKey diagnostic with a suggestion.
#[test]
fn unknown_field_in_store_suggests_correction() {
    let toml = r#"
[store]
namspace = "icap"
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce errors");
    let has_unknown_key = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, valid_keys, .. } if {
            key == "store.namspace"
                && suggestion.as_deref() == Some("namespace")
                && valid_keys.contains("document_name")
        })
    });
    assert!(
        has_unknown_key,
        "should have UnknownKey error for 'namspace', got: {errors:?}"
    );
}

/// Unknown top-level section is rejected.
#[test]
fn deny_unknown_fields_at_top_level() {
    let toml = r#"
[webhook]
url = "x"
"#;
    let err = load_config_from_str(toml).expect_err("should reject unknown section");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("webhook"),
        "error should mention unknown field, got: {err_str}"
    );
}

/// Invalid type (string where number expected) produces a clear message.
#[test]
fn invalid_port_type_is_reported() {
    let toml = r#"
[server]
port = "not_a_number"
"#;

    let err = load_config_from_str(toml).expect_err("should reject invalid type");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("invalid type") || err_str.contains("port"),
        "error should mention type mismatch, got: {err_str}"
    );
}

/// Complete TOML validates.
#[test]
fn load_and_validate_complete_toml() {
    let config = load_and_validate_str(COMPLETE).expect("complete TOML should validate");
    assert_eq!(config.server.port, 8443);
    assert_eq!(config.store.namespace, "icap-adaptation");
}

/// Missing required settings are all reported at once.
#[test]
fn load_and_validate_reports_all_missing_settings() {
    let errors = load_and_validate_str("").expect_err("empty config must not validate");
    let missing: Vec<_> = errors
        .iter()
        .filter_map(|e| match e {
            ConfigError::MissingKey { key, .. } => Some(key.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(missing.len(), 6, "got: {missing:?}");
}

/// ConfigError can be rendered using miette's graphical handler.
#[test]
fn config_error_renders_with_miette() {
    use miette::GraphicalReportHandler;

    let error = ConfigError::missing("store.namespace");

    let handler = GraphicalReportHandler::new();
    let mut buf = String::new();
    handler
        .render_report(&mut buf, &error)
        .expect("should render without error");
    assert!(buf.contains("store.namespace"));
    assert!(buf.contains("POLICYD_STORE_NAMESPACE"));
}

/// A misspelled backend name suggests the closest backend.
#[test]
fn unknown_backend_suggests_closest() {
    let errors = load_and_validate_str("[store]\nbackend = \"memroy\"\n")
        .expect_err("unknown backend must not load");
    assert!(
        errors.iter().any(|e| matches!(
            e,
            ConfigError::UnknownValue { key, value, suggestion, .. }
                if key == "store.backend" && value == "memroy" && suggestion.as_deref() == Some("memory")
        )),
        "got: {errors:?}"
    );
}

/// A bad port from the environment names the variables to check.
#[test]
fn invalid_env_port_names_variables() {
    Jail::expect_with(|jail| {
        jail.set_env("LISTENING_PORT", "https");
        let errors = policyd_config::load_and_validate().expect_err("port must be numeric");
        let hint = errors
            .iter()
            .find_map(|e| match e {
                ConfigError::InvalidType { key, hint, .. } if key == "server.port" => {
                    Some(hint.clone())
                }
                _ => None,
            })
            .unwrap_or_else(|| panic!("no invalid type error in {errors:?}"));
        assert!(hint.contains("LISTENING_PORT"), "{hint}");
        assert!(hint.contains("POLICYD_SERVER_PORT"), "{hint}");
        Ok(())
    });
}

/// The deployment's unprefixed environment variables configure the service.
#[test]
fn deployment_env_vars_populate_required_settings() {
    Jail::expect_with(|jail| {
        jail.set_env("LISTENING_PORT", "8443");
        jail.set_env("NAMESPACE", "icap-adaptation");
        jail.set_env("CONFIGMAP_NAME", "policy-update");
        jail.set_env("USERNAME", "operator");
        jail.set_env("PASSWORD", "123456");
        jail.set_env("JWT_SECRET", "from-env-signing-key");

        let config = load_config()?;
        assert_eq!(config.server.port, 8443);
        assert_eq!(config.store.namespace, "icap-adaptation");
        assert_eq!(config.store.document_name, "policy-update");
        assert_eq!(config.auth.username, "operator");
        assert_eq!(config.auth.password, "123456");
        assert_eq!(config.auth.signing_key, "from-env-signing-key");
        Ok(())
    });
}

/// `POLICYD_*` variables override files and deployment variables.
#[test]
fn prefixed_env_overrides_file_and_deployment_env() {
    Jail::expect_with(|jail| {
        jail.create_file("policyd.toml", COMPLETE)?;
        jail.set_env("NAMESPACE", "from-deployment-env");
        jail.set_env("POLICYD_STORE_NAMESPACE", "from-prefixed-env");
        jail.set_env("POLICYD_STORE_DOCUMENT_NAME", "doc-from-env");
        jail.set_env("POLICYD_AUTH_CACHE_CAPACITY", "32");

        let config = load_config()?;
        assert_eq!(config.store.namespace, "from-prefixed-env");
        assert_eq!(config.store.document_name, "doc-from-env");
        assert_eq!(config.auth.cache_capacity, 32);
        assert_eq!(config.server.port, 8443);
        Ok(())
    });
}

/// A local `policyd.toml` is picked up from the working directory.
#[test]
fn local_config_file_is_loaded() {
    Jail::expect_with(|jail| {
        jail.create_file("policyd.toml", COMPLETE)?;
        let config = load_config()?;
        assert_eq!(config.store.document_name, "policy-update");
        Ok(())
    });
}

/// String settings keep their exact text even when it looks numeric.
#[test]
fn numeric_looking_strings_are_read_verbatim() {
    Jail::expect_with(|jail| {
        jail.set_env("LISTENING_PORT", "8443");
        jail.set_env("USERNAME", "007");
        jail.set_env("PASSWORD", "0123");
        jail.set_env("JWT_SECRET", "1.50");
        jail.set_env("NAMESPACE", "0x10");
        jail.set_env("CONFIGMAP_NAME", "true");
        jail.set_env("POLICYD_AUTH_ISSUER", "1e3");

        let config = load_config()?;
        assert_eq!(config.server.port, 8443);
        assert_eq!(config.auth.username, "007");
        assert_eq!(config.auth.password, "0123");
        assert_eq!(config.auth.signing_key, "1.50");
        assert_eq!(config.store.namespace, "0x10");
        assert_eq!(config.store.document_name, "true");
        assert_eq!(config.auth.issuer, "1e3");
        Ok(())
    });
}

/// A prefixed string variable still overrides its deployment counterpart.
#[test]
fn prefixed_password_overrides_deployment_password() {
    Jail::expect_with(|jail| {
        jail.set_env("PASSWORD", "0001");
        jail.set_env("POLICYD_AUTH_PASSWORD", "0002");

        let config = load_config()?;
        assert_eq!(config.auth.password, "0002");
        Ok(())
    });
}

/// A misspelled prefixed variable is still rejected.
#[test]
fn unknown_prefixed_variable_is_rejected() {
    Jail::expect_with(|jail| {
        jail.set_env("POLICYD_STORE_NAMSPACE", "icap");
        assert!(load_config().is_err());
        Ok(())
    });
}
