// SPDX-FileCopyrightText: 2026 policyd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Kubernetes ConfigMap backend over the API server's REST interface.
//!
//! A session reads the pod's service-account token and CA bundle and talks
//! to the API server directly: `GET` the ConfigMap, then `PUT` it back whole
//! with its `resourceVersion`, so a concurrent modification is rejected by
//! the server with 409 Conflict.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Certificate, Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};

use policyd_config::model::StoreConfig;
use policyd_core::{BackendSession, ConfigDocument, PolicyBackend, PolicydError};

const TOKEN_FILE: &str = "token";
const CA_FILE: &str = "ca.crt";

fn client_error(message: impl Into<String>) -> PolicydError {
    PolicydError::StoreClient {
        message: message.into(),
        source: None,
    }
}

fn update_error(message: impl Into<String>) -> PolicydError {
    PolicydError::StoreUpdate {
        message: message.into(),
        source: None,
    }
}

/// ConfigMap backend configuration.
#[derive(Debug, Clone)]
pub struct KubernetesBackend {
    api_server: Option<String>,
    service_account_dir: PathBuf,
    timeout: Duration,
}

impl KubernetesBackend {
    pub fn new(
        api_server: Option<String>,
        service_account_dir: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            api_server,
            service_account_dir: service_account_dir.into(),
            timeout,
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(
            config.api_server.clone(),
            config.service_account_dir.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// The API server base URL: the explicit override, else the in-cluster
    /// service address.
    fn base_url(&self) -> Result<String, PolicydError> {
        if let Some(url) = &self.api_server {
            return Ok(url.trim_end_matches('/').to_string());
        }
        let host = std::env::var("KUBERNETES_SERVICE_HOST")
            .map_err(|_| client_error("KUBERNETES_SERVICE_HOST is not set"))?;
        let port = std::env::var("KUBERNETES_SERVICE_PORT")
            .map_err(|_| client_error("KUBERNETES_SERVICE_PORT is not set"))?;
        if host.contains(':') {
            Ok(format!("https://[{host}]:{port}"))
        } else {
            Ok(format!("https://{host}:{port}"))
        }
    }
}

#[async_trait]
impl PolicyBackend for KubernetesBackend {
    fn name(&self) -> &str {
        "kubernetes"
    }

    async fn connect(&self) -> Result<Box<dyn BackendSession>, PolicydError> {
        let base_url = self.base_url()?;

        let token_path = self.service_account_dir.join(TOKEN_FILE);
        let token = tokio::fs::read_to_string(&token_path)
            .await
            .map_err(|e| PolicydError::StoreClient {
                message: format!("cannot read service account token {}", token_path.display()),
                source: Some(Box::new(e)),
            })?;

        let mut builder = Client::builder().timeout(self.timeout);

        let ca_path = self.service_account_dir.join(CA_FILE);
        match tokio::fs::read(&ca_path).await {
            Ok(pem) => {
                let certificate =
                    Certificate::from_pem(&pem).map_err(|e| PolicydError::StoreClient {
                        message: format!("invalid CA bundle {}", ca_path.display()),
                        source: Some(Box::new(e)),
                    })?;
                builder = builder.add_root_certificate(certificate);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %ca_path.display(), "no CA bundle, using default roots");
            }
            Err(e) => {
                return Err(PolicydError::StoreClient {
                    message: format!("cannot read CA bundle {}", ca_path.display()),
                    source: Some(Box::new(e)),
                });
            }
        }

        let client = builder.build().map_err(|e| PolicydError::StoreClient {
            message: "cannot build API client".to_string(),
            source: Some(Box::new(e)),
        })?;

        Ok(Box::new(KubernetesSession {
            client,
            base_url,
            token: SecretString::from(token.trim().to_string()),
        }))
    }
}

struct KubernetesSession {
    client: Client,
    base_url: String,
    token: SecretString,
}

impl KubernetesSession {
    fn url(&self, namespace: &str, name: &str) -> String {
        format!(
            "{}/api/v1/namespaces/{namespace}/configmaps/{name}",
            self.base_url
        )
    }
}

fn request_failed(action: &str, e: reqwest::Error) -> PolicydError {
    PolicydError::StoreUpdate {
        message: format!("{action} request failed"),
        source: Some(Box::new(e)),
    }
}

#[async_trait]
impl BackendSession for KubernetesSession {
    async fn fetch(&self, namespace: &str, name: &str) -> Result<ConfigDocument, PolicydError> {
        let response = self
            .client
            .get(self.url(namespace, name))
            .bearer_auth(self.token.expose_secret())
            .send()
            .await
            .map_err(|e| request_failed("get configmap", e))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => {
                return Err(update_error(format!(
                    "configmap {namespace}/{name} not found"
                )));
            }
            status => {
                return Err(update_error(format!(
                    "get configmap {namespace}/{name} returned {status}"
                )));
            }
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| request_failed("decode configmap", e))?;
        document_from_json(body)
    }

    async fn replace(
        &self,
        namespace: &str,
        name: &str,
        document: ConfigDocument,
    ) -> Result<(), PolicydError> {
        let response = self
            .client
            .put(self.url(namespace, name))
            .bearer_auth(self.token.expose_secret())
            .json(&document_to_json(document))
            .send()
            .await
            .map_err(|e| request_failed("put configmap", e))?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::CONFLICT => Err(update_error(format!(
                "configmap {namespace}/{name} was modified concurrently"
            ))),
            status => Err(update_error(format!(
                "put configmap {namespace}/{name} returned {status}"
            ))),
        }
    }
}

/// Split a ConfigMap object into its string `data` and everything else.
pub fn document_from_json(value: Value) -> Result<ConfigDocument, PolicydError> {
    let Value::Object(mut object) = value else {
        return Err(update_error("configmap is not a JSON object"));
    };

    let data: BTreeMap<String, String> = match object.remove("data") {
        None | Some(Value::Null) => BTreeMap::new(),
        Some(Value::Object(entries)) => entries
            .into_iter()
            .map(|(key, value)| match value {
                Value::String(s) => Ok((key, s)),
                _ => Err(update_error(format!("configmap data key {key} is not a string"))),
            })
            .collect::<Result<_, _>>()?,
        Some(_) => return Err(update_error("configmap data is not an object")),
    };

    Ok(ConfigDocument {
        data,
        extra: object,
    })
}

/// Reassemble a ConfigMap object, preserving metadata and other members.
pub fn document_to_json(document: ConfigDocument) -> Value {
    let mut object: Map<String, Value> = document.extra;
    let data = document
        .data
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();
    object.insert("data".to_string(), Value::Object(data));
    Value::Object(object)
}
