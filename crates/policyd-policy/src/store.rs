// SPDX-FileCopyrightText: 2026 policyd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-modify-write application of a validated policy.

use std::sync::Arc;
use std::time::Duration;

use policyd_config::model::{StoreBackend, StoreConfig};
use policyd_core::{ConfigDocument, Policy, PolicyBackend, PolicydError};

use crate::kubernetes::KubernetesBackend;
use crate::memory::MemoryBackend;

/// Writes policies into a named document of an external store.
///
/// Each update acquires a fresh session, fetches the document, overwrites
/// the policy data key, and writes the whole document back. There is no
/// retry: a concurrent writer's change is either overwritten or surfaces as
/// an update failure from the backend.
#[derive(Clone)]
pub struct PolicyStore {
    backend: Arc<dyn PolicyBackend>,
    data_key: String,
    timeout: Duration,
}

impl PolicyStore {
    pub fn new(backend: Arc<dyn PolicyBackend>, data_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            backend,
            data_key: data_key.into(),
            timeout,
        }
    }

    /// Build the configured backend.
    ///
    /// The memory backend starts with an empty document at the configured
    /// namespace and name so it can be updated immediately.
    pub fn from_config(config: &StoreConfig) -> Self {
        let backend: Arc<dyn PolicyBackend> = match config.backend {
            StoreBackend::Kubernetes => Arc::new(KubernetesBackend::from_config(config)),
            StoreBackend::Memory => {
                let memory = MemoryBackend::new();
                memory.seed(
                    &config.namespace,
                    &config.document_name,
                    ConfigDocument::default(),
                );
                Arc::new(memory)
            }
        };
        Self::new(
            backend,
            config.data_key.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn data_key(&self) -> &str {
        &self.data_key
    }

    /// Apply `policy` to the document `name` in `namespace`.
    ///
    /// Fails with [`PolicydError::StoreClient`] if no session could be
    /// established, [`PolicydError::StoreUpdate`] if the fetch or write
    /// failed, and [`PolicydError::Timeout`] if the deadline passed.
    pub async fn update(
        &self,
        namespace: &str,
        name: &str,
        policy: &Policy,
    ) -> Result<(), PolicydError> {
        let result = tokio::time::timeout(self.timeout, self.apply(namespace, name, policy))
            .await
            .map_err(|_| PolicydError::Timeout {
                duration: self.timeout,
            })
            .and_then(|r| r);

        match &result {
            Ok(()) => tracing::info!(
                backend = self.backend.name(),
                namespace,
                name,
                key = %self.data_key,
                "policy updated"
            ),
            Err(e) => tracing::error!(
                backend = self.backend.name(),
                namespace,
                name,
                error = %e,
                "policy update failed"
            ),
        }
        result
    }

    async fn apply(&self, namespace: &str, name: &str, policy: &Policy) -> Result<(), PolicydError> {
        let session = self.backend.connect().await?;
        let mut document = session.fetch(namespace, name).await?;
        document
            .set_policy(&self.data_key, policy)
            .map_err(|e| PolicydError::StoreUpdate {
                message: "cannot serialize policy".to_string(),
                source: Some(Box::new(e)),
            })?;
        session.replace(namespace, name, document).await
    }
}

impl std::fmt::Debug for PolicyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyStore")
            .field("backend", &self.backend.name())
            .field("data_key", &self.data_key)
            .field("timeout", &self.timeout)
            .finish()
    }
}
