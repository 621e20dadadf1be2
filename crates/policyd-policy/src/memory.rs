// SPDX-FileCopyrightText: 2026 policyd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-local policy backend for development and tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use policyd_core::{BackendSession, ConfigDocument, PolicyBackend, PolicydError};

/// Where an injected fault fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPoint {
    Connect,
    Fetch,
    Replace,
}

type DocumentKey = (String, String);

#[derive(Default)]
struct MemoryState {
    documents: HashMap<DocumentKey, ConfigDocument>,
    fault: Option<FaultPoint>,
    latency: Duration,
    writes: usize,
}

/// In-memory documents keyed by namespace and name.
///
/// Documents must be seeded before they can be updated; fetching an absent
/// document fails like the Kubernetes backend does. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn seed(&self, namespace: &str, name: &str, document: ConfigDocument) {
        self.lock()
            .documents
            .insert((namespace.to_string(), name.to_string()), document);
    }

    pub fn get(&self, namespace: &str, name: &str) -> Option<ConfigDocument> {
        self.lock()
            .documents
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Number of successful replacements so far.
    pub fn writes(&self) -> usize {
        self.lock().writes
    }

    /// Make every subsequent operation at `point` fail. `None` clears it.
    pub fn inject_fault(&self, point: Option<FaultPoint>) {
        self.lock().fault = point;
    }

    /// Delay every fetch and replace by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = latency;
    }

    fn check_fault(&self, point: FaultPoint) -> Result<(), PolicydError> {
        if self.lock().fault != Some(point) {
            return Ok(());
        }
        let message = format!("injected {point:?} failure");
        Err(match point {
            FaultPoint::Connect => PolicydError::StoreClient {
                message,
                source: None,
            },
            FaultPoint::Fetch | FaultPoint::Replace => PolicydError::StoreUpdate {
                message,
                source: None,
            },
        })
    }

    async fn delay(&self) {
        let latency = self.lock().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("MemoryBackend")
            .field("documents", &state.documents.len())
            .field("fault", &state.fault)
            .finish()
    }
}

#[async_trait]
impl PolicyBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn connect(&self) -> Result<Box<dyn BackendSession>, PolicydError> {
        self.check_fault(FaultPoint::Connect)?;
        Ok(Box::new(MemorySession {
            backend: self.clone(),
        }))
    }
}

struct MemorySession {
    backend: MemoryBackend,
}

#[async_trait]
impl BackendSession for MemorySession {
    async fn fetch(&self, namespace: &str, name: &str) -> Result<ConfigDocument, PolicydError> {
        self.backend.delay().await;
        self.backend.check_fault(FaultPoint::Fetch)?;
        self.backend
            .get(namespace, name)
            .ok_or_else(|| PolicydError::StoreUpdate {
                message: format!("document {namespace}/{name} not found"),
                source: None,
            })
    }

    async fn replace(
        &self,
        namespace: &str,
        name: &str,
        document: ConfigDocument,
    ) -> Result<(), PolicydError> {
        self.backend.delay().await;
        self.backend.check_fault(FaultPoint::Replace)?;
        let mut state = self.backend.lock();
        let key = (namespace.to_string(), name.to_string());
        if !state.documents.contains_key(&key) {
            return Err(PolicydError::StoreUpdate {
                message: format!("document {namespace}/{name} not found"),
                source: None,
            });
        }
        state.documents.insert(key, document);
        state.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fetch_of_unseeded_document_fails() {
        let backend = MemoryBackend::new();
        let session = backend.connect().await.unwrap();
        let err = session.fetch("ns", "missing").await.unwrap_err();
        assert!(matches!(err, PolicydError::StoreUpdate { .. }));
    }

    #[tokio::test]
    async fn replace_overwrites_seeded_document() {
        let backend = MemoryBackend::new();
        backend.seed("ns", "doc", ConfigDocument::default());

        let mut doc = ConfigDocument::default();
        doc.data.insert("k".into(), "v".into());
        let session = backend.connect().await.unwrap();
        session.replace("ns", "doc", doc.clone()).await.unwrap();

        assert_eq!(backend.get("ns", "doc"), Some(doc));
        assert_eq!(backend.writes(), 1);
    }

    #[tokio::test]
    async fn injected_connect_fault_is_client_error() {
        let backend = MemoryBackend::new();
        backend.inject_fault(Some(FaultPoint::Connect));
        let err = backend.connect().await.err().unwrap();
        assert_eq!(err.metric_label(), "store_client_error");

        backend.inject_fault(None);
        assert!(backend.connect().await.is_ok());
    }
}
