// SPDX-FileCopyrightText: 2026 policyd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! External configuration store traits.

use async_trait::async_trait;

use crate::error::PolicydError;
use crate::types::ConfigDocument;

/// A store that holds named, namespaced configuration documents.
///
/// A session is acquired per update; failures to acquire one are reported as
/// [`PolicydError::StoreClient`].
#[async_trait]
pub trait PolicyBackend: Send + Sync + 'static {
    /// Human-readable backend name for logs.
    fn name(&self) -> &str;

    /// Establish a session with the store.
    async fn connect(&self) -> Result<Box<dyn BackendSession>, PolicydError>;
}

/// An established session with the store.
///
/// Failures are reported as [`PolicydError::StoreUpdate`].
#[async_trait]
pub trait BackendSession: Send + Sync {
    /// Fetch the named document. A missing document is an error.
    async fn fetch(&self, namespace: &str, name: &str) -> Result<ConfigDocument, PolicydError>;

    /// Replace the named document wholesale.
    async fn replace(
        &self,
        namespace: &str,
        name: &str,
        document: ConfigDocument,
    ) -> Result<(), PolicydError>;
}
