// SPDX-FileCopyrightText: 2026 policyd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential verification strategy trait.

use async_trait::async_trait;

use crate::error::PolicydError;
use crate::types::{Credential, Identity, Scheme};

/// One concrete way of verifying a credential.
///
/// Implementations are selected by [`CredentialVerifier::scheme`] and must
/// fail with [`PolicydError::Unauthenticated`] for any credential they cannot
/// verify, including credentials of another scheme.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// The scheme this verifier handles.
    fn scheme(&self) -> Scheme;

    /// Verify the credential and return the identity it proves.
    async fn verify(&self, credential: &Credential) -> Result<Identity, PolicydError>;
}
