// SPDX-FileCopyrightText: 2026 policyd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for policyd.
//!
//! Provides the error taxonomy, the identity, credential, and policy types,
//! and the adapter traits implemented by the auth and store crates.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{AuthFailure, PolicydError};
pub use types::{ActionError, ConfigDocument, Credential, Identity, Policy, PolicyField, Scheme};

pub use traits::{BackendSession, CredentialVerifier, PolicyBackend};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policyd_error_has_all_variants() {
        let _config = PolicydError::Config("test".into());
        let _auth = PolicydError::unauthenticated(AuthFailure::MissingCredential);
        let _signing = PolicydError::Signing {
            source: Box::new(std::io::Error::other("test")),
        };
        let _client = PolicydError::StoreClient {
            message: "test".into(),
            source: None,
        };
        let _update = PolicydError::StoreUpdate {
            message: "test".into(),
            source: Some(Box::new(std::io::Error::other("test"))),
        };
        let _timeout = PolicydError::Timeout {
            duration: std::time::Duration::from_secs(10),
        };
        let _internal = PolicydError::Internal("test".into());
    }

    #[test]
    fn all_trait_modules_are_exported() {
        fn _assert_verifier<T: CredentialVerifier>() {}
        fn _assert_backend<T: PolicyBackend>() {}
        fn _assert_session<T: BackendSession>() {}
    }
}
