// SPDX-FileCopyrightText: 2026 policyd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The authentication gate every protected route passes through.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum_extra::headers::authorization::{Basic, Bearer};
use axum_extra::headers::{Authorization, HeaderMapExt};
use secrecy::SecretString;

use policyd_config::model::AuthConfig;
use policyd_core::{AuthFailure, Credential, CredentialVerifier, Identity, PolicydError, Scheme};
use policyd_prometheus::{record_auth_attempt, record_cache_hit};

use crate::cache::{VerificationCache, cache_key};
use crate::token::TokenSettings;
use crate::verifier::{BearerVerifier, PasswordVerifier};

/// Extract the credential from an `Authorization` header.
///
/// `Basic` yields a username/password pair and `Bearer` a raw token. A
/// missing header, another scheme, or an undecodable value is rejected.
pub fn credential_from_headers(headers: &HeaderMap) -> Result<Credential, AuthFailure> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthFailure::MissingCredential)?;

    let scheme = value
        .to_str()
        .ok()
        .and_then(|v| v.split_whitespace().next())
        .and_then(|s| s.parse::<Scheme>().ok())
        .ok_or(AuthFailure::UnsupportedScheme)?;

    match scheme {
        Scheme::Basic => {
            let Authorization(basic) = headers
                .typed_get::<Authorization<Basic>>()
                .ok_or(AuthFailure::InvalidCredentials)?;
            Ok(Credential::UsernamePassword {
                username: basic.username().to_string(),
                password: SecretString::from(basic.password().to_string()),
            })
        }
        Scheme::Bearer => {
            let Authorization(bearer) = headers
                .typed_get::<Authorization<Bearer>>()
                .ok_or(AuthFailure::MalformedToken)?;
            Ok(Credential::BearerToken(SecretString::from(
                bearer.token().to_string(),
            )))
        }
    }
}

/// Dispatches credentials to the verifier for their scheme, consulting the
/// shared [`VerificationCache`] first.
#[derive(Clone)]
pub struct Authenticator {
    verifiers: Vec<Arc<dyn CredentialVerifier>>,
    cache: Arc<VerificationCache>,
}

impl Authenticator {
    /// Create a gate with no verifiers. Every credential is rejected until
    /// one is registered with [`Authenticator::with_verifier`].
    pub fn new(cache: Arc<VerificationCache>) -> Self {
        Self {
            verifiers: Vec::new(),
            cache,
        }
    }

    /// Register a verifier, replacing any previous one for the same scheme.
    pub fn with_verifier(mut self, verifier: Arc<dyn CredentialVerifier>) -> Self {
        self.verifiers.retain(|v| v.scheme() != verifier.scheme());
        self.verifiers.push(verifier);
        self
    }

    /// Build the password and bearer verifiers and the cache from config.
    pub fn from_config(config: &AuthConfig) -> Self {
        let cache = Arc::new(VerificationCache::new(
            Duration::from_secs(config.cache_ttl_secs),
            config.cache_capacity,
        ));
        let settings = TokenSettings::from_config(config);
        Self::new(cache)
            .with_verifier(Arc::new(PasswordVerifier::from_config(config)))
            .with_verifier(Arc::new(BearerVerifier::new(&settings)))
    }

    pub fn cache(&self) -> &Arc<VerificationCache> {
        &self.cache
    }

    /// Authenticate a request from its headers, accepting only `accepted`
    /// schemes. Records the outcome and logs the reason for any rejection.
    pub async fn authenticate(
        &self,
        headers: &HeaderMap,
        accepted: &[Scheme],
    ) -> Result<Identity, PolicydError> {
        let start = Instant::now();
        let result = self.authenticate_inner(headers, accepted).await;

        match &result {
            Ok(identity) => {
                record_auth_attempt("ok", start.elapsed());
                tracing::debug!(subject = identity.subject(), "request authenticated");
            }
            Err(e) => {
                record_auth_attempt(e.metric_label(), start.elapsed());
                tracing::warn!(error = %e, "authentication rejected");
            }
        }
        result
    }

    async fn authenticate_inner(
        &self,
        headers: &HeaderMap,
        accepted: &[Scheme],
    ) -> Result<Identity, PolicydError> {
        let credential = credential_from_headers(headers).map_err(PolicydError::unauthenticated)?;
        if !accepted.contains(&credential.scheme()) {
            return Err(PolicydError::unauthenticated(
                AuthFailure::SchemeNotAccepted,
            ));
        }
        self.verify(&credential).await
    }

    /// Verify a credential, answering from the cache when possible and
    /// caching the identity after a successful check.
    pub async fn verify(&self, credential: &Credential) -> Result<Identity, PolicydError> {
        let scheme = credential.scheme();
        let key = cache_key(credential);

        if let Some(identity) = self.cache.lookup(&key).await {
            record_cache_hit(&scheme.to_string());
            return Ok(identity);
        }

        let verifier = self
            .verifiers
            .iter()
            .find(|v| v.scheme() == scheme)
            .ok_or_else(|| PolicydError::unauthenticated(AuthFailure::UnsupportedScheme))?;

        let identity = verifier.verify(credential).await?;
        self.cache.insert(key, identity.clone()).await;
        Ok(identity)
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let schemes: Vec<Scheme> = self.verifiers.iter().map(|v| v.scheme()).collect();
        f.debug_struct("Authenticator")
            .field("schemes", &schemes)
            .field("cache", &self.cache)
            .finish()
    }
}
