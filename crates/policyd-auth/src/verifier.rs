// SPDX-FileCopyrightText: 2026 policyd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The two credential verification strategies.
//!
//! [`PasswordVerifier`] checks an operator username/password pair;
//! [`BearerVerifier`] checks a token minted by [`crate::TokenIssuer`]. Both
//! report the precise rejection reason as an [`AuthFailure`], which callers
//! log and count but never send to the client.

use async_trait::async_trait;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, Validation, decode};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use policyd_config::model::AuthConfig;
use policyd_core::{AuthFailure, Credential, CredentialVerifier, Identity, PolicydError, Scheme};

use crate::cache::EXPIRY_EXTENSION;
use crate::token::{ALGORITHM, Claims, TokenSettings};

/// Fixed identifier attached to the operator identity.
pub const OPERATOR_ID: &str = "1";

fn digest(value: &[u8]) -> [u8; 32] {
    Sha256::digest(value).into()
}

/// Verifies the single statically configured operator credential pair.
///
/// Both fields are compared as SHA-256 digests in constant time, and both
/// comparisons always run.
pub struct PasswordVerifier {
    username: String,
    username_digest: [u8; 32],
    password_digest: [u8; 32],
}

impl PasswordVerifier {
    pub fn new(username: impl Into<String>, password: &SecretString) -> Self {
        let username = username.into();
        Self {
            username_digest: digest(username.as_bytes()),
            password_digest: digest(password.expose_secret().as_bytes()),
            username,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            config.username.clone(),
            &SecretString::from(config.password.clone()),
        )
    }
}

#[async_trait]
impl CredentialVerifier for PasswordVerifier {
    fn scheme(&self) -> Scheme {
        Scheme::Basic
    }

    async fn verify(&self, credential: &Credential) -> Result<Identity, PolicydError> {
        let Credential::UsernamePassword { username, password } = credential else {
            return Err(PolicydError::unauthenticated(AuthFailure::UnsupportedScheme));
        };

        let username_ok = digest(username.as_bytes())
            .as_slice()
            .ct_eq(self.username_digest.as_slice());
        let password_ok = digest(password.expose_secret().as_bytes())
            .as_slice()
            .ct_eq(self.password_digest.as_slice());

        if bool::from(username_ok & password_ok) {
            Ok(Identity::new(self.username.clone()).with_extension("id", OPERATOR_ID))
        } else {
            Err(PolicydError::unauthenticated(AuthFailure::InvalidCredentials))
        }
    }
}

impl std::fmt::Debug for PasswordVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordVerifier")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Verifies HS256 bearer tokens signed with the configured key.
///
/// Expiry is checked with zero leeway; issuer and audience must match; a
/// header naming any algorithm other than HS256 is rejected.
pub struct BearerVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl BearerVerifier {
    pub fn new(settings: &TokenSettings) -> Self {
        let mut validation = Validation::new(ALGORITHM);
        validation.set_issuer(&[&settings.issuer]);
        validation.set_audience(&[&settings.audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.leeway = 0;

        Self {
            decoding_key: DecodingKey::from_secret(settings.signing_key.expose_secret().as_bytes()),
            validation,
        }
    }
}

fn failure_for(kind: &ErrorKind) -> AuthFailure {
    match kind {
        ErrorKind::ExpiredSignature => AuthFailure::Expired,
        ErrorKind::InvalidSignature => AuthFailure::InvalidSignature,
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
            AuthFailure::AlgorithmMismatch
        }
        ErrorKind::InvalidIssuer
        | ErrorKind::InvalidAudience
        | ErrorKind::InvalidSubject
        | ErrorKind::ImmatureSignature
        | ErrorKind::MissingRequiredClaim(_) => AuthFailure::InvalidClaims,
        _ => AuthFailure::MalformedToken,
    }
}

#[async_trait]
impl CredentialVerifier for BearerVerifier {
    fn scheme(&self) -> Scheme {
        Scheme::Bearer
    }

    async fn verify(&self, credential: &Credential) -> Result<Identity, PolicydError> {
        let Credential::BearerToken(token) = credential else {
            return Err(PolicydError::unauthenticated(AuthFailure::UnsupportedScheme));
        };

        let data = decode::<Claims>(token.expose_secret(), &self.decoding_key, &self.validation)
            .map_err(|e| {
                let reason = failure_for(e.kind());
                tracing::debug!(error = %e, %reason, "bearer token rejected");
                PolicydError::unauthenticated(reason)
            })?;

        if data.claims.sub.is_empty() {
            return Err(PolicydError::unauthenticated(AuthFailure::InvalidClaims));
        }

        Ok(Identity::new(data.claims.sub)
            .with_extension(EXPIRY_EXTENSION, data.claims.exp.to_string()))
    }
}

impl std::fmt::Debug for BearerVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerVerifier")
            .field("algorithms", &self.validation.algorithms)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenIssuer;
    use jsonwebtoken::{Algorithm, EncodingKey, Header, encode, get_current_timestamp};
    use std::time::Duration;

    fn settings(key: &str) -> TokenSettings {
        TokenSettings {
            signing_key: SecretString::from(key.to_string()),
            issuer: "auth-app".into(),
            audience: "any".into(),
            ttl: Duration::from_secs(300),
        }
    }

    fn basic(username: &str, password: &str) -> Credential {
        Credential::UsernamePassword {
            username: username.into(),
            password: SecretString::from(password.to_string()),
        }
    }

    fn bearer(token: String) -> Credential {
        Credential::BearerToken(SecretString::from(token))
    }

    fn reason(result: Result<Identity, PolicydError>) -> AuthFailure {
        result.unwrap_err().auth_failure().unwrap()
    }

    fn password_verifier() -> PasswordVerifier {
        PasswordVerifier::new("operator", &SecretString::from("hunter2".to_string()))
    }

    #[tokio::test]
    async fn correct_pair_yields_operator_identity() {
        let identity = password_verifier()
            .verify(&basic("operator", "hunter2"))
            .await
            .unwrap();
        assert_eq!(identity.subject(), "operator");
        assert_eq!(identity.extension("id"), Some(OPERATOR_ID));
    }

    #[tokio::test]
    async fn wrong_password_or_username_is_rejected() {
        let verifier = password_verifier();
        assert_eq!(
            reason(verifier.verify(&basic("operator", "hunter3")).await),
            AuthFailure::InvalidCredentials
        );
        assert_eq!(
            reason(verifier.verify(&basic("admin", "hunter2")).await),
            AuthFailure::InvalidCredentials
        );
        assert_eq!(
            reason(verifier.verify(&basic("", "")).await),
            AuthFailure::InvalidCredentials
        );
    }

    #[tokio::test]
    async fn verifiers_refuse_the_other_scheme() {
        assert_eq!(
            reason(password_verifier().verify(&bearer("t".into())).await),
            AuthFailure::UnsupportedScheme
        );
        assert_eq!(
            reason(
                BearerVerifier::new(&settings("k"))
                    .verify(&basic("operator", "hunter2"))
                    .await
            ),
            AuthFailure::UnsupportedScheme
        );
    }

    #[tokio::test]
    async fn issued_token_verifies_to_same_subject() {
        let settings = settings("shared-key");
        let token = TokenIssuer::new(&settings)
            .issue(&Identity::new("operator"))
            .unwrap();
        let identity = BearerVerifier::new(&settings)
            .verify(&bearer(token))
            .await
            .unwrap();
        assert_eq!(identity.subject(), "operator");
        assert!(identity.extension(EXPIRY_EXTENSION).is_some());
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let settings = settings("shared-key");
        let issued_at = get_current_timestamp() - 301;
        let token = TokenIssuer::new(&settings)
            .issue_at(&Identity::new("operator"), issued_at)
            .unwrap();
        assert_eq!(
            reason(BearerVerifier::new(&settings).verify(&bearer(token)).await),
            AuthFailure::Expired
        );
    }

    #[tokio::test]
    async fn token_signed_with_other_key_is_rejected() {
        let token = TokenIssuer::new(&settings("other-key"))
            .issue(&Identity::new("operator"))
            .unwrap();
        assert_eq!(
            reason(
                BearerVerifier::new(&settings("shared-key"))
                    .verify(&bearer(token))
                    .await
            ),
            AuthFailure::InvalidSignature
        );
    }

    #[tokio::test]
    async fn token_with_other_algorithm_is_rejected() {
        let now = get_current_timestamp();
        let claims = Claims {
            iss: "auth-app".into(),
            sub: "operator".into(),
            aud: "any".into(),
            exp: now + 300,
            iat: now,
        };
        let token = encode(
            &Header::new(Algorithm::HS384),
            &claims,
            &EncodingKey::from_secret(b"shared-key"),
        )
        .unwrap();
        assert_eq!(
            reason(
                BearerVerifier::new(&settings("shared-key"))
                    .verify(&bearer(token))
                    .await
            ),
            AuthFailure::AlgorithmMismatch
        );
    }

    #[tokio::test]
    async fn wrong_audience_is_rejected() {
        let mut other = settings("shared-key");
        other.audience = "elsewhere".into();
        let token = TokenIssuer::new(&other)
            .issue(&Identity::new("operator"))
            .unwrap();
        assert_eq!(
            reason(
                BearerVerifier::new(&settings("shared-key"))
                    .verify(&bearer(token))
                    .await
            ),
            AuthFailure::InvalidClaims
        );
    }

    #[tokio::test]
    async fn garbage_token_is_malformed() {
        assert_eq!(
            reason(
                BearerVerifier::new(&settings("shared-key"))
                    .verify(&bearer("not.a.jwt".into()))
                    .await
            ),
            AuthFailure::MalformedToken
        );
    }
}
