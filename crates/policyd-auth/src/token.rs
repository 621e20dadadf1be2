// SPDX-FileCopyrightText: 2026 policyd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bearer token issuance.

use std::time::Duration;

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode, get_current_timestamp};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use policyd_config::model::AuthConfig;
use policyd_core::{Identity, PolicydError};

/// The only algorithm tokens are signed and accepted with.
pub const ALGORITHM: Algorithm = Algorithm::HS256;

/// Registered claims carried by every issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub exp: u64,
    pub iat: u64,
}

/// Key material and claim values shared by [`TokenIssuer`] and
/// [`crate::BearerVerifier`].
#[derive(Clone)]
pub struct TokenSettings {
    pub signing_key: SecretString,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
}

impl TokenSettings {
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            signing_key: SecretString::from(config.signing_key.clone()),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            ttl: Duration::from_secs(config.token_ttl_secs),
        }
    }
}

impl std::fmt::Debug for TokenSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSettings")
            .field("signing_key", &"[redacted]")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Mints short-lived HS256 tokens for authenticated identities.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    issuer: String,
    audience: String,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(settings: &TokenSettings) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(settings.signing_key.expose_secret().as_bytes()),
            issuer: settings.issuer.clone(),
            audience: settings.audience.clone(),
            ttl: settings.ttl,
        }
    }

    /// Sign a token for `identity`, valid from now for the configured TTL.
    pub fn issue(&self, identity: &Identity) -> Result<String, PolicydError> {
        self.issue_at(identity, get_current_timestamp())
    }

    /// Sign a token as if issued at `now` (seconds since the Unix epoch).
    pub fn issue_at(&self, identity: &Identity, now: u64) -> Result<String, PolicydError> {
        let claims = Claims {
            iss: self.issuer.clone(),
            sub: identity.subject().to_string(),
            aud: self.audience.clone(),
            exp: now.saturating_add(self.ttl.as_secs()),
            iat: now,
        };

        encode(&Header::new(ALGORITHM), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!(error = %e, "failed to sign token");
            PolicydError::Signing {
                source: Box::new(e),
            }
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{DecodingKey, Validation, decode, decode_header};

    fn settings() -> TokenSettings {
        TokenSettings {
            signing_key: SecretString::from("test-signing-key".to_string()),
            issuer: "auth-app".into(),
            audience: "any".into(),
            ttl: Duration::from_secs(300),
        }
    }

    #[test]
    fn issued_token_carries_registered_claims() {
        let issuer = TokenIssuer::new(&settings());
        let token = issuer
            .issue_at(&Identity::new("operator"), 1_700_000_000)
            .unwrap();

        let mut validation = Validation::new(ALGORITHM);
        validation.validate_exp = false;
        validation.set_audience(&["any"]);
        let data = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"test-signing-key"),
            &validation,
        )
        .unwrap();

        assert_eq!(
            data.claims,
            Claims {
                iss: "auth-app".into(),
                sub: "operator".into(),
                aud: "any".into(),
                exp: 1_700_000_300,
                iat: 1_700_000_000,
            }
        );
    }

    #[test]
    fn issued_token_header_is_hs256() {
        let token = TokenIssuer::new(&settings())
            .issue(&Identity::new("operator"))
            .unwrap();
        assert_eq!(decode_header(&token).unwrap().alg, Algorithm::HS256);
    }

    #[test]
    fn settings_debug_redacts_key() {
        let debug = format!("{:?}", settings());
        assert!(!debug.contains("test-signing-key"));
        assert!(debug.contains("[redacted]"));
    }

    #[test]
    fn settings_from_config_uses_ttl_seconds() {
        let config = AuthConfig {
            signing_key: "k".into(),
            token_ttl_secs: 42,
            ..AuthConfig::default()
        };
        let settings = TokenSettings::from_config(&config);
        assert_eq!(settings.ttl, Duration::from_secs(42));
        assert_eq!(settings.issuer, "auth-app");
        assert_eq!(settings.audience, "any");
    }
}
