// SPDX-FileCopyrightText: 2026 policyd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for policyd.

use strum::Display;
use thiserror::Error;

/// Why a credential was rejected.
///
/// The reason is logged and counted, never sent to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum AuthFailure {
    /// No `Authorization` header was presented.
    MissingCredential,
    /// The `Authorization` header uses a scheme no verifier handles.
    UnsupportedScheme,
    /// The scheme is understood but the route does not accept it.
    SchemeNotAccepted,
    /// Username or password did not match the operator credentials.
    InvalidCredentials,
    /// The bearer token could not be decoded.
    MalformedToken,
    /// The bearer token signature did not verify against the signing key.
    InvalidSignature,
    /// The bearer token header names an algorithm other than the expected one.
    AlgorithmMismatch,
    /// The bearer token is past its expiry.
    Expired,
    /// Issuer, audience, or subject claims are missing or wrong.
    InvalidClaims,
}

impl AuthFailure {
    /// Metric status label for this failure.
    pub fn metric_label(&self) -> &'static str {
        match self {
            AuthFailure::MissingCredential
            | AuthFailure::UnsupportedScheme
            | AuthFailure::SchemeNotAccepted
            | AuthFailure::InvalidCredentials => "user_error",
            AuthFailure::MalformedToken
            | AuthFailure::InvalidSignature
            | AuthFailure::AlgorithmMismatch
            | AuthFailure::Expired
            | AuthFailure::InvalidClaims => "jwt_error",
        }
    }
}

/// The primary error type used across policyd components.
#[derive(Debug, Error)]
pub enum PolicydError {
    /// Configuration errors (missing required values, invalid settings).
    #[error("configuration error: {0}")]
    Config(String),

    /// A credential was missing, malformed, or did not verify.
    #[error("authentication failed: {reason}")]
    Unauthenticated { reason: AuthFailure },

    /// Signing a bearer token failed.
    #[error("token signing failed: {source}")]
    Signing {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A session with the external store could not be established.
    #[error("store client error: {message}")]
    StoreClient {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The read-modify-write against the external store failed.
    #[error("store update error: {message}")]
    StoreUpdate {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PolicydError {
    /// Shorthand for an authentication failure with the given reason.
    pub fn unauthenticated(reason: AuthFailure) -> Self {
        PolicydError::Unauthenticated { reason }
    }

    /// Returns the rejection reason if this is an authentication failure.
    pub fn auth_failure(&self) -> Option<AuthFailure> {
        match self {
            PolicydError::Unauthenticated { reason } => Some(*reason),
            _ => None,
        }
    }

    /// Metric status label for this error.
    pub fn metric_label(&self) -> &'static str {
        match self {
            PolicydError::Unauthenticated { reason } => reason.metric_label(),
            PolicydError::Signing { .. } => "signing_error",
            PolicydError::StoreClient { .. } => "store_client_error",
            PolicydError::StoreUpdate { .. } | PolicydError::Timeout { .. } => {
                "store_update_error"
            }
            PolicydError::Config(_) | PolicydError::Internal(_) => "internal_error",
        }
    }
}
