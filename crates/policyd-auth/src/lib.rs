// SPDX-FileCopyrightText: 2026 policyd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authentication for policyd.
//!
//! [`TokenIssuer`] mints bearer tokens for the operator; [`PasswordVerifier`]
//! and [`BearerVerifier`] implement [`policyd_core::CredentialVerifier`] for
//! the two accepted schemes; [`Authenticator`] selects between them by the
//! request's `Authorization` header and memoizes results in a shared
//! [`VerificationCache`].

pub mod authenticator;
pub mod cache;
pub mod token;
pub mod verifier;

pub use authenticator::{Authenticator, credential_from_headers};
pub use cache::{VerificationCache, cache_key};
pub use token::{Claims, TokenIssuer, TokenSettings};
pub use verifier::{BearerVerifier, OPERATOR_ID, PasswordVerifier};
