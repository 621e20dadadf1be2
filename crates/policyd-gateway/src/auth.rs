// SPDX-FileCopyrightText: 2026 policyd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authentication middleware for the gateway.
//!
//! Each protected route is wrapped with an [`AuthGate`] naming the schemes
//! it accepts. Pre-flight `OPTIONS` requests pass through untouched; every
//! other request must authenticate or is rejected with 401 before the
//! handler runs.

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Response},
};

use policyd_auth::Authenticator;
use policyd_core::Scheme;

use crate::error::ApiError;

/// Middleware state: the shared authenticator and the schemes one route accepts.
#[derive(Clone, Debug)]
pub struct AuthGate {
    pub authenticator: Authenticator,
    pub accepted: &'static [Scheme],
}

impl AuthGate {
    pub fn new(authenticator: Authenticator, accepted: &'static [Scheme]) -> Self {
        Self {
            authenticator,
            accepted,
        }
    }
}

/// Authenticate the request and attach the resulting
/// [`policyd_core::Identity`] to its extensions.
pub async fn auth_middleware(
    State(gate): State<AuthGate>,
    mut request: Request,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS {
        return next.run(request).await;
    }

    match gate
        .authenticator
        .authenticate(request.headers(), gate.accepted)
        .await
    {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}
