// SPDX-FileCopyrightText: 2026 policyd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway.
//!
//! Handles GET /api/v1/auth/token, PUT /api/v1/policy, their OPTIONS
//! pre-flights, and the public /health and /metrics endpoints.

use std::time::Instant;

use axum::{
    Extension, Json,
    body::Body,
    extract::State,
    http::{
        HeaderMap, StatusCode,
        header::{CONTENT_LENGTH, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use http_body_util::LengthLimitError;
use serde::Serialize;

use policyd_core::Identity;
use policyd_policy::ValidationError;
use policyd_prometheus::{record_policy_update, record_token_request};

use crate::error::ApiError;
use crate::server::GatewayState;

/// Body returned by a successful policy update.
pub const POLICY_UPDATED: &str = "Successfully updated policy.";

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Health status string.
    pub status: String,
    /// Binary version.
    pub version: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
}

fn status_label<T>(result: &Result<T, ApiError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(e) => e.metric_label(),
    }
}

/// OPTIONS on the API routes. CORS headers are added by the CORS layer.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// GET /api/v1/auth/token
///
/// Mints a bearer token for the identity proven by Basic authentication and
/// returns it as the plain-text body.
pub async fn issue_token(
    State(state): State<GatewayState>,
    Extension(identity): Extension<Identity>,
) -> Result<String, ApiError> {
    let start = Instant::now();
    let result = state.issuer.issue(&identity).map_err(ApiError::from);
    record_token_request(status_label(&result), start.elapsed());

    if result.is_ok() {
        tracing::info!(subject = identity.subject(), "token issued");
    }
    result
}

/// PUT /api/v1/policy
///
/// Validates the JSON body and writes the resulting policy to the store.
pub async fn update_policy(
    State(state): State<GatewayState>,
    Extension(identity): Extension<Identity>,
    headers: HeaderMap,
    body: Body,
) -> Result<&'static str, ApiError> {
    let start = Instant::now();
    let result = apply_policy(&state, &headers, body).await;
    record_policy_update(status_label(&result), start.elapsed());

    match &result {
        Ok(_) => tracing::info!(subject = identity.subject(), "policy update accepted"),
        Err(ApiError::Validation(e)) => {
            tracing::info!(subject = identity.subject(), reason = %e, "policy update rejected")
        }
        Err(_) => {}
    }
    result
}

async fn apply_policy(
    state: &GatewayState,
    headers: &HeaderMap,
    body: Body,
) -> Result<&'static str, ApiError> {
    let content_type = match headers.get(CONTENT_TYPE) {
        Some(value) => Some(
            value
                .to_str()
                .map_err(|_| ValidationError::UnsupportedMediaType)?,
        ),
        None => None,
    };
    let content_length = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    state
        .validator
        .check_headers(content_length, content_type)?;

    let limit = state.validator.max_body_bytes();
    let bytes = axum::body::to_bytes(body, limit).await.map_err(|e| {
        let too_large = std::error::Error::source(&e)
            .is_some_and(|source| source.is::<LengthLimitError>());
        if too_large {
            ApiError::from(ValidationError::PayloadTooLarge { limit })
        } else {
            tracing::debug!(error = %e, "failed to read request body");
            ApiError::BodyRead
        }
    })?;

    let policy = state
        .validator
        .validate(&bytes, content_length, content_type)?;

    state
        .store
        .update(&state.target.namespace, &state.target.name, &policy)
        .await?;

    Ok(POLICY_UPDATED)
}

/// GET /health
pub async fn get_public_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
    })
}

/// GET /metrics
pub async fn get_public_metrics(State(state): State<GatewayState>) -> Response {
    match &state.health.prometheus_render {
        Some(render) => (StatusCode::OK, render()).into_response(),
        None => (StatusCode::NOT_FOUND, "metrics are disabled").into_response(),
    }
}
