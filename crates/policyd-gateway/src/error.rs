// SPDX-FileCopyrightText: 2026 policyd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping of component failures to HTTP responses.
//!
//! Every failure maps to exactly one status and one plain-text body.
//! Authentication and infrastructure failures get a generic body; the
//! detail is logged where the failure happened. Validation failures
//! describe the client's own input and are returned verbatim.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use policyd_core::PolicydError;
use policyd_policy::ValidationError;

/// An error returned from a gateway handler or middleware.
#[derive(Debug)]
pub enum ApiError {
    Policyd(PolicydError),
    Validation(ValidationError),
    /// The request body could not be read.
    BodyRead,
}

impl From<PolicydError> for ApiError {
    fn from(e: PolicydError) -> Self {
        ApiError::Policyd(e)
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::Validation(e)
    }
}

impl ApiError {
    /// Metric status label for this error.
    pub fn metric_label(&self) -> &'static str {
        match self {
            ApiError::Policyd(e) => e.metric_label(),
            ApiError::Validation(_) | ApiError::BodyRead => "json_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Policyd(PolicydError::Unauthenticated { .. }) => StatusCode::UNAUTHORIZED,
            ApiError::Policyd(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Validation(e) => StatusCode::from_u16(e.kind().status_code())
                .unwrap_or(StatusCode::BAD_REQUEST),
            ApiError::BodyRead => StatusCode::BAD_REQUEST,
        }
    }

    fn body(&self) -> String {
        match self {
            ApiError::Policyd(PolicydError::Unauthenticated { .. }) => "unauthorized".to_string(),
            ApiError::Policyd(PolicydError::StoreClient { .. }) => {
                "Something went wrong getting the store client.".to_string()
            }
            ApiError::Policyd(PolicydError::StoreUpdate { .. } | PolicydError::Timeout { .. }) => {
                "Something went wrong when updating the policy document.".to_string()
            }
            ApiError::Policyd(PolicydError::Signing { .. }) => {
                "Something went wrong when issuing the token.".to_string()
            }
            ApiError::Policyd(_) => "internal server error".to_string(),
            ApiError::Validation(e) => e.to_string(),
            ApiError::BodyRead => "Request body could not be read".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), self.body()).into_response()
    }
}
