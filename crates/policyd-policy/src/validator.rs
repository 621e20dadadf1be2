// SPDX-FileCopyrightText: 2026 policyd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Strict validation of policy update payloads.
//!
//! Checks run in a fixed order and stop at the first failure:
//! media type, size, emptiness, JSON syntax, object shape, unknown fields,
//! value types, then presence and range of each field in turn.

use serde_json::Value;
use serde_json::error::Category;
use thiserror::Error;

use policyd_core::{ActionError, Policy, PolicyField};

/// Status classification of a [`ValidationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    UnsupportedMediaType,
    PayloadTooLarge,
    BadRequest,
}

impl ValidationErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ValidationErrorKind::UnsupportedMediaType => 415,
            ValidationErrorKind::PayloadTooLarge => 413,
            ValidationErrorKind::BadRequest => 400,
        }
    }
}

/// Why a payload was rejected. The message is safe to return to the client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Content-Type header is not application/json")]
    UnsupportedMediaType,

    #[error("Request body must not be larger than {}", human_size(.limit))]
    PayloadTooLarge { limit: usize },

    #[error("Request body must not be empty")]
    EmptyBody,

    #[error("Request body contains badly-formed JSON")]
    TruncatedJson,

    #[error("Request body contains badly-formed JSON (at line {line}, column {column})")]
    MalformedJson { line: usize, column: usize },

    #[error("Request body must be a JSON object")]
    NotAnObject,

    #[error("Request body contains unknown field \"{0}\"")]
    UnknownField(String),

    #[error("Request body contains an invalid value for the \"{0}\" field")]
    InvalidValue(PolicyField),

    #[error("Request body contains duplicate field \"{0}\"")]
    DuplicateField(PolicyField),

    #[error("{0} is required")]
    MissingField(PolicyField),

    #[error("{0} must be between 1-4 inclusive")]
    OutOfRange(PolicyField),
}

impl ValidationError {
    pub fn kind(&self) -> ValidationErrorKind {
        match self {
            ValidationError::UnsupportedMediaType => ValidationErrorKind::UnsupportedMediaType,
            ValidationError::PayloadTooLarge { .. } => ValidationErrorKind::PayloadTooLarge,
            _ => ValidationErrorKind::BadRequest,
        }
    }

    /// The field this error names, if any.
    pub fn field(&self) -> Option<PolicyField> {
        match self {
            ValidationError::InvalidValue(f)
            | ValidationError::DuplicateField(f)
            | ValidationError::MissingField(f)
            | ValidationError::OutOfRange(f) => Some(*f),
            _ => None,
        }
    }
}

impl From<ActionError> for ValidationError {
    fn from(e: ActionError) -> Self {
        match e {
            ActionError::Missing(field) => ValidationError::MissingField(field),
            ActionError::OutOfRange(field) => ValidationError::OutOfRange(field),
        }
    }
}

fn human_size(bytes: &usize) -> String {
    const MIB: usize = 1024 * 1024;
    if *bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else {
        format!("{bytes} bytes")
    }
}

/// Turns an untrusted request body into a [`Policy`].
#[derive(Debug, Clone)]
pub struct PolicyValidator {
    max_body_bytes: usize,
}

impl Default for PolicyValidator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_BODY_BYTES)
    }
}

impl PolicyValidator {
    pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

    pub fn new(max_body_bytes: usize) -> Self {
        Self { max_body_bytes }
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// The checks that need only the request headers: media type, then
    /// declared length. Callers can run these before reading the body.
    pub fn check_headers(
        &self,
        content_length: Option<u64>,
        content_type: Option<&str>,
    ) -> Result<(), ValidationError> {
        if let Some(content_type) = content_type.map(str::trim).filter(|v| !v.is_empty())
            && !is_json_media_type(content_type)
        {
            return Err(ValidationError::UnsupportedMediaType);
        }

        let declared_too_large = content_length
            .is_some_and(|len| usize::try_from(len).map_or(true, |len| len > self.max_body_bytes));
        if declared_too_large {
            return Err(ValidationError::PayloadTooLarge {
                limit: self.max_body_bytes,
            });
        }
        Ok(())
    }

    /// Validate a request body.
    ///
    /// `content_length` is the declared length, if any; `content_type` the
    /// raw header value. An absent or blank content type is accepted.
    pub fn validate(
        &self,
        body: &[u8],
        content_length: Option<u64>,
        content_type: Option<&str>,
    ) -> Result<Policy, ValidationError> {
        self.check_headers(content_length, content_type)?;

        if body.len() > self.max_body_bytes {
            return Err(ValidationError::PayloadTooLarge {
                limit: self.max_body_bytes,
            });
        }

        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(ValidationError::EmptyBody);
        }

        let value: Value = serde_json::from_slice(body).map_err(|e| match e.classify() {
            Category::Eof => ValidationError::TruncatedJson,
            _ => ValidationError::MalformedJson {
                line: e.line(),
                column: e.column(),
            },
        })?;

        let Value::Object(members) = value else {
            return Err(ValidationError::NotAnObject);
        };

        if let Some(unknown) = members.keys().find(|k| PolicyField::from_key(k).is_none()) {
            return Err(ValidationError::UnknownField(unknown.clone()));
        }

        // Outer `Option`: field seen. Inner: its value, `None` for null.
        let mut actions: [Option<Option<i64>>; 2] = [None, None];
        for (key, value) in &members {
            let Some(field) = PolicyField::from_key(key) else {
                continue;
            };
            let parsed = match value {
                Value::Null => None,
                Value::Number(n) => Some(n.as_i64().ok_or(ValidationError::InvalidValue(field))?),
                _ => return Err(ValidationError::InvalidValue(field)),
            };
            if actions[slot(field)].replace(parsed).is_some() {
                return Err(ValidationError::DuplicateField(field));
            }
        }

        let [unprocessable, glasswall] = actions.map(Option::flatten);
        Ok(Policy::from_actions(unprocessable, glasswall)?)
    }
}

fn slot(field: PolicyField) -> usize {
    match field {
        PolicyField::UnprocessableFileTypeAction => 0,
        PolicyField::GlasswallBlockedFilesAction => 1,
    }
}

fn is_json_media_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(str::trim)
        .is_some_and(|media| media.eq_ignore_ascii_case("application/json"))
}
