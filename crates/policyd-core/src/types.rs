// SPDX-FileCopyrightText: 2026 policyd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the authenticator, the validator, and the store.

use std::collections::BTreeMap;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// An authenticated principal.
///
/// Produced by a successful credential verification and attached to the
/// request for its lifetime. Fields are private so an identity cannot be
/// altered after verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    subject: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    extensions: BTreeMap<String, String>,
}

impl Identity {
    /// Create an identity for the given subject with no extensions.
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            extensions: BTreeMap::new(),
        }
    }

    /// Attach an extension value.
    pub fn with_extension(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extensions.insert(key.into(), value.into());
        self
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn extension(&self, key: &str) -> Option<&str> {
        self.extensions.get(key).map(String::as_str)
    }

    pub fn extensions(&self) -> &BTreeMap<String, String> {
        &self.extensions
    }
}

/// Credential schemes understood by the authenticator.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// HTTP Basic: an operator username/password pair.
    Basic,
    /// HTTP Bearer: a signed token minted by the issuer.
    Bearer,
}

/// A credential presented on an inbound request.
///
/// Secret material is held in [`SecretString`], which zeroizes its buffer on
/// drop and redacts itself in `Debug` output.
#[derive(Debug)]
pub enum Credential {
    UsernamePassword {
        username: String,
        password: SecretString,
    },
    BearerToken(SecretString),
}

impl Credential {
    /// The scheme this credential was presented under.
    pub fn scheme(&self) -> Scheme {
        match self {
            Credential::UsernamePassword { .. } => Scheme::Basic,
            Credential::BearerToken(_) => Scheme::Bearer,
        }
    }
}

/// The two policy fields, used to name the offending field in errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyField {
    UnprocessableFileTypeAction,
    GlasswallBlockedFilesAction,
}

impl PolicyField {
    /// All fields, in the order they are validated.
    pub const ALL: [PolicyField; 2] = [
        PolicyField::UnprocessableFileTypeAction,
        PolicyField::GlasswallBlockedFilesAction,
    ];

    /// Name of the field in request bodies.
    pub fn json_name(&self) -> &'static str {
        match self {
            PolicyField::UnprocessableFileTypeAction => "unprocessableFileTypeAction",
            PolicyField::GlasswallBlockedFilesAction => "glasswallBlockedFilesAction",
        }
    }

    /// Name of the field in the stored document.
    pub fn stored_name(&self) -> &'static str {
        match self {
            PolicyField::UnprocessableFileTypeAction => "UnprocessableFileTypeAction",
            PolicyField::GlasswallBlockedFilesAction => "GlasswallBlockedFilesAction",
        }
    }

    /// Resolve a request-body key to a field. Accepts the camelCase name and
    /// the PascalCase stored name.
    pub fn from_key(key: &str) -> Option<PolicyField> {
        PolicyField::ALL
            .into_iter()
            .find(|f| f.json_name() == key || f.stored_name() == key)
    }
}

impl std::fmt::Display for PolicyField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.json_name())
    }
}

/// A fully validated file-handling policy.
///
/// Both actions are always present and within
/// [`Policy::MIN_ACTION`]..=[`Policy::MAX_ACTION`]; the only constructor is
/// [`Policy::try_new`]. Serializes to the stored document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", try_from = "StoredPolicy")]
pub struct Policy {
    unprocessable_file_type_action: u8,
    glasswall_blocked_files_action: u8,
}

impl Policy {
    pub const MIN_ACTION: i64 = 1;
    pub const MAX_ACTION: i64 = 4;

    /// Build a policy, returning the first field whose value is out of range.
    pub fn try_new(
        unprocessable_file_type_action: i64,
        glasswall_blocked_files_action: i64,
    ) -> Result<Self, PolicyField> {
        let unprocessable = Self::check(
            PolicyField::UnprocessableFileTypeAction,
            unprocessable_file_type_action,
        )?;
        let glasswall = Self::check(
            PolicyField::GlasswallBlockedFilesAction,
            glasswall_blocked_files_action,
        )?;
        Ok(Self {
            unprocessable_file_type_action: unprocessable,
            glasswall_blocked_files_action: glasswall,
        })
    }

    /// Build a policy from optional actions.
    ///
    /// Fields are checked in declaration order, each for presence then
    /// range, and the first failure is returned.
    pub fn from_actions(
        unprocessable_file_type_action: Option<i64>,
        glasswall_blocked_files_action: Option<i64>,
    ) -> Result<Self, ActionError> {
        let check = |field: PolicyField, value: Option<i64>| -> Result<u8, ActionError> {
            let value = value.ok_or(ActionError::Missing(field))?;
            Self::check(field, value).map_err(ActionError::OutOfRange)
        };
        Ok(Self {
            unprocessable_file_type_action: check(
                PolicyField::UnprocessableFileTypeAction,
                unprocessable_file_type_action,
            )?,
            glasswall_blocked_files_action: check(
                PolicyField::GlasswallBlockedFilesAction,
                glasswall_blocked_files_action,
            )?,
        })
    }

    /// Whether `value` is an acceptable action.
    pub fn in_range(value: i64) -> bool {
        (Self::MIN_ACTION..=Self::MAX_ACTION).contains(&value)
    }

    fn check(field: PolicyField, value: i64) -> Result<u8, PolicyField> {
        if Self::in_range(value) {
            // Range is 1..=4, the cast is lossless.
            Ok(value as u8)
        } else {
            Err(field)
        }
    }

    pub fn unprocessable_file_type_action(&self) -> u8 {
        self.unprocessable_file_type_action
    }

    pub fn glasswall_blocked_files_action(&self) -> u8 {
        self.glasswall_blocked_files_action
    }

    /// Serialize to the value written under the policy data key.
    pub fn to_document_value(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Why [`Policy::from_actions`] rejected its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionError {
    Missing(PolicyField),
    OutOfRange(PolicyField),
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StoredPolicy {
    unprocessable_file_type_action: i64,
    glasswall_blocked_files_action: i64,
}

impl TryFrom<StoredPolicy> for Policy {
    type Error = String;

    fn try_from(raw: StoredPolicy) -> Result<Self, Self::Error> {
        Policy::try_new(
            raw.unprocessable_file_type_action,
            raw.glasswall_blocked_files_action,
        )
        .map_err(|field| format!("{} must be between 1-4 inclusive", field.stored_name()))
    }
}

/// A named configuration document held by the external store.
///
/// `data` is the string key/value payload the policy is written into; `extra`
/// carries every other top-level member of the backend's representation
/// (metadata, revision markers) so it can be written back untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigDocument {
    pub data: BTreeMap<String, String>,
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ConfigDocument {
    /// Overwrite `key` with the serialized policy.
    pub fn set_policy(&mut self, key: &str, policy: &Policy) -> Result<(), serde_json::Error> {
        self.data.insert(key.to_string(), policy.to_document_value()?);
        Ok(())
    }

    /// Parse the policy stored under `key`, if any.
    pub fn policy(&self, key: &str) -> Option<Policy> {
        self.data
            .get(key)
            .and_then(|raw| serde_json::from_str(raw).ok())
    }
}
