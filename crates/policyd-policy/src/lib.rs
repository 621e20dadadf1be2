// SPDX-FileCopyrightText: 2026 policyd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Validate-then-commit pipeline for policy updates.
//!
//! [`PolicyValidator`] turns an untrusted request body into a
//! [`policyd_core::Policy`]; [`PolicyStore`] writes it into the external
//! store through a [`policyd_core::PolicyBackend`].

pub mod kubernetes;
pub mod memory;
pub mod store;
pub mod validator;

pub use kubernetes::KubernetesBackend;
pub use memory::{FaultPoint, MemoryBackend};
pub use store::PolicyStore;
pub use validator::{PolicyValidator, ValidationError, ValidationErrorKind};
