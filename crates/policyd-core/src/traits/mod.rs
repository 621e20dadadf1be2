// SPDX-FileCopyrightText: 2026 policyd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the pluggable parts of policyd.
//!
//! Credential verification strategies and external store backends are the
//! two seams; both use `#[async_trait]` for dynamic dispatch.

pub mod auth;
pub mod storage;

pub use auth::CredentialVerifier;
pub use storage::{BackendSession, PolicyBackend};
