// SPDX-FileCopyrightText: 2026 policyd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTPS gateway for policyd.
//!
//! Exposes token issuance and policy updates behind the authentication gate,
//! plus unauthenticated health and metrics endpoints.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;

pub use error::ApiError;
pub use server::{
    GatewayState, HealthState, POLICY_PATH, PolicyTarget, TOKEN_PATH, build_router,
    shutdown_signal, spawn_cache_sweeper, start_server,
};
