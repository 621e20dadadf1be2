// SPDX-FileCopyrightText: 2026 policyd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for policyd integration tests.
//!
//! Provides a gateway harness over an in-memory store for fast,
//! deterministic, CI-runnable tests without a cluster or TLS.

pub mod harness;

pub use harness::{
    TEST_DOCUMENT, TEST_NAMESPACE, TEST_PASSWORD, TEST_SIGNING_KEY, TEST_USERNAME, TestHarness,
    TestHarnessBuilder, basic_auth, bearer_auth, body_text, policy_request, test_config,
    token_request,
};
