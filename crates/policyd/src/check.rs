// SPDX-FileCopyrightText: 2026 policyd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `policyd check` command implementation.

use policyd_config::PolicydConfig;
use policyd_core::PolicydError;

const REDACTED: &str = "<redacted>";

/// Copy of `config` with credentials and the signing key masked.
pub fn redacted(config: &PolicydConfig) -> PolicydConfig {
    let mut config = config.clone();
    config.auth.password = REDACTED.to_string();
    config.auth.signing_key = REDACTED.to_string();
    config
}

/// Print the effective configuration. Loading has already validated it.
pub fn run_check(config: &PolicydConfig) -> Result<(), PolicydError> {
    let rendered = toml::to_string_pretty(&redacted(config))
        .map_err(|e| PolicydError::Internal(format!("cannot render configuration: {e}")))?;
    println!("configuration is valid\n");
    print!("{rendered}");
    Ok(())
}
