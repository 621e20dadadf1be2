// SPDX-FileCopyrightText: 2026 policyd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! policyd - authenticated policy updates for an in-cluster ConfigMap.
//!
//! This is the binary entry point.

mod check;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use policyd_config::{ConfigError, PolicydConfig};

/// policyd - authenticated policy updates for an in-cluster ConfigMap.
#[derive(Parser, Debug)]
#[command(name = "policyd", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Start the HTTPS server (the default).
    Serve,
    /// Validate configuration and print it with secrets redacted.
    Check,
}

fn load(path: Option<&PathBuf>) -> Result<PolicydConfig, Vec<ConfigError>> {
    match path {
        Some(path) => policyd_config::load_and_validate_path(path),
        None => policyd_config::load_and_validate(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load(cli.config.as_ref()) {
        Ok(config) => config,
        Err(errors) => {
            policyd_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve::run_serve(config).await,
        Commands::Check => check::run_check(&config),
    };

    if let Err(e) = result {
        eprintln!("policyd: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::parse_from(["policyd"]);
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::parse_from(["policyd", "check", "--config", "/tmp/p.toml"]);
        assert_eq!(cli.command, Some(Commands::Check));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/p.toml")));
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
