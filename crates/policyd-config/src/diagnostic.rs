// SPDX-FileCopyrightText: 2026 policyd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration failures as miette diagnostics.
//!
//! Figment errors are mapped onto the dotted key they concern
//! (`store.namespace`). A key that came from a TOML file is underlined in
//! that file. A key that came from the environment names the variables that
//! set it.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::loader::env_names;

/// Minimum Jaro-Winkler similarity for a "did you mean" hint.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// A configuration error with rich diagnostic information.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A key that no section defines.
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(policyd::config::unknown_key),
        help("{}", choices_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        /// Dotted path of the unrecognized key.
        key: String,
        suggestion: Option<String>,
        /// Keys the enclosing section accepts, comma separated.
        valid_keys: String,
        #[label("this key is not recognized")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value that does not deserialize into its key's type.
    #[error("invalid value for `{key}`: {detail}")]
    #[diagnostic(code(policyd::config::invalid_type), help("{hint}"))]
    InvalidType {
        key: String,
        detail: String,
        /// Where to fix it: the expected type plus the file or variable.
        hint: String,
        #[label("expected {expected}")]
        span: Option<SourceSpan>,
        expected: String,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// An enumerated setting with a value outside its choices.
    #[error("unknown value `{value}` for `{key}`")]
    #[diagnostic(
        code(policyd::config::unknown_value),
        help("{}", choices_help(suggestion.as_deref(), valid_values))
    )]
    UnknownValue {
        key: String,
        value: String,
        suggestion: Option<String>,
        valid_values: String,
    },

    /// A setting the service cannot start without.
    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(policyd::config::missing_key),
        help("set {env} or add `{key}` to policyd.toml")
    )]
    MissingKey {
        key: String,
        /// Variables that set the key, joined with "or".
        env: String,
    },

    #[error("validation error: {message}")]
    #[diagnostic(code(policyd::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(policyd::config::other))]
    Other(String),
}

impl ConfigError {
    /// Missing-key error naming every variable that can supply `key`.
    pub fn missing(key: &str) -> Self {
        ConfigError::MissingKey {
            key: key.to_string(),
            env: env_names(key).join(" or "),
        }
    }
}

fn choices_help(suggestion: Option<&str>, choices: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid choices: {choices}"),
        None => format!("valid choices: {choices}"),
    }
}

/// Convert a `figment::Error` (which may hold several) into diagnostics.
///
/// `toml_sources` pairs each config file path with its content, for spans.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| {
            let section: Vec<String> = error.path.iter().map(|s| s.to_string()).collect();
            match &error.kind {
                Kind::UnknownField(field, expected) => {
                    let key = dotted(&section, field);
                    let (span, src) = locate(&error, &section, field, toml_sources);
                    ConfigError::UnknownKey {
                        suggestion: suggest_key(field, expected),
                        valid_keys: expected.join(", "),
                        key,
                        span,
                        src,
                    }
                }
                Kind::UnknownVariant(value, expected) => ConfigError::UnknownValue {
                    key: section.join("."),
                    suggestion: suggest_key(value, expected),
                    valid_values: expected.join(", "),
                    value: value.clone(),
                },
                Kind::InvalidType(actual, expected) => {
                    let key = section.join(".");
                    let (parent, field) = match section.split_last() {
                        Some((field, parent)) => (parent, field.as_str()),
                        None => (&section[..0], ""),
                    };
                    let (span, src) = locate(&error, parent, field, toml_sources);
                    let hint = if from_environment(&error) {
                        format!("expected {expected}; check {}", env_names(&key).join(" and "))
                    } else {
                        format!("expected {expected}")
                    };
                    ConfigError::InvalidType {
                        detail: format!("found {actual}"),
                        expected: expected.to_string(),
                        key,
                        hint,
                        span,
                        src,
                    }
                }
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

fn dotted(section: &[String], field: &str) -> String {
    section
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(field))
        .collect::<Vec<_>>()
        .join(".")
}

fn from_environment(error: &figment::Error) -> bool {
    error
        .metadata
        .as_ref()
        .is_some_and(|m| m.name.contains("environment"))
}

/// Span of `field` in the TOML file the error came from, if it came from one.
fn locate(
    error: &figment::Error,
    section: &[String],
    field: &str,
    toml_sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let Some(figment::Source::File(path)) = error.metadata.as_ref().and_then(|m| m.source.as_ref())
    else {
        return (None, None);
    };
    let path = path.display().to_string();
    let Some((name, content)) = toml_sources.iter().find(|(p, _)| *p == path) else {
        return (None, None);
    };

    match find_key_offset(content, section.first().map(String::as_str), field) {
        Some(offset) => (
            Some(SourceSpan::new(offset.into(), field.len())),
            Some(NamedSource::new(name, content.clone())),
        ),
        None => (None, None),
    }
}

/// Byte offset of `field` as a key inside table `section` (`None` = top level).
///
/// Tracks `[table]` headers line by line, so a key of the same name in
/// another table is never matched.
pub fn find_key_offset(content: &str, section: Option<&str>, field: &str) -> Option<usize> {
    let mut table: Option<&str> = None;
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let start = offset;
        offset += line.len();
        let trimmed = line.trim_start();

        if let Some(header) = trimmed.strip_prefix('[') {
            table = header.split(']').next().map(str::trim);
            continue;
        }
        if table != section {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix(field)
            && rest.trim_start().starts_with('=')
        {
            return Some(start + (line.len() - trimmed.len()));
        }
    }

    None
}

/// Closest candidate to `unknown` by Jaro-Winkler similarity, above the threshold.
pub fn suggest_key(unknown: &str, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .map(|candidate| (strsim::jaro_winkler(unknown, candidate), *candidate))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, candidate)| candidate.to_string())
}

/// Render `errors` to stderr with miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        match handler.render_report(&mut buf, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{buf}"),
            Err(_) => eprintln!("Error: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggests_namespace_for_namspace() {
        let valid = &["backend", "namespace", "document_name", "data_key"];
        assert_eq!(suggest_key("namspace", valid).as_deref(), Some("namespace"));
    }

    #[test]
    fn suggests_memory_backend() {
        assert_eq!(
            suggest_key("memroy", &["kubernetes", "memory"]).as_deref(),
            Some("memory")
        );
    }

    #[test]
    fn no_suggestion_for_distant_typo() {
        let valid = &["username", "password", "signing_key"];
        assert_eq!(suggest_key("zzzzzz", valid), None);
    }

    #[test]
    fn key_offset_respects_tables() {
        let content = "[auth]\nnamespace = \"wrong\"\n\n[store]\nnamspace = \"icap\"\n";
        let offset = find_key_offset(content, Some("store"), "namspace").unwrap();
        assert_eq!(&content[offset..offset + 8], "namspace");

        let offset = find_key_offset(content, Some("auth"), "namespace").unwrap();
        assert_eq!(offset, "[auth]\n".len());

        assert_eq!(find_key_offset(content, Some("server"), "namespace"), None);
        assert_eq!(find_key_offset(content, None, "namespace"), None);
    }

    #[test]
    fn key_offset_ignores_prefix_matches() {
        let content = "[store]\nnamespace_extra = 1\nnamespace = \"icap\"\n";
        let offset = find_key_offset(content, Some("store"), "namespace").unwrap();
        assert_eq!(&content[offset..offset + 11], "namespace =");
    }

    #[test]
    fn missing_key_names_every_variable() {
        let error = ConfigError::missing("store.namespace");
        let help = error.help().expect("help text").to_string();
        assert!(help.contains("NAMESPACE or POLICYD_STORE_NAMESPACE"), "{help}");
        assert!(help.contains("`store.namespace`"));
    }

    #[test]
    fn missing_key_without_deployment_variable() {
        let error = ConfigError::missing("auth.issuer");
        assert!(matches!(
            error,
            ConfigError::MissingKey { env, .. } if env == "POLICYD_AUTH_ISSUER"
        ));
    }
}
