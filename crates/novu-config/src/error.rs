//! Configuration errors

use std::path::{Path, PathBuf};
use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configuration, include or secrets file could not be read
    #[error("cannot read {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not valid YAML: {source}", path.display())]
    ParseYaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("!secret {key} is not defined in secrets.yaml")]
    SecretNotFound { key: String },

    #[error("!include {path}: {reason}")]
    InvalidIncludePath { path: String, reason: String },

    /// A file includes itself, directly or through other files
    #[error("include cycle: {}", display_chain(.chain))]
    CircularInclude { chain: Vec<PathBuf> },

    #[error("!env_var {var} is not set")]
    EnvVarNotFound { var: String },

    #[error("invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    /// A top-level section did not match its settings type
    #[error("invalid '{section}' section: {source}")]
    Section {
        section: String,
        #[source]
        source: serde_yaml::Error,
    },
}

fn display_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.file_name().map(Path::new).unwrap_or(p.as_path()).display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}
