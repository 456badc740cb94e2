//! Configuration errors
//!
//! This module defines error types for the configuration module: file I/O,
//! YAML parsing, and the validation invariants in [`super::validator`].

use std::fmt;
use std::error::Error;
use std::path::PathBuf;

/// Configuration error type
#[derive(Debug)]
pub enum ConfigError {
    /// File not found
    FileNotFound(PathBuf),

    /// Permission denied when accessing file
    FilePermissionDenied(PathBuf),

    /// Error reading or writing a file
    FileReadError(PathBuf, String),

    /// Error parsing or encoding YAML
    ParseError(String),

    /// A validation invariant was violated; the message names the first
    /// failing check, matching the validator's "first violation wins" contract.
    Invalid(String),

    /// Other error
    Other(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) =>
                write!(f, "configuration file not found: {}", path.display()),

            ConfigError::FilePermissionDenied(path) =>
                write!(f, "permission denied when accessing configuration file: {}", path.display()),

            ConfigError::FileReadError(path, err) =>
                write!(f, "error reading configuration file {}: {}", path.display(), err),

            ConfigError::ParseError(msg) =>
                write!(f, "error parsing configuration: {}", msg),

            ConfigError::Invalid(msg) =>
                write!(f, "{}", msg),

            ConfigError::Other(msg) =>
                write!(f, "configuration error: {}", msg),
        }
    }
}

impl Error for ConfigError {}

/// Result type alias for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound =>
                ConfigError::FileNotFound(PathBuf::from("unknown")),

            std::io::ErrorKind::PermissionDenied =>
                ConfigError::FilePermissionDenied(PathBuf::from("unknown")),

            _ => ConfigError::Other(err.to_string()),
        }
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

// Convert to crate's common error type
impl From<ConfigError> for crate::common::ProxyError {
    fn from(err: ConfigError) -> Self {
        crate::common::ProxyError::Config(err.to_string())
    }
}
