//! Error types.
//!
//! Inside a scan only [`ScanError`] ends the run. Everything below the API
//! level ([`GatewayError`] for a single remote call, [`WhitelistError`] for
//! one policy file) is absorbed by the scanner and turned into degraded data.
//! [`ConfigError`] and [`ReportError`] occur before or after scanning.

use std::path::PathBuf;
use thiserror::Error;

/// A remote call to the API inventory failed.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The transport binary could not be started at all.
    #[error("failed to run `{binary}`: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    /// The remote call ran and reported a failure.
    #[error("{operation} failed: {message}")]
    CommandFailed { operation: String, message: String },

    /// The remote call succeeded but its payload could not be decoded.
    #[error("{operation} returned malformed data: {source}")]
    Malformed {
        operation: String,
        #[source]
        source: serde_json::Error,
    },

    /// The requested record does not exist.
    #[error("{0} not found")]
    NotFound(String),
}

/// A whitelist policy file could not be loaded.
#[derive(Debug, Error)]
pub enum WhitelistError {
    #[error("failed to read whitelist {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse whitelist {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Report files could not be created or written.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to create report directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write report {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors that abort a whole run.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("cannot enumerate APIs: {0}")]
    ListApis(#[source] GatewayError),
}
