//! Error types for the authentication harness.
//!
//! Only configuration problems are errors. Transport failures and non-2xx
//! responses are reported as data inside [`ProbeResult`](crate::ProbeResult).

use crate::auth::AuthMethod;
use thiserror::Error;

/// Configuration problems detected before any network call is made.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The target URL is empty, unparsable, or not http(s).
    #[error("invalid target URL `{url}`: {reason}")]
    InvalidTargetUrl { url: String, reason: String },

    /// A credential field required by the selected method is missing.
    #[error("{field} is required for {method} authentication")]
    MissingCredential {
        method: AuthMethod,
        field: &'static str,
    },

    /// The operation cannot be driven with the selected method.
    #[error("{operation} requires {required} authentication, got {method}")]
    UnsupportedMethod {
        operation: &'static str,
        required: AuthMethod,
        method: AuthMethod,
    },

    /// Header or cookie input was not a JSON object of strings.
    #[error("{field} must be a valid JSON object of strings: {source}")]
    InvalidJson {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A header name or value cannot be sent over HTTP.
    #[error("invalid header `{name}`: {reason}")]
    InvalidHeader { name: String, reason: String },

    /// A validation check name is not part of the known check set.
    #[error("unknown validation check: {0}")]
    UnknownCheck(String),

    /// A harness setting is out of range.
    #[error("invalid setting `{setting}`: {reason}")]
    InvalidSetting {
        setting: &'static str,
        reason: String,
    },

    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The config file could not be parsed.
    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Errors that prevent a suite from running at all.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The suite was rejected before any probe was issued.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// No catalog case matched the requested filter.
    #[error("no test cases matched filter: {0}")]
    NoMatchingCases(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
