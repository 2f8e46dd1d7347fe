//! Error types for the load testing harness.
//!
//! Defines [`LoadTestError`] for configuration errors and [`RequestFailure`]
//! for the per-request classifications produced by the validators and the
//! HTTP client during a run.

use std::fmt;

/// Errors that occur during load test configuration parsing, validation, or file I/O.
#[derive(Debug, thiserror::Error)]
pub enum LoadTestError {
    /// TOML parse failure -- the config file contains invalid TOML syntax
    /// or does not match the expected schema.
    #[error("Failed to parse config TOML: {source}")]
    ConfigParse {
        #[from]
        source: toml::de::Error,
    },

    /// Semantic validation failure -- the config parsed successfully but
    /// contains invalid values (e.g., empty query set, zero users).
    #[error("Config validation error: {message}")]
    ConfigValidation { message: String },

    /// File I/O failure -- the config file could not be read from disk.
    #[error("Failed to read config file '{path}': {source}")]
    ConfigIo {
        source: std::io::Error,
        path: String,
    },

    /// CLI-level error (config not found, HTTP client construction).
    #[error("{message}")]
    Cli { message: String },
}

/// Value observed for a JSON field during typed lookup.
///
/// Replaces silent coercion: a field is either present with the expected
/// type, absent, or present with some other JSON type.
#[derive(Debug, Clone, PartialEq)]
pub enum Field<T> {
    /// Field present with the expected type.
    Present(T),
    /// Field missing from the body (or the body is not an object).
    Absent,
    /// Field present but not of the expected type.
    WrongType(serde_json::Value),
}

impl<T> Field<T> {
    /// Returns the present value, or `default` when the field is absent.
    ///
    /// A wrong-typed field yields `None` so callers can classify it.
    pub fn or_default_if_absent(self, default: T) -> Option<T> {
        match self {
            Self::Present(v) => Some(v),
            Self::Absent => Some(default),
            Self::WrongType(_) => None,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present(v) => write!(f, "{v}"),
            Self::Absent => f.write_str("absent"),
            Self::WrongType(v) => write!(f, "{v}"),
        }
    }
}

/// Per-request failure classification.
///
/// Every variant is non-fatal: a failure is recorded as one data point and
/// the simulated user moves on. The [`fmt::Display`] output is the failure
/// reason shown in the summary's failure table.
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum RequestFailure {
    /// The server answered with a status other than the one the case expects.
    #[error("HTTP {actual} (expected {expected})")]
    UnexpectedStatus { expected: u16, actual: u16 },

    /// The body was expected to be JSON but did not parse.
    #[error("Invalid JSON")]
    InvalidJson { message: String },

    /// The search backend did not scan the fixed number of items.
    #[error("checked != {expected} (got {actual})")]
    CheckedMismatch { expected: u64, actual: Field<u64> },

    /// The search result set is oversized or malformed.
    #[error("bad payload: {detail}")]
    BadPayload { detail: String },

    /// The health endpoint answered but did not report `status: ok`.
    #[error("unhealthy: {detail}")]
    Unhealthy { detail: String },

    /// The request exceeded the configured per-request timeout.
    #[error("Request timed out")]
    Timeout,

    /// Connection-level failure (DNS resolution, TCP connect, TLS handshake).
    #[error("Connection error: {message}")]
    Connection { message: String },
}

impl RequestFailure {
    /// Returns the error category as a static string for metrics classification.
    ///
    /// Categories: `"http"`, `"parse"`, `"contract"`, `"timeout"`, `"connection"`.
    pub fn error_category(&self) -> &'static str {
        match self {
            Self::UnexpectedStatus { .. } => "http",
            Self::InvalidJson { .. } => "parse",
            Self::CheckedMismatch { .. } | Self::BadPayload { .. } | Self::Unhealthy { .. } => {
                "contract"
            },
            Self::Timeout => "timeout",
            Self::Connection { .. } => "connection",
        }
    }

    /// Returns `true` if the server never produced a response.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Timeout | Self::Connection { .. })
    }

    /// Classify a [`reqwest::Error`] into the appropriate [`RequestFailure`] variant.
    pub fn classify_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Connection {
                message: err.to_string(),
            }
        }
    }
}
