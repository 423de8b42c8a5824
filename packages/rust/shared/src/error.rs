//! Error types for Coursewise.
//!
//! Library crates use [`CoursewiseError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! [`FetchError`] is different: it describes why a single URL could not be
//! verified and is stored as data inside a scrape result, never raised.

use std::path::PathBuf;

/// Top-level error type for all Coursewise operations.
#[derive(Debug, thiserror::Error)]
pub enum CoursewiseError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error outside of a per-URL verification.
    #[error("network error: {0}")]
    Network(String),

    /// Structured data could not be parsed (tables, completion output).
    #[error("parse error: {message}")]
    Parse { message: String },

    /// The course catalog is missing required columns or is otherwise unusable.
    #[error("catalog error: {0}")]
    Catalog(String),

    /// Text-completion service error (transport, API status, empty output).
    #[error("completion error: {0}")]
    Completion(String),

    /// Login failed or the session lacks the required role.
    #[error("{0}")]
    Auth(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (empty inputs, bad option values, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CoursewiseError>;

impl CoursewiseError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// FetchError
// ---------------------------------------------------------------------------

/// Why a single URL could not be verified.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Navigation did not finish within the per-item ceiling.
    #[error("Timeout {timeout_ms}ms exceeded while navigating to {url}")]
    Timeout { url: String, timeout_ms: u64 },

    /// DNS, connect, TLS or body-read failure.
    #[error("network error while navigating to {url}: {message}")]
    Network { url: String, message: String },

    /// The server answered with a non-success status.
    #[error("HTTP {status} returned by {url}")]
    HttpStatus { url: String, status: u16 },

    /// The URL or the returned document could not be parsed.
    #[error("cannot load {url}: {message}")]
    Parse { url: String, message: String },
}

impl FetchError {
    /// Short machine-friendly label for logs and summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::Network { .. } => "network",
            Self::HttpStatus { .. } => "http_status",
            Self::Parse { .. } => "parse",
        }
    }
}
