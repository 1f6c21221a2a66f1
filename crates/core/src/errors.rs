//! Error types for the GeoVC core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them all for callers that want a
//! single error type.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

/// Errors from the HTTP transport layer.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP-level failure (connectivity, TLS, request building).
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server rejected the credentials.
    #[error("authentication failed (HTTP {status})")]
    AuthenticationFailed { status: u16 },

    /// The server returned a non-success status code.
    #[error("server error (HTTP {status}): {body}")]
    Status { status: u16, body: String },
}

// ---------------------------------------------------------------------------
// Repository errors
// ---------------------------------------------------------------------------

/// Errors from repository operations.
///
/// Merge conflicts are NOT an error: they are reported as data in
/// [`ImportResult::conflicts`](crate::workingcopy::ImportResult) and are a
/// normal branch of control flow for callers.
#[derive(Debug, Error)]
pub enum RepoError {
    /// A symbolic ref, branch or tag does not exist.
    #[error("ref not found: {0}")]
    RefNotFound(String),

    /// Attempted to create a branch or tag whose name is already taken.
    #[error("ref already exists: {0}")]
    RefAlreadyExists(String),

    /// Transport-level failure reaching the repository server.
    #[error("repository access error: {0}")]
    Access(#[from] ApiError),

    /// A server response did not match the expected schema.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Local I/O failure (e.g. writing an exported file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A required environment variable is not set.
    #[error("required environment variable '{var}' is not set (referenced by config field '{field}')")]
    EnvVarMissing { var: String, field: String },

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
