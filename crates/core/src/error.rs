//! Error types for ossdu-core
//!
//! A single error type shared by the core, the S3 adapter and the CLI.
//! Each variant maps onto one of the CLI exit codes.

use thiserror::Error;

/// Result type alias for ossdu-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for ossdu-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid remote path
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Invalid option value
    #[error("Invalid argument: {0}")]
    Usage(String),

    /// Endpoint profile not found
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Authentication or permission failure reported by the service
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Bucket or upload does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Transport or service error
    #[error("Network error: {0}")]
    Network(String),

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Get the appropriate exit code for this error
    pub const fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidPath(_) | Error::Usage(_) | Error::Config(_) => 2, // UsageError
            Error::Network(_) => 3,                                          // NetworkError
            Error::Auth(_) => 4,                                             // AuthError
            Error::NotFound(_) | Error::ProfileNotFound(_) => 5,             // NotFound
            _ => 1,                                                          // GeneralError
        }
    }

    /// Whether this error means the listed resource has gone away
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
