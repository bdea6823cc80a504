//! RRP-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, RrpError>;

/// Top-level error type for the retention engine.
///
/// Codes group by taxonomy: 1xxx configuration/policy loading, 2xxx network,
/// 3xxx timestamp parsing, 4xxx operator validation, 9xxx internal invariants.
#[derive(Debug, Error)]
pub enum RrpError {
    #[error("[RRP-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[RRP-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[RRP-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[RRP-1004] invalid retention policy: {details}")]
    InvalidPolicy { details: String },

    #[error("[RRP-1005] session credentials unavailable: {details}")]
    Session { details: String },

    #[error("[RRP-1101] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[RRP-2001] request {method} {url} failed: {details}")]
    Network {
        method: &'static str,
        url: String,
        details: String,
    },

    #[error("[RRP-2002] {method} {url} returned status {status}")]
    HttpStatus {
        method: &'static str,
        url: String,
        status: u16,
    },

    #[error("[RRP-2003] malformed response from {url}: {details}")]
    Decode { url: String, details: String },

    #[error("[RRP-3001] malformed timestamp {value:?} on {subject}: {details}")]
    TimestampParse {
        subject: String,
        value: String,
        details: String,
    },

    #[error("[RRP-4001] validation failed: {details}")]
    Validation { details: String },

    #[error("[RRP-9001] pop from an empty {heap} heap")]
    EmptyHeap { heap: &'static str },

    #[error("[RRP-9002] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("repository {repository}: {source}")]
    Repository {
        repository: String,
        #[source]
        source: Box<RrpError>,
    },
}

impl RrpError {
    /// Stable machine-parseable error code.
    ///
    /// The repository wrapper reports the code of the error it wraps.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "RRP-1001",
            Self::MissingConfig { .. } => "RRP-1002",
            Self::ConfigParse { .. } => "RRP-1003",
            Self::InvalidPolicy { .. } => "RRP-1004",
            Self::Session { .. } => "RRP-1005",
            Self::Io { .. } => "RRP-1101",
            Self::Network { .. } => "RRP-2001",
            Self::HttpStatus { .. } => "RRP-2002",
            Self::Decode { .. } => "RRP-2003",
            Self::TimestampParse { .. } => "RRP-3001",
            Self::Validation { .. } => "RRP-4001",
            Self::EmptyHeap { .. } => "RRP-9001",
            Self::Serialization { .. } => "RRP-9002",
            Self::Repository { source, .. } => source.code(),
        }
    }

    /// Coarse taxonomy bucket the error belongs to.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidConfig { .. }
            | Self::MissingConfig { .. }
            | Self::ConfigParse { .. }
            | Self::InvalidPolicy { .. }
            | Self::Session { .. }
            | Self::Io { .. } => ErrorKind::ConfigLoad,
            Self::Network { .. } | Self::HttpStatus { .. } | Self::Decode { .. } => {
                ErrorKind::Network
            }
            Self::TimestampParse { .. } => ErrorKind::TimestampParse,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::EmptyHeap { .. } | Self::Serialization { .. } => ErrorKind::Internal,
            Self::Repository { source, .. } => source.kind(),
        }
    }

    /// Name of the repository being processed when the error surfaced, if known.
    #[must_use]
    pub fn repository(&self) -> Option<&str> {
        match self {
            Self::Repository { repository, .. } => Some(repository),
            _ => None,
        }
    }

    /// Attach the repository being processed. Already-wrapped errors keep
    /// their original repository.
    #[must_use]
    pub fn in_repository(self, repository: impl Into<String>) -> Self {
        match self {
            wrapped @ Self::Repository { .. } => wrapped,
            other => Self::Repository {
                repository: repository.into(),
                source: Box::new(other),
            },
        }
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

/// Error taxonomy used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ConfigLoad,
    Network,
    TimestampParse,
    Validation,
    Internal,
}

impl From<serde_json::Error> for RrpError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for RrpError {
    fn from(value: serde_yaml::Error) -> Self {
        Self::ConfigParse {
            context: "yaml",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for RrpError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
