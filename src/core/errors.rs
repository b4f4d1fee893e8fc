//! APL-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, AplError>;

/// Top-level error type for the telemetry simulator.
#[derive(Debug, Error)]
pub enum AplError {
    #[error("[APL-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[APL-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[APL-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[APL-2001] malformed record {path}: {details}")]
    RecordParse { path: PathBuf, details: String },

    #[error("[APL-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[APL-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[APL-3003] channel closed in component {component}")]
    ChannelClosed { component: &'static str },

    #[error("[APL-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl AplError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "APL-1001",
            Self::MissingConfig { .. } => "APL-1002",
            Self::ConfigParse { .. } => "APL-1003",
            Self::RecordParse { .. } => "APL-2001",
            Self::Serialization { .. } => "APL-2101",
            Self::Io { .. } => "APL-3002",
            Self::ChannelClosed { .. } => "APL-3003",
            Self::Runtime { .. } => "APL-3900",
        }
    }

    /// Whether retrying might resolve the failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Io { .. } | Self::ChannelClosed { .. } | Self::Runtime { .. }
        )
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

impl From<serde_json::Error> for AplError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for AplError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
