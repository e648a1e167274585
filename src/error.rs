//! Error types for the vector index
//!
//! This module provides structured error types using thiserror for better
//! error handling and actionable error messages.

use std::path::PathBuf;
use thiserror::Error;

/// Broad classification of an [`IndexError`].
///
/// Hosts decide user-visible behavior from this: artifact errors abort
/// startup, everything else is reported and the index stays usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing projector artifact. Fatal at construction.
    Artifact,
    /// File system failure during save or load.
    Io,
    /// A store file that is readable but structurally invalid.
    Format,
    /// Bad caller input (zero `k`, wrong embedding length).
    InvalidArgument,
    /// Configuration could not be read or is inconsistent.
    Config,
}

/// Main error type for index operations
#[derive(Error, Debug)]
pub enum IndexError {
    /// Projector artifact could not be used
    #[error("Invalid projector artifact '{path}': {reason}")]
    Artifact { path: PathBuf, reason: String },

    /// File system errors
    #[error("I/O failure on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Store file parsed as bytes but failed validation
    #[error("Invalid index file '{path}': {reason}")]
    Format { path: PathBuf, reason: String },

    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Configuration errors
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },
}

impl IndexError {
    pub(crate) fn artifact(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Artifact {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Format {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Maps this error onto the four-way taxonomy hosts act on.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Artifact { .. } => ErrorKind::Artifact,
            Self::Io { .. } => ErrorKind::Io,
            Self::Format { .. } => ErrorKind::Format,
            Self::InvalidArgument { .. } | Self::DimensionMismatch { .. } => {
                ErrorKind::InvalidArgument
            }
            Self::Config { .. } => ErrorKind::Config,
        }
    }

    /// True when the error means "nothing was saved at this path yet".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }

    /// Get a stable status code for this error type.
    ///
    /// Returns a string identifier that can be used in JSON responses
    /// for programmatic error handling.
    pub fn status_code(&self) -> String {
        match self {
            Self::Artifact { .. } => "ARTIFACT_ERROR",
            Self::Io { .. } => "IO_ERROR",
            Self::Format { .. } => "FORMAT_ERROR",
            Self::InvalidArgument { .. } => "INVALID_ARGUMENT",
            Self::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            Self::Config { .. } => "CONFIG_ERROR",
        }
        .to_string()
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::Artifact { .. } => vec![
                "The projector artifact ships with the application; reinstall or rebuild it",
                "Check that projector_path in settings.toml points at a .nsp file",
            ],
            Self::Io { .. } => vec![
                "Check disk space and permissions in the index directory",
                "A missing index file on first run is expected; add vectors and save",
            ],
            Self::Format { .. } => vec![
                "The index file may be corrupted or from another projector; rebuild it",
                "Run 'nearshot clear' and re-add your embeddings",
            ],
            Self::DimensionMismatch { .. } => vec![
                "Ensure every embedding comes from the same feature extractor",
                "Embeddings must match the projector input dimension",
            ],
            Self::Config { .. } => vec!["Run 'nearshot init --force' to regenerate settings"],
            Self::InvalidArgument { .. } => vec![],
        }
    }
}

/// Result type alias for index operations
pub type IndexResult<T> = Result<T, IndexError>;
