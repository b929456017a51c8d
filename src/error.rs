//! Error types for claude-stitch.
//!
//! Two kinds of failure exist in this crate and they are deliberately kept
//! apart. `StitchError` is for operations that cannot produce a result at all
//! (a missing logs root, an unwritable config file, an unknown project id).
//! Per-line and per-file degradation during ingestion is *not* an error: it is
//! recorded as an [`IngestWarning`] in the run report and processing continues.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Primary error type for claude-stitch operations.
#[derive(Error, Debug)]
pub enum StitchError {
    /// Logs root directory not found.
    #[error("Logs root not found. Expected at: {expected_path}")]
    LogsRootNotFound {
        /// Expected path to the logs root.
        expected_path: PathBuf,
    },

    /// Permission denied when accessing a file or directory.
    #[error("Permission denied: {path}")]
    PermissionDenied {
        /// Path where access was denied.
        path: PathBuf,
    },

    /// Project not found.
    #[error("Project not found: {project_id}")]
    ProjectNotFound {
        /// Project id that was not found.
        project_id: String,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Human-readable error message.
        message: String,
    },

    /// Invalid argument.
    #[error("Invalid argument '{name}': {reason}")]
    InvalidArgument {
        /// Name of the invalid argument.
        name: String,
        /// Reason why the argument is invalid.
        reason: String,
    },

    /// I/O error.
    #[error("I/O error: {context}")]
    IoError {
        /// Context describing the operation that failed.
        context: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Serialization error.
    #[error("Serialization error: {context}")]
    SerializationError {
        /// Context describing the operation that failed.
        context: String,
        /// Underlying serde_json error.
        #[source]
        source: serde_json::Error,
    },
}

impl StitchError {
    /// Create a new I/O error with context.
    #[must_use]
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::IoError {
            context: context.into(),
            source,
        }
    }

    /// Create a new serialization error with context.
    #[must_use]
    pub fn serialization(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::SerializationError {
            context: context.into(),
            source,
        }
    }

    /// Create a new invalid-config error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Get the exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::LogsRootNotFound { .. } | Self::ProjectNotFound { .. } => 3,
            Self::PermissionDenied { .. } => 4,
            Self::InvalidConfig { .. } => 5,
            Self::InvalidArgument { .. } => 64,
            Self::IoError { .. } => 74,
            Self::SerializationError { .. } => 65,
        }
    }
}

/// Result type alias for claude-stitch operations.
pub type Result<T> = std::result::Result<T, StitchError>;

impl From<std::io::Error> for StitchError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError {
            context: "I/O operation failed".to_string(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for StitchError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError {
            context: "JSON operation failed".to_string(),
            source: err,
        }
    }
}

/// A recoverable ingestion problem, recorded instead of raised.
///
/// Malformed lines carry a line number; unreadable files do not. Warnings are
/// accumulated across a pipeline run and returned alongside partial results —
/// no ingestion condition aborts the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestWarning {
    /// Logical path of the file the problem occurred in.
    pub file: String,
    /// 1-indexed line number, for line-level problems.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// Human-readable description.
    pub message: String,
}

impl IngestWarning {
    /// Warning for a single malformed line.
    #[must_use]
    pub fn line(file: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line: Some(line),
            message: message.into(),
        }
    }

    /// Warning for a whole file (unreadable, skipped).
    #[must_use]
    pub fn file(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line: None,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for IngestWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}: {}", self.file, line, self.message),
            None => write!(f, "{}: {}", self.file, self.message),
        }
    }
}
