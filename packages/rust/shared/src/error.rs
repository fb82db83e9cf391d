//! Error types for coursepath.
//!
//! Library crates use [`CoursePathError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all coursepath operations.
///
/// Only [`UnrecognizedDocumentFormat`](Self::UnrecognizedDocumentFormat) and
/// [`InvalidRequirementSchema`](Self::InvalidRequirementSchema) abort the pipeline.
/// [`CourseIndexUnavailable`](Self::CourseIndexUnavailable) is raised by the catalog
/// loader; callers degrade to planning without an index.
#[derive(Debug, thiserror::Error)]
pub enum CoursePathError {
    /// No sections and no course lines were found in the audit text.
    #[error("unrecognized document format: no requirement sections or course lines found")]
    UnrecognizedDocumentFormat,

    /// The requirement schema has no program for the declared major/subplan,
    /// or the selected program is malformed.
    #[error("invalid requirement schema: {message}")]
    InvalidRequirementSchema { message: String },

    /// The course-offerings index could not be read or decoded.
    #[error("course index unavailable: {message}")]
    CourseIndexUnavailable { message: String },

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Dataset or value parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CoursePathError>;

impl CoursePathError {
    /// Create a schema error from any displayable message.
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::InvalidRequirementSchema {
            message: msg.into(),
        }
    }

    /// Create an index-unavailable error from any displayable message.
    pub fn index_unavailable(msg: impl Into<String>) -> Self {
        Self::CourseIndexUnavailable {
            message: msg.into(),
        }
    }

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

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error aborts the pipeline, as opposed to degrading one stage.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::CourseIndexUnavailable { .. })
    }
}
