//! Error types for GLM reading operations.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::schema::Family;

/// Result type for GLM reader operations.
pub type GlmResult<T> = Result<T, GlmError>;

/// Error types for GLM reading.
///
/// Every variant names the file it came from so a schema mismatch can be
/// diagnosed from the message alone.
#[derive(Error, Debug)]
pub enum GlmError {
    /// The requested path does not exist.
    #[error("{}: file not found", path.display())]
    NotFound { path: PathBuf },

    /// Open/read failure below the format layer.
    #[error("{}: I/O error: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Structural violation: missing dimension or variable, wrong length.
    #[error("{}: invalid format in {context}: expected {expected}", path.display())]
    Format {
        path: PathBuf,
        context: String,
        expected: String,
    },

    /// The stored type cannot be converted losslessly to the declared type.
    #[error("{}: variable '{variable}' is stored as {found}, cannot convert losslessly to {expected}", path.display())]
    TypeMismatch {
        path: PathBuf,
        variable: String,
        found: String,
        expected: String,
    },

    /// A child record references a parent that cannot be resolved.
    #[error("{}: {child} record {index} references {parent} id {parent_id}: {reason}", path.display())]
    Linkage {
        path: PathBuf,
        child: Family,
        parent: Family,
        index: usize,
        parent_id: i64,
        reason: String,
    },

    /// Two parent records share an id, so children cannot resolve to one.
    #[error("{}: {family} record {index} repeats id {id} of record {first}", path.display())]
    DuplicateId {
        path: PathBuf,
        family: Family,
        index: usize,
        id: i64,
        first: usize,
    },

    /// Invalid reader configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl GlmError {
    /// Create a Format error.
    pub fn format(
        path: impl AsRef<Path>,
        context: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::Format {
            path: path.as_ref().to_path_buf(),
            context: context.into(),
            expected: expected.into(),
        }
    }

    /// Create a TypeMismatch error.
    pub fn type_mismatch(
        path: impl AsRef<Path>,
        variable: impl Into<String>,
        found: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            path: path.as_ref().to_path_buf(),
            variable: variable.into(),
            found: found.into(),
            expected: expected.into(),
        }
    }

    /// Create an Io error.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// True for the `Format` variant.
    pub fn is_format(&self) -> bool {
        matches!(self, Self::Format { .. })
    }
}
