//! Compile errors.
//!
//! Every error aborts the whole compile and names the field path where it
//! was detected.

use std::fmt;

use crate::sql::Dialect;

/// Dot-joined path of output names from the top-level field down.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    pub fn root(name: &str) -> Self {
        Self(vec![name.to_string()])
    }

    /// Path extended by one segment.
    pub fn child(&self, name: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(name.to_string());
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("<root>")
        } else {
            f.write_str(&self.0.join("."))
        }
    }
}

/// Category of a [`CompileError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Schema,
    Operator,
    UnknownAggregator,
    FilterShape,
    Argument,
    Unsupported,
}

/// Error raised while compiling a selection.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    /// Missing relation metadata, unknown type or field.
    #[error("Schema error at {path}: {reason}")]
    Schema { path: FieldPath, reason: String },

    #[error("Unknown operator '{operator}' at {path}")]
    Operator { path: FieldPath, operator: String },

    #[error("Unknown aggregator '{name}' at {path}")]
    UnknownAggregator { path: FieldPath, name: String },

    /// A filter value has the wrong shape.
    #[error("Malformed filter at {path}: {reason}")]
    FilterShape { path: FieldPath, reason: String },

    #[error("Invalid argument at {path}: {reason}")]
    Argument { path: FieldPath, reason: String },

    #[error("{feature} is not supported by {dialect} (at {path})")]
    Unsupported {
        path: FieldPath,
        dialect: Dialect,
        feature: String,
    },
}

impl CompileError {
    pub fn schema(path: &FieldPath, reason: impl Into<String>) -> Self {
        CompileError::Schema {
            path: path.clone(),
            reason: reason.into(),
        }
    }

    pub fn operator(path: &FieldPath, operator: &str) -> Self {
        CompileError::Operator {
            path: path.clone(),
            operator: operator.to_string(),
        }
    }

    pub fn unknown_aggregator(path: &FieldPath, name: &str) -> Self {
        CompileError::UnknownAggregator {
            path: path.clone(),
            name: name.to_string(),
        }
    }

    pub fn filter_shape(path: &FieldPath, reason: impl Into<String>) -> Self {
        CompileError::FilterShape {
            path: path.clone(),
            reason: reason.into(),
        }
    }

    pub fn argument(path: &FieldPath, reason: impl Into<String>) -> Self {
        CompileError::Argument {
            path: path.clone(),
            reason: reason.into(),
        }
    }

    pub fn unsupported(path: &FieldPath, dialect: Dialect, feature: impl Into<String>) -> Self {
        CompileError::Unsupported {
            path: path.clone(),
            dialect,
            feature: feature.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CompileError::Schema { .. } => ErrorKind::Schema,
            CompileError::Operator { .. } => ErrorKind::Operator,
            CompileError::UnknownAggregator { .. } => ErrorKind::UnknownAggregator,
            CompileError::FilterShape { .. } => ErrorKind::FilterShape,
            CompileError::Argument { .. } => ErrorKind::Argument,
            CompileError::Unsupported { .. } => ErrorKind::Unsupported,
        }
    }

    /// Field path where the error was detected.
    pub fn path(&self) -> &FieldPath {
        match self {
            CompileError::Schema { path, .. }
            | CompileError::Operator { path, .. }
            | CompileError::UnknownAggregator { path, .. }
            | CompileError::FilterShape { path, .. }
            | CompileError::Argument { path, .. }
            | CompileError::Unsupported { path, .. } => path,
        }
    }
}

pub type CompileResult<T> = Result<T, CompileError>;
