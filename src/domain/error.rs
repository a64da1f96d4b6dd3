//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Errors raised while exploring, ordering or rendering a hierarchy.
///
/// Traversal errors never abort a run: they are attached to the element
/// that caused them and show up in the rendered error column.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("{path}: {message}")]
    Enumeration { path: String, message: String },

    #[error("{path}: {message}")]
    Stat { path: String, message: String },

    #[error("cycle")]
    CycleDetected,

    #[error("already shown")]
    AlreadyVisited,

    #[error("unknown node")]
    UnknownNode(String),

    #[error("hierarchy prefix not indexed: {path}")]
    ComparatorInput { path: String },

    #[error("worker pool: {0}")]
    Pool(String),
}

impl TreeError {
    /// Create an enumeration error for a failed child listing.
    pub fn enumeration(path: impl Into<String>, message: impl ToString) -> Self {
        Self::Enumeration {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Create a stat error for an element whose metadata could not be read.
    pub fn stat(path: impl Into<String>, message: impl ToString) -> Self {
        Self::Stat {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// Result type for domain operations.
pub type TreeResult<T> = Result<T, TreeError>;
