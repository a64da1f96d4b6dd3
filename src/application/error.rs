//! Application-level errors (wraps domain errors)

use thiserror::Error;

use crate::domain::TreeError;

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Tree(#[from] TreeError),

    /// Sort criteria naming fields the selected output does not provide.
    #[error("invalid sort fields: [{}]", .0.join(" "))]
    InvalidSortField(Vec<String>),

    #[error("invalid output mode: {0} (expected one of: table, wide, tree, json, yaml)")]
    InvalidOutputMode(String),

    #[error("invalid parallelism: {0}")]
    InvalidParallelism(String),

    #[error("config error: {message}")]
    Config { message: String },

    #[error("render failed: {message}")]
    Render { message: String },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ApplicationError {
    pub fn render(message: impl Into<String>) -> Self {
        Self::Render {
            message: message.into(),
        }
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
