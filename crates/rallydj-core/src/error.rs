use arrow::error::ArrowError;
use thiserror::Error;

/// Shape errors raised when a document does not have the structure a transform expects.
#[derive(Debug, Error)]
pub enum ShapeError {
    #[error("missing column '{column}'")]
    MissingColumn { column: String },

    #[error("no '{locale}' translation for {context}")]
    MissingTranslation { locale: String, context: String },

    #[error("duplicate label for variable '{variable}' in locale '{locale}'")]
    DuplicateLabelKey { variable: String, locale: String },

    #[error("malformed record in '{column}': {reason}")]
    MalformedRecord { column: String, reason: String },

    #[error("no rows in {resource}")]
    EmptyResult { resource: String },

    #[error("arrow error: {0}")]
    Arrow(#[from] ArrowError),
}

impl ShapeError {
    pub(crate) fn missing(column: &str) -> Self {
        Self::MissingColumn {
            column: column.to_string(),
        }
    }

    pub(crate) fn malformed(column: &str, reason: impl ToString) -> Self {
        Self::MalformedRecord {
            column: column.to_string(),
            reason: reason.to_string(),
        }
    }
}
