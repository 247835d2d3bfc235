//! Expression parse and evaluation errors.

use thiserror::Error;

/// Result type for expression operations.
pub type PropsResult<T> = Result<T, PropsError>;

/// Errors from parsing or expanding a property expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropsError {
    #[error("unterminated property reference in '{0}'")]
    Unterminated(String),

    #[error("invalid property name '{name}' in '{expr}'")]
    InvalidName { expr: String, name: String },

    #[error("more than one list reference in '{0}'")]
    MultipleListReferences(String),

    #[error("unknown property: {0}")]
    UnknownProperty(String),

    #[error("list property '{0}' referenced where a single value is required")]
    ListInScalarContext(String),
}
