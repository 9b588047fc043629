//! engine error types

use thiserror::Error;

use crate::tree::NodePath;

pub type QueryResult<T> = Result<T, QueryError>;

/// structural errors raised at the mutation boundary
///
/// a failed mutation leaves the tree untouched and emits no notification
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    /// field id not present in the registry
    #[error("unknown field: '{field}'")]
    UnknownField {
        field: String,
        /// similar field ids
        suggestions: Vec<String>,
    },

    #[error("unknown entity: '{0}'")]
    UnknownEntity(String),

    /// operator not permitted for the field
    #[error("operator '{operator}' is not allowed for field '{field}'")]
    InvalidOperator { field: String, operator: String },

    /// mutation target is not a group of the active tree
    #[error("no group at {0}")]
    InvalidParent(NodePath),

    #[error("no rule at {0}")]
    NotARule(NodePath),

    #[error("field registry has no fields")]
    EmptyRegistry,
}

impl QueryError {
    pub fn unknown_field(field: impl Into<String>) -> Self {
        QueryError::UnknownField {
            field: field.into(),
            suggestions: Vec::new(),
        }
    }

    /// similar names to offer the user, if any
    pub fn suggestions(&self) -> &[String] {
        match self {
            QueryError::UnknownField { suggestions, .. } => suggestions,
            _ => &[],
        }
    }
}
