//! Unified error system for Canopy
//!
//! `TreeError` is the taxonomy every action boundary converts into the
//! `{out, status}` envelope. `StoreError` is what the hierarchy store
//! collaborator reports; it folds into `TreeError` via `From`.

use crate::node::NodeId;
use crate::protocol::ActionKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A field-level message reported by the store when it rejects a save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Attribute name
    pub field: String,
    /// Human-readable message
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// One descendant that failed to persist during a cascade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeFailure {
    pub id: NodeId,
    pub name: String,
    pub errors: Vec<String>,
}

/// Unified error type for all Canopy operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum TreeError {
    /// Request shape or signature invalid; refused before any mutation
    #[error("Validation error: {message}")]
    Validation {
        /// Error message describing the invalid request
        message: String,
    },

    /// Movability, child-allowed or root-policy violation
    #[error("{message}")]
    Domain {
        /// User-facing message
        message: String,
    },

    /// The store rejected a save
    #[error("Persistence error: {message}")]
    Persistence {
        /// Summary message
        message: String,
        /// Field-level messages from the store
        fields: Vec<FieldError>,
    },

    /// One or more descendants failed during an activate/deactivate cascade
    #[error("{message}")]
    Cascade {
        /// Summary message
        message: String,
        /// Itemized per-node failures
        failures: Vec<NodeFailure>,
    },

    /// Node or resource not found
    #[error("Not found: {message}")]
    NotFound {
        /// Error message describing what was not found
        message: String,
    },

    /// Internal system error
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal error
        message: String,
    },
}

impl TreeError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// The fixed refusal raised when a signature does not verify
    pub fn operation_disallowed(action: ActionKind) -> Self {
        Self::validation(crate::messages::operation_disallowed(action.as_str()))
    }

    /// Create a domain error
    pub fn domain(message: impl Into<String>) -> Self {
        Self::Domain {
            message: message.into(),
        }
    }

    /// Create a persistence error
    pub fn persistence(message: impl Into<String>, fields: Vec<FieldError>) -> Self {
        Self::Persistence {
            message: message.into(),
            fields,
        }
    }

    /// Create a cascade error
    pub fn cascade(message: impl Into<String>, failures: Vec<NodeFailure>) -> Self {
        Self::Cascade {
            message: message.into(),
            failures,
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Short kind label used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::Domain { .. } => "domain",
            Self::Persistence { .. } => "persistence",
            Self::Cascade { .. } => "cascade",
            Self::NotFound { .. } => "not_found",
            Self::Internal { .. } => "internal",
        }
    }
}

/// Standard Result type for Canopy operations
pub type Result<T> = std::result::Result<T, TreeError>;

/// Errors reported by the hierarchy store collaborator
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("node {id} not found")]
    NotFound { id: NodeId },

    #[error("validation failed")]
    Validation { fields: Vec<FieldError> },

    #[error("{message}")]
    IllegalMove { message: String },

    #[error("store backend error: {message}")]
    Backend { message: String },
}

impl StoreError {
    pub fn illegal_move(message: impl Into<String>) -> Self {
        Self::IllegalMove {
            message: message.into(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Flatten into the strings shown to the operator
    pub fn messages(&self) -> Vec<String> {
        match self {
            Self::Validation { fields } if !fields.is_empty() => {
                fields.iter().map(ToString::to_string).collect()
            }
            other => vec![other.to_string()],
        }
    }
}

impl From<StoreError> for TreeError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { id } => Self::not_found(format!("node {id}")),
            StoreError::Validation { fields } => {
                Self::persistence("the store rejected the node", fields)
            }
            StoreError::IllegalMove { message } => Self::domain(message),
            StoreError::Backend { message } => Self::persistence(message, Vec::new()),
        }
    }
}

impl From<std::io::Error> for TreeError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::not_found(err.to_string()),
            _ => Self::internal(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for TreeError {
    fn from(err: serde_json::Error) -> Self {
        Self::validation(format!("malformed payload: {err}"))
    }
}
