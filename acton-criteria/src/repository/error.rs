//! Repository error types
//!
//! Errors raised while building or executing a repository query. Configuration
//! errors are raised by this crate; everything else originates in the query
//! backend and is passed through untouched.
//!
//! # Example
//!
//! ```rust
//! use acton_criteria::repository::{RepositoryError, RepositoryErrorKind};
//!
//! let error = RepositoryError::missing_allow_list("UserFilter");
//! assert!(matches!(error.kind, RepositoryErrorKind::Configuration));
//! assert!(error.is_fatal());
//! ```

use std::fmt;

/// Result type for repository operations
pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

/// Operation being performed when the repository error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryOperation {
    /// Applying a registered criterion
    ApplyCriterion,
    /// Fetching every matching record
    Get,
    /// Fetching the first matching record
    First,
    /// Counted pagination
    Paginate,
    /// Pagination without a total count
    SimplePaginate,
    /// Eager loading a relation
    LoadRelation,
}

impl fmt::Display for RepositoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ApplyCriterion => write!(f, "apply_criterion"),
            Self::Get => write!(f, "get"),
            Self::First => write!(f, "first"),
            Self::Paginate => write!(f, "paginate"),
            Self::SimplePaginate => write!(f, "simple_paginate"),
            Self::LoadRelation => write!(f, "load_relation"),
        }
    }
}

/// Category of repository error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryErrorKind {
    /// A criterion or repository was wired up incorrectly (programmer error)
    Configuration,
    /// The backend does not know the referenced column
    UnknownColumn,
    /// The backend does not know the referenced relation
    UnknownRelation,
    /// The backend cannot execute the requested clause
    Unsupported,
    /// Underlying database error
    DatabaseError,
    /// Serialization or deserialization error
    SerializationError,
    /// Other unclassified error
    Other,
}

impl fmt::Display for RepositoryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "configuration"),
            Self::UnknownColumn => write!(f, "unknown_column"),
            Self::UnknownRelation => write!(f, "unknown_relation"),
            Self::Unsupported => write!(f, "unsupported"),
            Self::DatabaseError => write!(f, "database_error"),
            Self::SerializationError => write!(f, "serialization_error"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Structured repository error with operation context
///
/// # Example
///
/// ```rust
/// use acton_criteria::repository::{RepositoryError, RepositoryOperation};
///
/// let error = RepositoryError::unknown_column(RepositoryOperation::Get, "users", "nickname");
/// assert_eq!(
///     error.to_string(),
///     "Repository unknown_column error during get: Unknown column `nickname` [users]"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryError {
    /// The operation being performed when the error occurred
    pub operation: RepositoryOperation,
    /// The category of error
    pub kind: RepositoryErrorKind,
    /// Human-readable error message
    pub message: String,
    /// The entity (table or criterion type) involved
    pub entity_type: Option<String>,
    /// The identifier of the entity involved, when there is one
    pub entity_id: Option<String>,
}

impl RepositoryError {
    /// Create a new repository error
    pub fn new(
        operation: RepositoryOperation,
        kind: RepositoryErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            entity_type: None,
            entity_id: None,
        }
    }

    /// A filter criterion was applied without declaring its filterable columns
    ///
    /// # Example
    ///
    /// ```rust
    /// use acton_criteria::repository::RepositoryError;
    ///
    /// let error = RepositoryError::missing_allow_list("PostFilter");
    /// assert_eq!(error.entity_type.as_deref(), Some("PostFilter"));
    /// ```
    pub fn missing_allow_list(criterion: impl Into<String>) -> Self {
        let criterion = criterion.into();
        Self {
            operation: RepositoryOperation::ApplyCriterion,
            kind: RepositoryErrorKind::Configuration,
            message: format!("Implement a columns allow-list in the {criterion} criterion"),
            entity_type: Some(criterion),
            entity_id: None,
        }
    }

    /// Create an unknown column error
    pub fn unknown_column(
        operation: RepositoryOperation,
        table: impl Into<String>,
        column: impl AsRef<str>,
    ) -> Self {
        Self {
            operation,
            kind: RepositoryErrorKind::UnknownColumn,
            message: format!("Unknown column `{}`", column.as_ref()),
            entity_type: Some(table.into()),
            entity_id: None,
        }
    }

    /// Create an unknown relation error
    pub fn unknown_relation(table: impl Into<String>, relation: impl AsRef<str>) -> Self {
        Self {
            operation: RepositoryOperation::LoadRelation,
            kind: RepositoryErrorKind::UnknownRelation,
            message: format!("Call to undefined relationship `{}`", relation.as_ref()),
            entity_type: Some(table.into()),
            entity_id: None,
        }
    }

    /// Create an unsupported clause error
    pub fn unsupported(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::Unsupported, message)
    }

    /// Create a database error
    pub fn database_error(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::DatabaseError, message)
    }

    /// Add entity context to an existing error
    #[must_use]
    pub fn with_entity(
        mut self,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Set the operation that caused the error
    #[must_use]
    pub fn with_operation(mut self, operation: RepositoryOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Whether this is a programmer error that no retry or fallback can fix
    ///
    /// # Example
    ///
    /// ```rust
    /// use acton_criteria::repository::{RepositoryError, RepositoryOperation};
    ///
    /// assert!(RepositoryError::missing_allow_list("Filter").is_fatal());
    /// assert!(!RepositoryError::database_error(RepositoryOperation::Get, "gone").is_fatal());
    /// ```
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind, RepositoryErrorKind::Configuration)
    }
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Repository {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        match (&self.entity_type, &self.entity_id) {
            (Some(entity_type), Some(entity_id)) => write!(f, " [{entity_type}: {entity_id}]")?,
            (Some(entity_type), None) => write!(f, " [{entity_type}]")?,
            _ => {}
        }
        Ok(())
    }
}

impl std::error::Error for RepositoryError {}
