//! Timestamp ordering criteria

use super::Criterion;
use crate::repository::{OrderDirection, QueryBuilder, RepositoryResult};

/// Creation timestamp column
pub const CREATED_AT: &str = "created_at";

/// Modification timestamp column
pub const UPDATED_AT: &str = "updated_at";

/// Order results by creation time, newest first unless told otherwise
///
/// # Example
///
/// ```rust
/// use acton_criteria::criteria::OrderedByCreation;
/// use acton_criteria::repository::OrderDirection;
///
/// assert_eq!(OrderedByCreation::default().direction(), OrderDirection::Descending);
/// assert_eq!(OrderedByCreation::new(false).direction(), OrderDirection::Ascending);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderedByCreation {
    direction: OrderDirection,
}

impl OrderedByCreation {
    /// Order by `created_at`, descending when `descending` is true
    #[must_use]
    pub const fn new(descending: bool) -> Self {
        Self {
            direction: OrderDirection::from_descending(descending),
        }
    }

    /// Oldest first
    #[must_use]
    pub const fn ascending() -> Self {
        Self::new(false)
    }

    #[must_use]
    pub const fn direction(&self) -> OrderDirection {
        self.direction
    }
}

impl Default for OrderedByCreation {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Criterion for OrderedByCreation {
    fn apply(&self, query: &mut dyn QueryBuilder) -> RepositoryResult<()> {
        query.order_by(CREATED_AT, self.direction);
        Ok(())
    }
}

/// Order results by modification time, most recently changed first unless told otherwise
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderedByModification {
    direction: OrderDirection,
}

impl OrderedByModification {
    /// Order by `updated_at`, descending when `descending` is true
    #[must_use]
    pub const fn new(descending: bool) -> Self {
        Self {
            direction: OrderDirection::from_descending(descending),
        }
    }

    /// Least recently changed first
    #[must_use]
    pub const fn ascending() -> Self {
        Self::new(false)
    }

    #[must_use]
    pub const fn direction(&self) -> OrderDirection {
        self.direction
    }
}

impl Default for OrderedByModification {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Criterion for OrderedByModification {
    fn apply(&self, query: &mut dyn QueryBuilder) -> RepositoryResult<()> {
        query.order_by(UPDATED_AT, self.direction);
        Ok(())
    }
}
