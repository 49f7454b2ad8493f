//! Reusable query criteria
//!
//! A criterion is a named rule that knows how to apply itself to a query. The
//! repository applies every registered criterion, in registration order, after
//! the per-call conditions.
//!
//! Built-in criteria:
//!
//! - [`OrderedByCreation`] / [`OrderedByModification`]: ordering on the
//!   `created_at` / `updated_at` timestamps
//! - [`WithRelations`]: eager loading of named relations
//! - [`WithTrashed`]: include soft-deleted rows
//! - [`FilterCriterion`]: column projection driven by the request's `filter`
//!   parameter, restricted to an allow-list
//!
//! Closures become criteria through [`from_fn`].
//!
//! # Example
//!
//! ```rust
//! use acton_criteria::backend::plan::QueryPlan;
//! use acton_criteria::criteria::{Criterion, OrderedByCreation, WithTrashed};
//!
//! let mut plan = QueryPlan::new();
//! OrderedByCreation::default().apply(&mut plan).unwrap();
//! WithTrashed.apply(&mut plan).unwrap();
//! assert!(plan.includes_trashed());
//! ```

mod filter;
mod ordering;
mod relations;
mod trashed;

pub use filter::{select_columns, ColumnFilter, FilterCriterion};
pub use ordering::{OrderedByCreation, OrderedByModification, CREATED_AT, UPDATED_AT};
pub use relations::WithRelations;
pub use trashed::WithTrashed;

use std::fmt;

use crate::repository::{QueryBuilder, RepositoryResult};

/// A named rule that decorates a query
///
/// Implementations mutate the query in place and never execute it.
pub trait Criterion: Send + Sync {
    /// Apply this rule to `query`
    fn apply(&self, query: &mut dyn QueryBuilder) -> RepositoryResult<()>;

    /// Name used in logs and error messages
    fn name(&self) -> &'static str {
        short_type_name(std::any::type_name::<Self>())
    }
}

impl fmt::Debug for dyn Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Criterion({})", self.name())
    }
}

/// Criterion backed by a closure
///
/// Created with [`from_fn`].
pub struct FnCriterion<F> {
    name: &'static str,
    f: F,
}

impl<F> Criterion for FnCriterion<F>
where
    F: Fn(&mut dyn QueryBuilder) -> RepositoryResult<()> + Send + Sync,
{
    fn apply(&self, query: &mut dyn QueryBuilder) -> RepositoryResult<()> {
        (self.f)(query)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Wrap a closure as a named criterion
///
/// # Example
///
/// ```rust
/// use acton_criteria::backend::plan::QueryPlan;
/// use acton_criteria::criteria::{from_fn, Criterion};
///
/// let active_only = from_fn("ActiveOnly", |query| {
///     query.where_eq("active", true.into());
///     Ok(())
/// });
/// let mut plan = QueryPlan::new();
/// active_only.apply(&mut plan).unwrap();
/// assert_eq!(active_only.name(), "ActiveOnly");
/// assert_eq!(plan.clauses().len(), 1);
/// ```
pub fn from_fn<F>(name: &'static str, f: F) -> FnCriterion<F>
where
    F: Fn(&mut dyn QueryBuilder) -> RepositoryResult<()> + Send + Sync,
{
    FnCriterion { name, f }
}

/// Strip module paths and generic arguments from a type name
pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::plan::{Clause, QueryPlan};
    use crate::repository::OrderDirection;

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name("a::b::WithTrashed"), "WithTrashed");
        assert_eq!(
            short_type_name("a::b::ColumnFilter<a::request::QueryParams>"),
            "ColumnFilter"
        );
        assert_eq!(short_type_name("Plain"), "Plain");
    }

    #[test]
    fn test_default_name_uses_type() {
        assert_eq!(WithTrashed.name(), "WithTrashed");
        let boxed: Box<dyn Criterion> = Box::new(OrderedByCreation::default());
        assert_eq!(boxed.name(), "OrderedByCreation");
        assert_eq!(format!("{boxed:?}"), "Criterion(OrderedByCreation)");
    }

    #[test]
    fn test_fn_criterion_applies_closure() {
        let criterion = from_fn("ByName", |query| {
            query.order_by("name", OrderDirection::Ascending);
            Ok(())
        });
        let mut plan = QueryPlan::new();
        criterion.apply(&mut plan).unwrap();
        assert_eq!(
            plan.clauses(),
            &[Clause::OrderBy {
                column: "name".to_string(),
                direction: OrderDirection::Ascending,
            }]
        );
    }
}
