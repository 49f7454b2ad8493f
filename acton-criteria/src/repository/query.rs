//! Query builder seams
//!
//! The repository never talks to storage directly. It asks a [`Model`] for a
//! fresh query, decorates it through the object-safe [`QueryBuilder`] trait,
//! and finally hands it to the backend's [`ExecutableQuery`] implementation.
//!
//! - [`QueryBuilder`]: clause-level mutation, shared by conditions and criteria
//! - [`ExecutableQuery`]: terminal fetches (`get`, `first`, paginated)
//! - [`Model`]: the entity binding that produces fresh queries

use super::pagination::{FilterValue, LengthAwarePage, OrderDirection, PageRequest, SimplePage};
use super::error::RepositoryResult;

/// Column list meaning "every column"
pub const ALL_COLUMNS: &[&str] = &["*"];

/// Whether a column list selects every column
///
/// An empty list and any list containing `*` both count as "all".
#[must_use]
pub fn is_all_columns(columns: &[&str]) -> bool {
    columns.is_empty() || columns.contains(&"*")
}

/// Mutable, unexecuted query
///
/// Implementations record or translate each call; none of these methods may
/// execute the query.
pub trait QueryBuilder {
    /// Restrict the selected columns
    fn select(&mut self, columns: &[&str]);

    /// Append an ORDER BY clause
    fn order_by(&mut self, column: &str, direction: OrderDirection);

    /// Eager load the named relations alongside the results
    fn with(&mut self, relations: &[&str]);

    /// Drop the default "exclude soft-deleted rows" constraint
    fn with_trashed(&mut self);

    /// `column = value`
    fn where_eq(&mut self, column: &str, value: FilterValue);

    /// `column IN (values...)`
    fn where_in(&mut self, column: &str, values: &[FilterValue]);

    /// Raw WHERE expression, used verbatim
    fn where_raw(&mut self, expression: &str);
}

/// A query that can be executed by its backend
///
/// Backend failures surface here unchanged; the repository adds no retry or
/// translation on top.
pub trait ExecutableQuery: QueryBuilder + Sized {
    /// The record type produced by this backend
    type Record;

    /// Fetch every matching record, projected onto `columns`
    fn get(self, columns: &[&str]) -> RepositoryResult<Vec<Self::Record>>;

    /// Fetch the first matching record, if any
    fn first(self, columns: &[&str]) -> RepositoryResult<Option<Self::Record>>;

    /// Fetch one page of records together with the total count
    fn paginate(
        self,
        request: &PageRequest,
        columns: &[&str],
    ) -> RepositoryResult<LengthAwarePage<Self::Record>>;

    /// Fetch one page of records without counting the total
    fn simple_paginate(
        self,
        request: &PageRequest,
        columns: &[&str],
    ) -> RepositoryResult<SimplePage<Self::Record>>;
}

/// Entity binding for a repository
///
/// A repository is parameterized by its model; the model decides which table
/// (or collection, or endpoint) a fresh query targets.
pub trait Model {
    /// The query type this model produces
    type Query: ExecutableQuery;

    /// Start a fresh, unconstrained query for this entity
    fn new_query(&self) -> Self::Query;
}

impl<M: Model> Model for &M {
    type Query = M::Query;

    fn new_query(&self) -> Self::Query {
        (**self).new_query()
    }
}

impl<M: Model> Model for std::sync::Arc<M> {
    type Query = M::Query;

    fn new_query(&self) -> Self::Query {
        (**self).new_query()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_all_columns() {
        assert!(is_all_columns(ALL_COLUMNS));
        assert!(is_all_columns(&[]));
        assert!(is_all_columns(&["id", "*"]));
        assert!(!is_all_columns(&["id", "name"]));
    }
}
