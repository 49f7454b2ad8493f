//! Repository façade over pluggable query builders
//!
//! This module provides the per-entity [`Repository`], the query-builder traits
//! it drives, and the value and page types that flow through them.
//!
//! # Features
//!
//! - **Query seams**: [`QueryBuilder`], [`ExecutableQuery`] and [`Model`] let any
//!   backend plug in
//! - **Ad-hoc conditions**: [`Conditions`] map columns to equality, membership,
//!   raw or custom clauses
//! - **Criteria**: registered [`Criterion`](crate::criteria::Criterion) rules
//!   applied to every query, with a toggle to suspend them
//! - **Pagination**: [`LengthAwarePage`] (counted) and [`SimplePage`] (has-more)
//!
//! # Example
//!
//! ```rust
//! use acton_criteria::backend::memory::{MemoryModel, MemoryTable};
//! use acton_criteria::criteria::{OrderedByCreation, WithTrashed};
//! use acton_criteria::repository::{Conditions, PageRequest, Repository, ALL_COLUMNS};
//! use acton_criteria::criteria;
//! use serde_json::json;
//!
//! let table = MemoryTable::builder("posts")
//!     .columns(["id", "status", "created_at", "deleted_at"])
//!     .soft_delete("deleted_at")
//!     .rows((1..=45).map(|id| json!({
//!         "id": id,
//!         "status": "published",
//!         "created_at": format!("2024-01-{:02}T00:00:00Z", id % 28 + 1),
//!         "deleted_at": null,
//!     })))
//!     .build();
//!
//! let mut posts = Repository::new(MemoryModel::new(table));
//! posts.add_criteria(criteria![OrderedByCreation::default(), WithTrashed]);
//!
//! let page = posts
//!     .paginate(Conditions::new().equals("status", "published"), &PageRequest::new(20, 1), ALL_COLUMNS)
//!     .unwrap();
//! assert_eq!(page.data.len(), 20);
//! assert_eq!(page.pagination.total, 45);
//! assert_eq!(page.pagination.total_pages, 3);
//! ```

mod conditions;
mod error;
mod facade;
mod pagination;
mod query;

// Re-export all public types
pub use conditions::{raw, Condition, Conditions, CustomCondition, RawExpression};
pub use error::{RepositoryError, RepositoryErrorKind, RepositoryOperation, RepositoryResult};
pub use facade::{RecordOf, Repository};
pub use pagination::{
    FilterValue, LengthAwarePage, OrderDirection, PageRequest, Pagination, PaginationMeta,
    SimplePage,
};
pub use query::{is_all_columns, ExecutableQuery, Model, QueryBuilder, ALL_COLUMNS};
