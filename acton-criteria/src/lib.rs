//! # acton-criteria
//!
//! Composable query criteria and a per-entity repository façade over pluggable
//! query builders.
//!
//! ## Features
//!
//! - **Repository façade**: `get`, `first`, `paginate` and `simple_paginate`
//!   over any backend implementing [`repository::ExecutableQuery`]
//! - **Criteria**: reusable ordering, eager-loading, soft-delete and
//!   request-driven column-filter rules, with a switch to suspend them
//! - **Ad-hoc conditions**: equality, membership, raw and closure conditions
//!   per call
//! - **Backends**: a recording query plan rendered to PostgreSQL (pushed into
//!   sqlx with the `database` feature) and an in-memory JSON table engine
//! - **Request parameters**: query-string parsing, usable as an axum extractor
//!   with the `http` feature
//!
//! ## Example
//!
//! ```rust
//! use acton_criteria::prelude::*;
//! use serde_json::json;
//!
//! struct PostFilter(QueryParams);
//!
//! impl FilterCriterion for PostFilter {
//!     fn request(&self) -> &dyn RequestParams {
//!         &self.0
//!     }
//!
//!     fn columns(&self) -> Option<&[&str]> {
//!         Some(&["id", "title"])
//!     }
//! }
//!
//! # fn main() -> Result<()> {
//! let table = MemoryTable::builder("posts")
//!     .columns(["id", "title", "body", "created_at"])
//!     .row(json!({"id": 1, "title": "First", "body": "...", "created_at": "2024-01-01T00:00:00Z"}))
//!     .row(json!({"id": 2, "title": "Second", "body": "...", "created_at": "2024-02-01T00:00:00Z"}))
//!     .build();
//!
//! let params = QueryParams::parse("filter=title;body&page=1");
//! let mut posts = Repository::new(MemoryModel::new(table));
//! posts.add_criteria(criteria![OrderedByCreation::default(), PostFilter(params.clone())]);
//!
//! let page = posts.paginate(Conditions::new(), &posts.page_request_from(&params), ALL_COLUMNS)?;
//! assert_eq!(page.data, vec![json!({"title": "Second"}), json!({"title": "First"})]);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod criteria;
pub mod error;
pub mod observability;
pub mod repository;
pub mod request;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::backend::{MemoryModel, MemoryQuery, MemoryTable, QueryPlan};
    pub use crate::config::RepositoryConfig;
    pub use crate::criteria::{
        from_fn, ColumnFilter, Criterion, FilterCriterion, OrderedByCreation,
        OrderedByModification, WithRelations, WithTrashed,
    };
    pub use crate::error::{Error, Result};
    pub use crate::observability::init_tracing;
    pub use crate::repository::{
        raw, Condition, Conditions, ExecutableQuery, FilterValue, LengthAwarePage, Model,
        OrderDirection, PageRequest, QueryBuilder, Repository, RepositoryError,
        RepositoryErrorKind, RepositoryResult, SimplePage, ALL_COLUMNS,
    };
    pub use crate::request::{ParamValue, QueryParams, RequestParams};
    pub use crate::{criteria, with_relations};
}
