//! Per-entity repository façade
//!
//! A [`Repository`] binds a [`Model`] to an ordered list of criteria. Every
//! terminal call builds a fresh query, applies the call's [`Conditions`], then
//! applies the registered criteria (when criteria mode is on) before handing
//! the query to the backend.

use std::fmt;

use super::conditions::Conditions;
use super::error::RepositoryResult;
use super::pagination::{LengthAwarePage, PageRequest, SimplePage};
use super::query::{ExecutableQuery, Model};
use crate::config::RepositoryConfig;
use crate::criteria::Criterion;
use crate::request::RequestParams;

/// Record type produced by a model's backend
pub type RecordOf<M> = <<M as Model>::Query as ExecutableQuery>::Record;

/// Build a batch of boxed criteria for [`Repository::add_criteria`]
///
/// # Example
///
/// ```rust
/// use acton_criteria::criteria;
/// use acton_criteria::criteria::{OrderedByCreation, WithTrashed};
///
/// let batch = criteria![OrderedByCreation::default(), WithTrashed];
/// assert_eq!(batch.len(), 2);
/// ```
#[macro_export]
macro_rules! criteria {
    ($($criterion:expr),* $(,)?) => {
        ::std::vec![$(::std::boxed::Box::new($criterion) as ::std::boxed::Box<dyn $crate::criteria::Criterion>),*]
    };
}

/// Repository over a single entity
///
/// # Example
///
/// ```rust
/// use acton_criteria::backend::memory::{MemoryModel, MemoryTable};
/// use acton_criteria::criteria::OrderedByCreation;
/// use acton_criteria::repository::{Conditions, Repository, ALL_COLUMNS};
/// use serde_json::json;
///
/// let table = MemoryTable::builder("users")
///     .columns(["id", "name", "created_at"])
///     .row(json!({"id": 1, "name": "ada", "created_at": "2024-01-01T00:00:00Z"}))
///     .row(json!({"id": 2, "name": "bob", "created_at": "2024-02-01T00:00:00Z"}))
///     .build();
///
/// let mut users = Repository::new(MemoryModel::new(table));
/// users.push_criterion(OrderedByCreation::default());
///
/// let newest = users.first(Conditions::new(), ALL_COLUMNS).unwrap().unwrap();
/// assert_eq!(newest["name"], "bob");
/// ```
pub struct Repository<M: Model> {
    model: M,
    criteria: Vec<Box<dyn Criterion>>,
    with_criteria: bool,
    config: RepositoryConfig,
}

impl<M: Model> Repository<M> {
    /// Create a repository with default configuration
    pub fn new(model: M) -> Self {
        Self::with_config(model, RepositoryConfig::default())
    }

    /// Create a repository using `config` for paging defaults and the initial criteria mode
    pub fn with_config(model: M, config: RepositoryConfig) -> Self {
        Self {
            model,
            criteria: Vec::new(),
            with_criteria: config.criteria_enabled,
            config,
        }
    }

    /// The bound model
    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// Choose whether registered criteria apply to subsequent builds
    pub fn set_criteria_mode(&mut self, enabled: bool) -> &mut Self {
        tracing::trace!(enabled, "Criteria mode changed");
        self.with_criteria = enabled;
        self
    }

    /// Stop applying registered criteria until [`use_criteria`](Self::use_criteria)
    pub fn no_criteria(&mut self) -> &mut Self {
        self.set_criteria_mode(false)
    }

    /// Apply registered criteria again
    pub fn use_criteria(&mut self) -> &mut Self {
        self.set_criteria_mode(true)
    }

    #[must_use]
    pub fn criteria_enabled(&self) -> bool {
        self.with_criteria
    }

    /// Register a batch of criteria, after any already registered
    ///
    /// Batches flatten into one list: criteria apply in registration order,
    /// and within a batch in the order given.
    pub fn add_criteria<I>(&mut self, batch: I) -> &mut Self
    where
        I: IntoIterator<Item = Box<dyn Criterion>>,
    {
        self.criteria.extend(batch);
        self
    }

    /// Register a single criterion
    pub fn push_criterion<C>(&mut self, criterion: C) -> &mut Self
    where
        C: Criterion + 'static,
    {
        self.criteria.push(Box::new(criterion));
        self
    }

    /// Forget every registered criterion
    pub fn clear_criteria(&mut self) -> &mut Self {
        self.criteria.clear();
        self
    }

    #[must_use]
    pub fn criteria_count(&self) -> usize {
        self.criteria.len()
    }

    /// Names of the registered criteria, in application order
    pub fn criteria_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.criteria.iter().map(|criterion| criterion.name())
    }

    /// Build an unexecuted query
    ///
    /// Conditions are applied first, then (if criteria mode is on) every
    /// registered criterion in order. The first criterion error aborts the
    /// build.
    pub fn build_query(&self, conditions: Conditions) -> RepositoryResult<M::Query> {
        let mut query = self.model.new_query();

        tracing::debug!(
            conditions = conditions.len(),
            criteria = self.criteria.len(),
            criteria_enabled = self.with_criteria,
            "Building repository query"
        );

        conditions.apply(&mut query);

        if self.with_criteria {
            for criterion in &self.criteria {
                tracing::trace!(criterion = criterion.name(), "Applying criterion");
                criterion.apply(&mut query)?;
            }
        }

        Ok(query)
    }

    /// Every matching record, restricted to `columns`
    pub fn get(&self, conditions: Conditions, columns: &[&str]) -> RepositoryResult<Vec<RecordOf<M>>> {
        self.build_query(conditions)?.get(columns)
    }

    /// The first matching record, if any
    pub fn first(
        &self,
        conditions: Conditions,
        columns: &[&str],
    ) -> RepositoryResult<Option<RecordOf<M>>> {
        self.build_query(conditions)?.first(columns)
    }

    /// One page of matching records plus the total count
    ///
    /// The requested page size is honoured as given. Use
    /// [`page_request`](Self::page_request) or
    /// [`page_request_from`](Self::page_request_from) to apply the configured
    /// maximum.
    pub fn paginate(
        &self,
        conditions: Conditions,
        request: &PageRequest,
        columns: &[&str],
    ) -> RepositoryResult<LengthAwarePage<RecordOf<M>>> {
        let request = normalized(request);
        self.build_query(conditions)?.paginate(&request, columns)
    }

    /// One page of matching records without a total count
    pub fn simple_paginate(
        &self,
        conditions: Conditions,
        request: &PageRequest,
        columns: &[&str],
    ) -> RepositoryResult<SimplePage<RecordOf<M>>> {
        let request = normalized(request);
        self.build_query(conditions)?.simple_paginate(&request, columns)
    }

    /// A request for `page` using the configured page size and page name
    #[must_use]
    pub fn page_request(&self, page: u32) -> PageRequest {
        PageRequest::new(self.config.clamp_per_page(self.config.per_page), page)
            .with_page_name(self.config.page_name.clone())
    }

    /// A request whose page number comes from the client's parameters
    #[must_use]
    pub fn page_request_from(&self, params: &dyn RequestParams) -> PageRequest {
        PageRequest::from_params(params, &self.config)
    }

}

/// Page 0 and page size 0 both mean 1
fn normalized(request: &PageRequest) -> PageRequest {
    PageRequest {
        per_page: request.per_page.max(1),
        page_name: request.page_name.clone(),
        page: request.page.max(1),
    }
}

impl<M: Model + fmt::Debug> fmt::Debug for Repository<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("model", &self.model)
            .field("criteria", &self.criteria)
            .field("with_criteria", &self.with_criteria)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::{MemoryModel, MemoryTable};
    use crate::backend::plan::Clause;
    use crate::criteria::{from_fn, OrderedByCreation, OrderedByModification, WithTrashed};
    use crate::repository::{OrderDirection, RepositoryError, RepositoryErrorKind};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn repository() -> Repository<MemoryModel> {
        let table = MemoryTable::builder("posts")
            .columns(["id", "title", "created_at", "updated_at"])
            .row(json!({"id": 1, "title": "a", "created_at": "2024-01-01T00:00:00Z", "updated_at": "2024-03-01T00:00:00Z"}))
            .build();
        Repository::new(MemoryModel::new(table))
    }

    fn order_columns(repo: &Repository<MemoryModel>) -> Vec<String> {
        let query = repo.build_query(Conditions::new()).unwrap();
        query
            .plan()
            .clauses()
            .iter()
            .filter_map(|clause| match clause {
                Clause::OrderBy { column, .. } => Some(column.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_defaults() {
        let repo = repository();
        assert!(repo.criteria_enabled());
        assert_eq!(repo.criteria_count(), 0);
        assert_eq!(repo.config().per_page, 20);
    }

    #[test]
    fn test_batches_apply_in_registration_order() {
        let mut repo = repository();
        repo.add_criteria(criteria![
            from_fn("A1", |q| {
                q.order_by("a1", OrderDirection::Ascending);
                Ok(())
            }),
            from_fn("A2", |q| {
                q.order_by("a2", OrderDirection::Ascending);
                Ok(())
            }),
        ]);
        repo.add_criteria(criteria![from_fn("B1", |q| {
            q.order_by("b1", OrderDirection::Ascending);
            Ok(())
        })]);

        assert_eq!(repo.criteria_count(), 3);
        assert_eq!(repo.criteria_names().collect::<Vec<_>>(), vec!["A1", "A2", "B1"]);
        assert_eq!(order_columns(&repo), vec!["a1", "a2", "b1"]);
    }

    #[test]
    fn test_conditions_apply_before_criteria() {
        let mut repo = repository();
        repo.push_criterion(WithTrashed);
        let query = repo.build_query(Conditions::new().equals("id", 1_i64)).unwrap();
        assert!(matches!(query.plan().clauses()[0], Clause::WhereEq { .. }));
        assert_eq!(query.plan().clauses()[1], Clause::WithTrashed);
    }

    #[test]
    fn test_criteria_mode_toggle() {
        let mut repo = repository();
        repo.push_criterion(OrderedByCreation::default());

        repo.no_criteria();
        assert!(!repo.criteria_enabled());
        assert!(order_columns(&repo).is_empty());

        repo.use_criteria();
        assert_eq!(order_columns(&repo), vec!["created_at"]);
    }

    #[test]
    fn test_clear_criteria() {
        let mut repo = repository();
        repo.push_criterion(OrderedByCreation::default())
            .push_criterion(OrderedByModification::default());
        repo.clear_criteria();
        assert_eq!(repo.criteria_count(), 0);
        assert!(repo.criteria_enabled());
        assert!(order_columns(&repo).is_empty());
    }

    #[test]
    fn test_first_criterion_error_aborts_build() {
        let mut repo = repository();
        repo.push_criterion(from_fn("Broken", |_| {
            Err(RepositoryError::missing_allow_list("Broken"))
        }));
        repo.push_criterion(OrderedByCreation::default());

        let error = repo.build_query(Conditions::new()).unwrap_err();
        assert_eq!(error.kind, RepositoryErrorKind::Configuration);
    }

    #[test]
    fn test_config_sets_initial_mode_and_paging() {
        let config = RepositoryConfig {
            criteria_enabled: false,
            per_page: 500,
            max_per_page: 50,
            page_name: "p".to_string(),
            ..RepositoryConfig::default()
        };
        let table = MemoryTable::builder("t").columns(["id"]).build();
        let repo = Repository::with_config(MemoryModel::new(table), config);
        assert!(!repo.criteria_enabled());

        let request = repo.page_request(2);
        assert_eq!(request.per_page, 50);
        assert_eq!(request.page_name, "p");
        assert_eq!(request.page, 2);
    }

    #[test]
    fn test_paginate_honours_requested_page_size() {
        let table = MemoryTable::builder("n")
            .rows((1..=150).map(|id| json!({"id": id})))
            .build();
        let repo = Repository::new(MemoryModel::new(table));

        let page = repo
            .paginate(Conditions::new(), &PageRequest::new(150, 1), &["*"])
            .unwrap();
        assert_eq!(page.data.len(), 150);
        assert_eq!(page.pagination.per_page, 150);
        assert_eq!(page.pagination.total_pages, 1);

        let simple = repo
            .simple_paginate(Conditions::new(), &PageRequest::new(120, 1), &["*"])
            .unwrap();
        assert_eq!(simple.data.len(), 120);
        assert_eq!(simple.per_page, 120);
        assert!(simple.has_more);
    }

    #[test]
    fn test_zero_page_and_size_mean_one() {
        let repo = repository();
        let request = PageRequest {
            per_page: 0,
            page_name: "page".to_string(),
            page: 0,
        };
        let page = repo.paginate(Conditions::new(), &request, &["*"]).unwrap();
        assert_eq!(page.pagination.page, 1);
        assert_eq!(page.pagination.per_page, 1);
        assert_eq!(page.data.len(), 1);
    }

    #[test]
    fn test_client_driven_requests_are_clamped() {
        let repo = repository();
        let params = crate::request::QueryParams::parse("page=2");
        let config = RepositoryConfig {
            per_page: 10_000,
            ..RepositoryConfig::default()
        };
        let clamped = Repository::with_config(repo.model().clone(), config);
        assert_eq!(clamped.page_request_from(&params).per_page, 100);
        assert_eq!(clamped.page_request(1).per_page, 100);
    }

    #[test]
    fn test_page_request_from_params() {
        let repo = repository();
        let params = crate::request::QueryParams::parse("page=3");
        assert_eq!(repo.page_request_from(&params).page, 3);
    }

    #[test]
    fn test_debug_lists_criteria() {
        let mut repo = repository();
        repo.push_criterion(WithTrashed);
        let debug = format!("{repo:?}");
        assert!(debug.contains("Criterion(WithTrashed)"));
    }
}
