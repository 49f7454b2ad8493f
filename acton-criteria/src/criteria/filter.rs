//! Request-driven column filtering
//!
//! A filter criterion lets a client narrow the selected columns through the
//! query string, e.g. `?filter=name;email`. Only columns on the criterion's
//! allow-list can be selected; everything else the client asks for is ignored.
//!
//! This is a projection, not a row filter: it changes which columns come back,
//! never which rows.

use super::Criterion;
use crate::config::{RepositoryConfig, DEFAULT_FILTER_DELIMITER, DEFAULT_FILTER_PARAMETER};
use crate::repository::{QueryBuilder, RepositoryError, RepositoryResult};
use crate::request::{ParamValue, RequestParams};

/// A column filter bound to an incoming request
///
/// Implementors supply the request and declare their filterable columns by
/// overriding [`columns`](FilterCriterion::columns). Every implementor is a
/// [`Criterion`].
///
/// Leaving `columns` at its default is a wiring mistake: applying such a
/// criterion fails with a fatal configuration error.
///
/// # Example
///
/// ```rust
/// use acton_criteria::backend::plan::QueryPlan;
/// use acton_criteria::criteria::{Criterion, FilterCriterion};
/// use acton_criteria::request::{QueryParams, RequestParams};
///
/// struct UserFilter(QueryParams);
///
/// impl FilterCriterion for UserFilter {
///     fn request(&self) -> &dyn RequestParams {
///         &self.0
///     }
///
///     fn columns(&self) -> Option<&[&str]> {
///         Some(&["name", "email"])
///     }
/// }
///
/// let mut plan = QueryPlan::new();
/// UserFilter(QueryParams::parse("filter=email;password")).apply(&mut plan).unwrap();
/// assert_eq!(plan.selected(), Some(vec!["email".to_string()]));
/// ```
pub trait FilterCriterion: Send + Sync {
    /// The request whose parameters drive the filter
    fn request(&self) -> &dyn RequestParams;

    /// Columns clients may select; `None` means none were declared
    fn columns(&self) -> Option<&[&str]> {
        None
    }

    /// Name of the request parameter holding the requested columns
    fn parameter(&self) -> &str {
        DEFAULT_FILTER_PARAMETER
    }

    /// Separator between requested column names
    fn delimiter(&self) -> &str {
        DEFAULT_FILTER_DELIMITER
    }
}

impl<T: FilterCriterion> Criterion for T {
    fn apply(&self, query: &mut dyn QueryBuilder) -> RepositoryResult<()> {
        let name = Criterion::name(self);
        let Some(allowed) = self.columns() else {
            tracing::error!(criterion = name, "Filter criterion has no columns allow-list");
            return Err(RepositoryError::missing_allow_list(name));
        };

        let selected = select_columns(allowed, self.request(), self.parameter(), self.delimiter());
        if selected.is_empty() {
            tracing::trace!(criterion = name, "No filterable columns requested");
            return Ok(());
        }

        tracing::debug!(criterion = name, columns = ?selected, "Restricting selected columns");
        query.select(&selected);
        Ok(())
    }
}

/// Intersect the requested columns with the allow-list
///
/// The result follows the allow-list's order with each column at most once.
/// A missing or non-string parameter yields an empty list, and so does a
/// request naming no allowed column. Names match exactly and case-sensitively.
///
/// # Example
///
/// ```rust
/// use acton_criteria::criteria::select_columns;
/// use acton_criteria::request::QueryParams;
///
/// let params = QueryParams::parse("filter=name;age;email");
/// assert_eq!(select_columns(&["name", "email"], &params, "filter", ";"), vec!["name", "email"]);
/// assert_eq!(select_columns(&["email", "name"], &params, "filter", ";"), vec!["email", "name"]);
/// ```
#[must_use]
pub fn select_columns<'a>(
    allowed: &[&'a str],
    params: &dyn RequestParams,
    parameter: &str,
    delimiter: &str,
) -> Vec<&'a str> {
    let Some(ParamValue::Single(raw)) = params.param(parameter) else {
        return Vec::new();
    };

    let requested: Vec<&str> = if delimiter.is_empty() {
        vec![raw.as_str()]
    } else {
        raw.split(delimiter).collect()
    };

    let mut selected: Vec<&'a str> = Vec::new();
    for &column in allowed {
        if requested.contains(&column) && !selected.contains(&column) {
            selected.push(column);
        }
    }
    selected
}

/// Ready-made filter criterion with a fixed allow-list
///
/// # Example
///
/// ```rust
/// use acton_criteria::criteria::ColumnFilter;
/// use acton_criteria::config::RepositoryConfig;
/// use acton_criteria::request::QueryParams;
///
/// let config = RepositoryConfig {
///     filter_parameter: "fields".to_string(),
///     ..RepositoryConfig::default()
/// };
/// let filter = ColumnFilter::new(QueryParams::parse("fields=title"), ["title", "body"])
///     .with_config(&config);
/// assert_eq!(filter.allowed(), &["title", "body"]);
/// ```
#[derive(Debug, Clone)]
pub struct ColumnFilter<R> {
    request: R,
    columns: Vec<&'static str>,
    parameter: String,
    delimiter: String,
}

impl<R: RequestParams + Send + Sync> ColumnFilter<R> {
    /// Filter `request` against the given allow-list
    pub fn new<I>(request: R, columns: I) -> Self
    where
        I: IntoIterator<Item = &'static str>,
    {
        Self {
            request,
            columns: columns.into_iter().collect(),
            parameter: DEFAULT_FILTER_PARAMETER.to_string(),
            delimiter: DEFAULT_FILTER_DELIMITER.to_string(),
        }
    }

    /// Take the parameter name and delimiter from configuration
    #[must_use]
    pub fn with_config(mut self, config: &RepositoryConfig) -> Self {
        self.parameter.clone_from(&config.filter_parameter);
        self.delimiter.clone_from(&config.filter_delimiter);
        self
    }

    #[must_use]
    pub fn with_parameter(mut self, parameter: impl Into<String>) -> Self {
        self.parameter = parameter.into();
        self
    }

    #[must_use]
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    /// The allow-list
    #[must_use]
    pub fn allowed(&self) -> &[&'static str] {
        &self.columns
    }
}

impl<R: RequestParams + Send + Sync> FilterCriterion for ColumnFilter<R> {
    fn request(&self) -> &dyn RequestParams {
        &self.request
    }

    fn columns(&self) -> Option<&[&str]> {
        Some(self.columns.as_slice())
    }

    fn parameter(&self) -> &str {
        &self.parameter
    }

    fn delimiter(&self) -> &str {
        &self.delimiter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::plan::{Clause, QueryPlan};
    use crate::repository::RepositoryErrorKind;
    use crate::request::QueryParams;
    use pretty_assertions::assert_eq;

    struct Unconfigured(QueryParams);

    impl FilterCriterion for Unconfigured {
        fn request(&self) -> &dyn RequestParams {
            &self.0
        }
    }

    fn select_clauses(filter: &dyn Criterion) -> Vec<Clause> {
        let mut plan = QueryPlan::new();
        filter.apply(&mut plan).unwrap();
        plan.clauses().to_vec()
    }

    #[test]
    fn test_allow_list_order_wins() {
        let params = QueryParams::parse("filter=name;age;email");
        let filter = ColumnFilter::new(params.clone(), ["name", "email"]);
        assert_eq!(
            select_clauses(&filter),
            vec![Clause::Select(vec!["name".to_string(), "email".to_string()])]
        );

        let reversed = ColumnFilter::new(params, ["email", "name"]);
        assert_eq!(
            select_clauses(&reversed),
            vec![Clause::Select(vec!["email".to_string(), "name".to_string()])]
        );
    }

    #[test]
    fn test_no_match_leaves_selection_alone() {
        let filter = ColumnFilter::new(QueryParams::parse("filter=age;password"), ["name"]);
        assert!(select_clauses(&filter).is_empty());
    }

    #[test]
    fn test_missing_parameter_leaves_selection_alone() {
        let filter = ColumnFilter::new(QueryParams::parse("page=2"), ["name"]);
        assert!(select_clauses(&filter).is_empty());
    }

    #[test]
    fn test_non_string_parameter_leaves_selection_alone() {
        let filter = ColumnFilter::new(QueryParams::parse("filter[]=name&filter[]=email"), ["name"]);
        assert!(select_clauses(&filter).is_empty());
    }

    #[test]
    fn test_match_is_case_sensitive() {
        let filter = ColumnFilter::new(QueryParams::parse("filter=Name;EMAIL"), ["name", "email"]);
        assert!(select_clauses(&filter).is_empty());
    }

    #[test]
    fn test_duplicates_selected_once() {
        let filter = ColumnFilter::new(QueryParams::parse("filter=name;name"), ["name", "name"]);
        assert_eq!(
            select_clauses(&filter),
            vec![Clause::Select(vec!["name".to_string()])]
        );
    }

    #[test]
    fn test_custom_parameter_and_delimiter() {
        let filter = ColumnFilter::new(QueryParams::parse("fields=name,email"), ["email", "name"])
            .with_parameter("fields")
            .with_delimiter(",");
        assert_eq!(
            select_clauses(&filter),
            vec![Clause::Select(vec!["email".to_string(), "name".to_string()])]
        );
    }

    #[test]
    fn test_missing_allow_list_fails_on_apply() {
        // Construction succeeds
        let filter = Unconfigured(QueryParams::parse("filter=name"));

        let mut plan = QueryPlan::new();
        let error = filter.apply(&mut plan).unwrap_err();
        assert_eq!(error.kind, RepositoryErrorKind::Configuration);
        assert_eq!(error.entity_type.as_deref(), Some("Unconfigured"));
        assert!(error.is_fatal());
        assert!(plan.clauses().is_empty());
    }

    #[test]
    fn test_empty_delimiter_matches_whole_value() {
        let params = QueryParams::parse("filter=name");
        assert_eq!(select_columns(&["name"], &params, "filter", ""), vec!["name"]);
    }
}
