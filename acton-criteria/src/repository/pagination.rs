//! Pagination, ordering and value types for repository queries
//!
//! This module provides the scalar values conditions compare against, the
//! ordering direction used by criteria, and the page types returned by the
//! repository's paginated terminal methods.
//!
//! # Example
//!
//! ```rust
//! use acton_criteria::repository::{OrderDirection, PageRequest, Pagination};
//!
//! let request = PageRequest::new(20, 3);
//! assert_eq!(request.pagination(), Pagination::new(40, 20));
//! assert_eq!(OrderDirection::Descending.as_sql(), "DESC");
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::config::RepositoryConfig;
use crate::request::RequestParams;

/// Direction for ordering results
///
/// # Example
///
/// ```rust
/// use acton_criteria::repository::OrderDirection;
///
/// assert_eq!(format!("{}", OrderDirection::Ascending), "asc");
/// assert_eq!(format!("{}", OrderDirection::Descending), "desc");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrderDirection {
    /// Sort in ascending order (A-Z, 0-9, oldest first)
    #[default]
    #[serde(rename = "asc")]
    Ascending,
    /// Sort in descending order (Z-A, 9-0, newest first)
    #[serde(rename = "desc")]
    Descending,
}

impl OrderDirection {
    /// Pick a direction from a "descending?" flag
    #[must_use]
    pub const fn from_descending(descending: bool) -> Self {
        if descending {
            Self::Descending
        } else {
            Self::Ascending
        }
    }

    /// Convert to SQL ORDER BY clause fragment
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "asc"),
            Self::Descending => write!(f, "desc"),
        }
    }
}

/// A scalar value that can be compared against a column
///
/// # Example
///
/// ```rust
/// use acton_criteria::repository::FilterValue;
///
/// let string_val: FilterValue = "active".into();
/// let int_val: FilterValue = 42_i64.into();
/// let missing: FilterValue = None::<i64>.into();
/// assert_eq!(missing, FilterValue::Null);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Null value
    Null,
    /// Boolean value
    Boolean(bool),
    /// 64-bit integer value
    Integer(i64),
    /// 64-bit floating point value
    Float(f64),
    /// String value
    String(String),
}

impl FilterValue {
    /// Convert into the JSON representation used by record-based backends
    ///
    /// Non-finite floats have no JSON form and become `null`.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Boolean(b) => serde_json::Value::Bool(*b),
            Self::Integer(n) => serde_json::Value::from(*n),
            Self::Float(n) => serde_json::Number::from_f64(*n)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Self::String(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for FilterValue {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<u32> for FilterValue {
    fn from(n: u32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<f64> for FilterValue {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl<T: Into<FilterValue>> From<Option<T>> for FilterValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Offset/limit window for a single page
///
/// # Example
///
/// ```rust
/// use acton_criteria::repository::Pagination;
///
/// let page3 = Pagination::page(3, 20);
/// assert_eq!(page3.offset, 40);
/// assert_eq!(page3.limit, 20);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Number of results to skip
    pub offset: u64,
    /// Maximum number of results to return
    pub limit: u64,
}

impl Pagination {
    /// Create new pagination parameters
    #[must_use]
    pub const fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit }
    }

    /// Create pagination for a specific page number (1-indexed)
    #[must_use]
    pub const fn page(page_number: u64, page_size: u64) -> Self {
        let offset = page_number.saturating_sub(1) * page_size;
        Self {
            offset,
            limit: page_size,
        }
    }
}

/// Arguments for the repository's paginated terminal methods
///
/// Page numbers are 1-indexed; page 0 is treated as page 1 and a page size of
/// 0 as 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Number of records per page
    pub per_page: u32,
    /// Name of the query-string parameter carrying the page number
    pub page_name: String,
    /// Requested page number (1-indexed)
    pub page: u32,
}

impl PageRequest {
    /// Create a request for `page` with `per_page` records, using the default page name
    #[must_use]
    pub fn new(per_page: u32, page: u32) -> Self {
        Self {
            per_page: per_page.max(1),
            page_name: crate::config::DEFAULT_PAGE_NAME.to_string(),
            page: page.max(1),
        }
    }

    /// Build a request from configuration defaults and the incoming request's page parameter
    ///
    /// A missing or unparsable page parameter falls back to page 1.
    ///
    /// # Example
    ///
    /// ```rust
    /// use acton_criteria::config::RepositoryConfig;
    /// use acton_criteria::repository::PageRequest;
    /// use acton_criteria::request::QueryParams;
    ///
    /// let params = QueryParams::parse("page=4&filter=name");
    /// let request = PageRequest::from_params(&params, &RepositoryConfig::default());
    /// assert_eq!(request.page, 4);
    /// assert_eq!(request.per_page, 20);
    /// ```
    #[must_use]
    pub fn from_params(params: &dyn RequestParams, config: &RepositoryConfig) -> Self {
        let page = params
            .string(&config.page_name)
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .unwrap_or(1);
        Self {
            per_page: config.clamp_per_page(config.per_page),
            page_name: config.page_name.clone(),
            page: page.max(1),
        }
    }

    /// Override the page parameter name
    #[must_use]
    pub fn with_page_name(mut self, page_name: impl Into<String>) -> Self {
        self.page_name = page_name.into();
        self
    }

    /// Offset/limit window for this request
    #[must_use]
    pub fn pagination(&self) -> Pagination {
        Pagination::page(u64::from(self.page.max(1)), u64::from(self.per_page.max(1)))
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_PER_PAGE, 1)
    }
}

/// Pagination metadata for counted pages
///
/// # Example
///
/// ```rust
/// use acton_criteria::repository::PaginationMeta;
///
/// let pagination = PaginationMeta::new(1, 20, 45);
/// assert_eq!(pagination.total_pages, 3);
/// assert!(pagination.has_next);
/// assert!(!pagination.has_prev);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaginationMeta {
    /// Current page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
    /// Total number of items across all pages
    pub total: u64,
    /// Total number of pages
    pub total_pages: u32,
    /// Whether there is a next page
    pub has_next: bool,
    /// Whether there is a previous page
    pub has_prev: bool,
}

impl PaginationMeta {
    /// Create new pagination metadata
    #[must_use]
    pub fn new(page: u32, per_page: u32, total: u64) -> Self {
        let per_page = per_page.max(1);
        let total_pages = calculate_total_pages(total, per_page);
        Self {
            page,
            per_page,
            total,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }

    /// Get the offset of the first item on this page
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }
}

/// Calculate total pages, rounding up
fn calculate_total_pages(total: u64, per_page: u32) -> u32 {
    let per_page = u64::from(per_page);
    let pages = total.saturating_add(per_page).saturating_sub(1) / per_page;
    u32::try_from(pages).unwrap_or(u32::MAX)
}

fn page_query(page_name: &str, page: u32) -> String {
    form_urlencoded::Serializer::new(String::new())
        .append_pair(page_name, &page.to_string())
        .finish()
}

/// A page of records together with the total count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LengthAwarePage<T> {
    /// The records on this page
    pub data: Vec<T>,
    /// Pagination metadata
    pub pagination: PaginationMeta,
    /// Name of the query-string parameter carrying the page number
    pub page_name: String,
}

impl<T> LengthAwarePage<T> {
    /// Create a new counted page
    pub fn new(data: Vec<T>, pagination: PaginationMeta, page_name: impl Into<String>) -> Self {
        Self {
            data,
            pagination,
            page_name: page_name.into(),
        }
    }

    /// 1-indexed position of the first record on this page, if any
    #[must_use]
    pub fn from(&self) -> Option<u64> {
        (!self.data.is_empty()).then(|| self.pagination.offset() + 1)
    }

    /// 1-indexed position of the last record on this page, if any
    #[must_use]
    pub fn to(&self) -> Option<u64> {
        (!self.data.is_empty()).then(|| self.pagination.offset() + self.data.len() as u64)
    }

    /// Query string selecting the next page, e.g. `page=2`
    #[must_use]
    pub fn next_page_query(&self) -> Option<String> {
        self.pagination
            .has_next
            .then(|| page_query(&self.page_name, self.pagination.page + 1))
    }

    /// Query string selecting the previous page
    #[must_use]
    pub fn previous_page_query(&self) -> Option<String> {
        self.pagination
            .has_prev
            .then(|| page_query(&self.page_name, self.pagination.page - 1))
    }

    /// Map each record to a new type
    pub fn map<U, F>(self, f: F) -> LengthAwarePage<U>
    where
        F: FnMut(T) -> U,
    {
        LengthAwarePage {
            data: self.data.into_iter().map(f).collect(),
            pagination: self.pagination,
            page_name: self.page_name,
        }
    }
}

/// A page of records without a total count
///
/// Cheaper than [`LengthAwarePage`]: the backend fetches one extra record to
/// learn whether a further page exists instead of counting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimplePage<T> {
    /// The records on this page
    pub data: Vec<T>,
    /// Current page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
    /// Whether at least one more record exists past this page
    pub has_more: bool,
    /// Name of the query-string parameter carrying the page number
    pub page_name: String,
}

impl<T> SimplePage<T> {
    /// Create a new simple page
    pub fn new(
        data: Vec<T>,
        page: u32,
        per_page: u32,
        has_more: bool,
        page_name: impl Into<String>,
    ) -> Self {
        Self {
            data,
            page,
            per_page,
            has_more,
            page_name: page_name.into(),
        }
    }

    /// Query string selecting the next page
    #[must_use]
    pub fn next_page_query(&self) -> Option<String> {
        self.has_more
            .then(|| page_query(&self.page_name, self.page + 1))
    }

    /// Query string selecting the previous page
    #[must_use]
    pub fn previous_page_query(&self) -> Option<String> {
        (self.page > 1).then(|| page_query(&self.page_name, self.page - 1))
    }

    /// Map each record to a new type
    pub fn map<U, F>(self, f: F) -> SimplePage<U>
    where
        F: FnMut(T) -> U,
    {
        SimplePage {
            data: self.data.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            has_more: self.has_more,
            page_name: self.page_name,
        }
    }
}
