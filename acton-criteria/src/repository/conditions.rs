//! Ad-hoc, per-call conditions
//!
//! A [`Conditions`] set is an ordered map from column name to a [`Condition`].
//! The variant decides the clause kind; each entry produces exactly one clause:
//!
//! | Variant            | Clause                                    |
//! |--------------------|-------------------------------------------|
//! | `Custom(fn)`       | the closure drives the query itself        |
//! | `Raw(expr)`        | `WHERE <expr>` using the literal text      |
//! | `In(values)`       | `WHERE column IN (values...)`              |
//! | `Equals(value)`    | `WHERE column = value`                     |
//!
//! # Example
//!
//! ```rust
//! use acton_criteria::repository::{Conditions, OrderDirection};
//!
//! let conditions = Conditions::new()
//!     .equals("status", "active")
//!     .any_of("role", ["admin", "editor"])
//!     .raw("votes > 100")
//!     .custom(|query| query.order_by("name", OrderDirection::Ascending));
//! assert_eq!(conditions.len(), 4);
//! ```

use std::fmt;

use super::pagination::FilterValue;
use super::query::QueryBuilder;

/// Closure that takes full control of the query for one entry
pub type CustomCondition = Box<dyn FnOnce(&mut dyn QueryBuilder)>;

/// Literal SQL fragment passed through to the backend untouched
///
/// # Example
///
/// ```rust
/// use acton_criteria::repository::{raw, RawExpression};
///
/// let expr = raw("price > cost * 2");
/// assert_eq!(expr.as_str(), "price > cost * 2");
/// assert_eq!(expr, RawExpression::new("price > cost * 2"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawExpression(String);

impl RawExpression {
    /// Wrap a literal expression
    pub fn new(expression: impl Into<String>) -> Self {
        Self(expression.into())
    }

    /// The literal expression text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RawExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shorthand for [`RawExpression::new`]
pub fn raw(expression: impl Into<String>) -> RawExpression {
    RawExpression::new(expression)
}

/// A single ad-hoc condition
pub enum Condition {
    /// The closure receives the query; nothing else is added for this key
    Custom(CustomCondition),
    /// Raw WHERE clause
    Raw(RawExpression),
    /// Membership test
    In(Vec<FilterValue>),
    /// Equality test
    Equals(FilterValue),
}

impl Condition {
    /// Wrap a closure as a custom condition
    pub fn custom<F>(f: F) -> Self
    where
        F: FnOnce(&mut dyn QueryBuilder) + 'static,
    {
        Self::Custom(Box::new(f))
    }

    /// Translate this condition into exactly one clause on `query`
    pub fn apply(self, column: &str, query: &mut dyn QueryBuilder) {
        match self {
            Self::Custom(f) => f(query),
            Self::Raw(expression) => query.where_raw(expression.as_str()),
            Self::In(values) => query.where_in(column, &values),
            Self::Equals(value) => query.where_eq(column, value),
        }
    }

    /// Short label for logging
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Custom(_) => "custom",
            Self::Raw(_) => "raw",
            Self::In(_) => "in",
            Self::Equals(_) => "equals",
        }
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(_) => f.write_str("Custom(<closure>)"),
            Self::Raw(expression) => f.debug_tuple("Raw").field(expression).finish(),
            Self::In(values) => f.debug_tuple("In").field(values).finish(),
            Self::Equals(value) => f.debug_tuple("Equals").field(value).finish(),
        }
    }
}

impl From<RawExpression> for Condition {
    fn from(expression: RawExpression) -> Self {
        Self::Raw(expression)
    }
}

impl From<FilterValue> for Condition {
    fn from(value: FilterValue) -> Self {
        Self::Equals(value)
    }
}

impl<T: Into<FilterValue>> From<Vec<T>> for Condition {
    fn from(values: Vec<T>) -> Self {
        Self::In(values.into_iter().map(Into::into).collect())
    }
}

macro_rules! scalar_condition {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Condition {
                fn from(value: $ty) -> Self {
                    Self::Equals(value.into())
                }
            }
        )*
    };
}

scalar_condition!(&str, String, i64, i32, u32, f64, bool);

/// Ordered set of ad-hoc conditions
///
/// Entries apply in insertion order. Inserting an existing key replaces its
/// condition in place, keeping the original position. Entries added through
/// [`raw`](Conditions::raw) and [`custom`](Conditions::custom) carry no key
/// and are never replaced.
#[derive(Debug, Default)]
pub struct Conditions {
    entries: Vec<(Option<String>, Condition)>,
}

impl Conditions {
    /// Create an empty condition set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the condition for `key`
    pub fn insert(&mut self, key: impl Into<String>, condition: impl Into<Condition>) {
        let key = key.into();
        let condition = condition.into();
        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing.as_deref() == Some(key.as_str()))
        {
            Some(entry) => entry.1 = condition,
            None => self.entries.push((Some(key), condition)),
        }
    }

    /// Builder form of [`Conditions::insert`]
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, condition: impl Into<Condition>) -> Self {
        self.insert(key, condition);
        self
    }

    /// `column = value`
    #[must_use]
    pub fn equals(self, column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.with(column, Condition::Equals(value.into()))
    }

    /// `column IN (values...)`
    #[must_use]
    pub fn any_of<I, V>(self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FilterValue>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.with(column, Condition::In(values))
    }

    /// Raw WHERE expression, added without a key
    #[must_use]
    pub fn raw(mut self, expression: impl Into<String>) -> Self {
        self.entries
            .push((None, Condition::Raw(RawExpression::new(expression))));
        self
    }

    /// Closure that receives the query, added without a key
    #[must_use]
    pub fn custom<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&mut dyn QueryBuilder) + 'static,
    {
        self.entries.push((None, Condition::custom(f)));
        self
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in application order; unkeyed entries are skipped
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|(key, _)| key.as_deref())
    }

    /// Apply every entry to `query`, in insertion order
    pub fn apply(self, query: &mut dyn QueryBuilder) {
        for (key, condition) in self.entries {
            tracing::trace!(key = ?key, kind = condition.kind(), "Applying condition");
            condition.apply(key.as_deref().unwrap_or_default(), query);
        }
    }
}

impl<K, C> FromIterator<(K, C)> for Conditions
where
    K: Into<String>,
    C: Into<Condition>,
{
    fn from_iter<T: IntoIterator<Item = (K, C)>>(iter: T) -> Self {
        let mut conditions = Self::new();
        for (key, condition) in iter {
            conditions.insert(key, condition);
        }
        conditions
    }
}
