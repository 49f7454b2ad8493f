//! Incoming request parameters
//!
//! Criteria that depend on the client's request (such as column filters) read
//! their inputs through the [`RequestParams`] trait. [`QueryParams`] is the
//! stock implementation, parsed from a URL query string. With the `http`
//! feature it is also an axum extractor, so handlers can take it directly:
//!
//! ```rust,ignore
//! async fn list_users(params: QueryParams) -> Json<Vec<Value>> {
//!     let filter = ColumnFilter::new(params, ["name", "email"]);
//!     // ...
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use url::form_urlencoded;

/// A single request parameter
///
/// Parameters given once as `key=value` are [`Single`](ParamValue::Single).
/// Parameters repeated, or written in array form (`key[]=a&key[]=b`), are
/// [`Many`](ParamValue::Many) and are never treated as strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Single(String),
    Many(Vec<String>),
}

impl ParamValue {
    /// The value, when it is a plain string
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Single(value) => Some(value.as_str()),
            Self::Many(_) => None,
        }
    }

    fn push(&mut self, value: String) {
        match self {
            Self::Single(existing) => {
                let first = std::mem::take(existing);
                *self = Self::Many(vec![first, value]);
            }
            Self::Many(values) => values.push(value),
        }
    }
}

/// Read access to a request's named parameters
pub trait RequestParams {
    /// The raw parameter, if present
    fn param(&self, name: &str) -> Option<&ParamValue>;

    /// The parameter as a string; `None` when missing or not a string
    fn string(&self, name: &str) -> Option<&str> {
        self.param(name).and_then(ParamValue::as_str)
    }
}

impl<T: RequestParams + ?Sized> RequestParams for &T {
    fn param(&self, name: &str) -> Option<&ParamValue> {
        (**self).param(name)
    }
}

impl<T: RequestParams + ?Sized> RequestParams for Arc<T> {
    fn param(&self, name: &str) -> Option<&ParamValue> {
        (**self).param(name)
    }
}

impl RequestParams for HashMap<String, ParamValue> {
    fn param(&self, name: &str) -> Option<&ParamValue> {
        self.get(name)
    }
}

/// Parameters parsed from a URL query string
///
/// # Example
///
/// ```rust
/// use acton_criteria::request::{ParamValue, QueryParams, RequestParams};
///
/// let params = QueryParams::parse("filter=name%3Bemail&tag[]=a&tag[]=b");
/// assert_eq!(params.string("filter"), Some("name;email"));
/// assert_eq!(params.string("tag"), None);
/// assert_eq!(
///     params.param("tag"),
///     Some(&ParamValue::Many(vec!["a".to_string(), "b".to_string()]))
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    params: HashMap<String, ParamValue>,
}

impl QueryParams {
    /// Parse a query string, with or without the leading `?`
    #[must_use]
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut params = Self::default();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            params.append(&key, value.into_owned());
        }
        params
    }

    /// Add a value, turning the parameter into a list when the key repeats
    /// or is written in array form
    pub fn append(&mut self, key: &str, value: String) {
        let (name, is_array) = split_array_key(key);
        match self.params.get_mut(name) {
            Some(existing) => existing.push(value),
            None if is_array => {
                self.params
                    .insert(name.to_string(), ParamValue::Many(vec![value]));
            }
            None => {
                self.params
                    .insert(name.to_string(), ParamValue::Single(value));
            }
        }
    }

    /// Set a parameter, replacing any previous value
    pub fn insert(&mut self, name: impl Into<String>, value: ParamValue) {
        self.params.insert(name.into(), value);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// `tag[]` and `tag[key]` both name the array parameter `tag`
fn split_array_key(key: &str) -> (&str, bool) {
    match key.find('[') {
        Some(open) if open > 0 && key.ends_with(']') => (&key[..open], true),
        _ => (key, false),
    }
}

impl RequestParams for QueryParams {
    fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }
}

impl From<&http::Uri> for QueryParams {
    fn from(uri: &http::Uri) -> Self {
        uri.query().map(Self::parse).unwrap_or_default()
    }
}

impl<K, V> FromIterator<(K, V)> for QueryParams
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut params = Self::default();
        for (key, value) in iter {
            params.append(key.as_ref(), value.into());
        }
        params
    }
}

#[cfg(feature = "http")]
impl<S> axum::extract::FromRequestParts<S> for QueryParams
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self::from(&parts.uri))
    }
}
