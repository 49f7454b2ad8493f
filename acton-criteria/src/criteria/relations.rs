use super::Criterion;
use crate::repository::{QueryBuilder, RepositoryResult};

/// Eager load the named relations with every result
///
/// Accepts any iterable of names, so both a list built ahead of time and an
/// inline set of names work. The [`with_relations!`](crate::with_relations)
/// macro covers the variadic call shape.
///
/// # Example
///
/// ```rust
/// use acton_criteria::criteria::WithRelations;
/// use acton_criteria::with_relations;
///
/// let prebuilt = vec!["author".to_string(), "comments".to_string()];
/// assert_eq!(WithRelations::new(prebuilt), with_relations!("author", "comments"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WithRelations {
    relations: Vec<String>,
}

impl WithRelations {
    pub fn new<I, S>(relations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            relations: relations.into_iter().map(Into::into).collect(),
        }
    }

    /// Relation names, in the order given
    #[must_use]
    pub fn relations(&self) -> &[String] {
        &self.relations
    }
}

impl Criterion for WithRelations {
    fn apply(&self, query: &mut dyn QueryBuilder) -> RepositoryResult<()> {
        let relations: Vec<&str> = self.relations.iter().map(String::as_str).collect();
        query.with(&relations);
        Ok(())
    }
}

/// Build a [`WithRelations`] criterion from relation names
#[macro_export]
macro_rules! with_relations {
    ($($relation:expr),* $(,)?) => {
        $crate::criteria::WithRelations::new(
            ::std::vec::Vec::<::std::string::String>::from([$(::std::string::String::from($relation)),*]),
        )
    };
}
