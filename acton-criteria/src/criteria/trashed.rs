use super::Criterion;
use crate::repository::{QueryBuilder, RepositoryResult};

/// Include soft-deleted rows in the results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WithTrashed;

impl Criterion for WithTrashed {
    fn apply(&self, query: &mut dyn QueryBuilder) -> RepositoryResult<()> {
        query.with_trashed();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::plan::{Clause, QueryPlan};

    #[test]
    fn test_with_trashed_single_directive() {
        let mut plan = QueryPlan::new();
        WithTrashed.apply(&mut plan).unwrap();
        assert_eq!(plan.clauses(), &[Clause::WithTrashed]);
    }
}
