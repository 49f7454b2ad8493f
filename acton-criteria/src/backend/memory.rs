//! In-memory table backend
//!
//! Executes a recorded [`QueryPlan`] over JSON records. Useful for tests,
//! fixtures, and small reference datasets that do not warrant a database.
//!
//! Behaviour mirrors what a SQL backend would do with the same plan:
//!
//! - equality and membership compare JSON values; integers and floats compare
//!   numerically, and a `null` condition matches a `null` or missing field
//! - rows whose soft-delete column is non-null are hidden unless the plan
//!   includes trashed rows
//! - ordering is stable and applies every ORDER BY term in call order, with
//!   nulls first when ascending; RFC 3339 timestamps compare chronologically
//! - a selection recorded on the query (e.g. by a column filter) takes
//!   precedence over the columns passed to the terminal call
//! - raw expressions cannot be evaluated and fail with `Unsupported`
//! - eager loads attach related records under the relation's name
//!
//! # Example
//!
//! ```rust
//! use acton_criteria::backend::memory::{MemoryModel, MemoryTable};
//! use acton_criteria::repository::{Conditions, Repository};
//! use acton_criteria::with_relations;
//! use serde_json::json;
//!
//! let users = MemoryTable::builder("users")
//!     .columns(["id", "name"])
//!     .row(json!({"id": 1, "name": "ada"}))
//!     .build();
//! let posts = MemoryTable::builder("posts")
//!     .columns(["id", "user_id", "title"])
//!     .row(json!({"id": 10, "user_id": 1, "title": "Notes"}))
//!     .belongs_to("author", users, "user_id", "id")
//!     .build();
//!
//! let mut repo = Repository::new(MemoryModel::new(posts));
//! repo.push_criterion(with_relations!("author"));
//!
//! let post = repo.first(Conditions::new(), &["title"]).unwrap().unwrap();
//! assert_eq!(post, json!({"title": "Notes", "author": {"id": 1, "name": "ada"}}));
//! ```

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::DateTime;
use serde_json::{Map, Value};

use super::plan::{Clause, QueryPlan};
use crate::repository::{
    is_all_columns, ExecutableQuery, FilterValue, LengthAwarePage, Model, OrderDirection,
    PageRequest, PaginationMeta, QueryBuilder, RepositoryError, RepositoryOperation,
    RepositoryResult, SimplePage,
};

type Row = Map<String, Value>;

/// How a relation's records are found
#[derive(Debug, Clone)]
pub enum Relation {
    /// Related rows whose `foreign_key` equals this row's `local_key`
    HasMany {
        related: Arc<MemoryTable>,
        foreign_key: String,
        local_key: String,
    },
    /// The related row whose `owner_key` equals this row's `foreign_key`
    BelongsTo {
        related: Arc<MemoryTable>,
        foreign_key: String,
        owner_key: String,
    },
}

/// An immutable table of JSON records
#[derive(Debug, Clone, Default)]
pub struct MemoryTable {
    name: String,
    columns: Vec<String>,
    soft_delete: Option<String>,
    rows: Vec<Row>,
    relations: HashMap<String, Relation>,
}

impl MemoryTable {
    /// Start building a table called `name`
    pub fn builder(name: impl Into<String>) -> MemoryTableBuilder {
        MemoryTableBuilder {
            table: MemoryTable {
                name: name.into(),
                ..MemoryTable::default()
            },
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Known columns
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn soft_delete_column(&self) -> Option<&str> {
        self.soft_delete.as_deref()
    }

    /// Number of stored rows, soft-deleted ones included
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|known| known == column)
    }

    fn is_trashed(&self, row: &Row) -> bool {
        self.soft_delete
            .as_deref()
            .and_then(|column| row.get(column))
            .is_some_and(|value| !value.is_null())
    }

    fn live_rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter().filter(|row| !self.is_trashed(row))
    }
}

/// Builder for [`MemoryTable`]
///
/// When no columns are declared, the columns are the union of the rows' keys.
#[derive(Debug)]
pub struct MemoryTableBuilder {
    table: MemoryTable,
}

impl MemoryTableBuilder {
    /// Declare the table's columns
    #[must_use]
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.table.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Treat rows with a non-null `column` as soft-deleted
    #[must_use]
    pub fn soft_delete(mut self, column: impl Into<String>) -> Self {
        self.table.soft_delete = Some(column.into());
        self
    }

    /// Add one record; anything other than a JSON object is skipped
    #[must_use]
    pub fn row(mut self, record: Value) -> Self {
        match record {
            Value::Object(row) => self.table.rows.push(row),
            other => {
                tracing::warn!(table = %self.table.name, record = %other, "Skipping non-object record");
            }
        }
        self
    }

    /// Add many records
    #[must_use]
    pub fn rows<I>(self, records: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        records.into_iter().fold(self, Self::row)
    }

    /// Declare a one-to-many relation
    #[must_use]
    pub fn has_many(
        mut self,
        name: impl Into<String>,
        related: impl Into<Arc<MemoryTable>>,
        foreign_key: impl Into<String>,
        local_key: impl Into<String>,
    ) -> Self {
        self.table.relations.insert(
            name.into(),
            Relation::HasMany {
                related: related.into(),
                foreign_key: foreign_key.into(),
                local_key: local_key.into(),
            },
        );
        self
    }

    /// Declare an inverse (many-to-one) relation
    #[must_use]
    pub fn belongs_to(
        mut self,
        name: impl Into<String>,
        related: impl Into<Arc<MemoryTable>>,
        foreign_key: impl Into<String>,
        owner_key: impl Into<String>,
    ) -> Self {
        self.table.relations.insert(
            name.into(),
            Relation::BelongsTo {
                related: related.into(),
                foreign_key: foreign_key.into(),
                owner_key: owner_key.into(),
            },
        );
        self
    }

    #[must_use]
    pub fn build(mut self) -> MemoryTable {
        if self.table.columns.is_empty() {
            let mut columns: Vec<String> = Vec::new();
            for row in &self.table.rows {
                for key in row.keys() {
                    if !columns.contains(key) {
                        columns.push(key.clone());
                    }
                }
            }
            self.table.columns = columns;
        }
        if let Some(column) = &self.table.soft_delete {
            if !self.table.has_column(column) {
                self.table.columns.push(column.clone());
            }
        }
        self.table
    }
}

/// Model bound to a shared in-memory table
#[derive(Debug, Clone)]
pub struct MemoryModel {
    table: Arc<MemoryTable>,
}

impl MemoryModel {
    pub fn new(table: impl Into<Arc<MemoryTable>>) -> Self {
        Self {
            table: table.into(),
        }
    }

    #[must_use]
    pub fn table(&self) -> &Arc<MemoryTable> {
        &self.table
    }
}

impl Model for MemoryModel {
    type Query = MemoryQuery;

    fn new_query(&self) -> MemoryQuery {
        MemoryQuery {
            table: Arc::clone(&self.table),
            plan: QueryPlan::new(),
        }
    }
}

/// A query against a [`MemoryTable`]
#[derive(Debug, Clone)]
pub struct MemoryQuery {
    table: Arc<MemoryTable>,
    plan: QueryPlan,
}

impl MemoryQuery {
    /// The clauses recorded so far
    #[must_use]
    pub fn plan(&self) -> &QueryPlan {
        &self.plan
    }

    fn validate(&self, operation: RepositoryOperation) -> RepositoryResult<()> {
        for clause in self.plan.clauses() {
            match clause {
                Clause::WhereEq { column, .. }
                | Clause::WhereIn { column, .. }
                | Clause::OrderBy { column, .. } => self.check_column(operation, column)?,
                Clause::WhereRaw(expression) => {
                    return Err(RepositoryError::unsupported(
                        operation,
                        format!("Raw expressions cannot be evaluated in memory: {expression}"),
                    )
                    .with_entity(self.table.name(), expression.clone()));
                }
                Clause::Select(_) | Clause::With(_) | Clause::WithTrashed => {}
            }
        }

        for relation in self.plan.relations() {
            if !self.table.relations.contains_key(relation) {
                return Err(RepositoryError::unknown_relation(self.table.name(), relation));
            }
        }
        Ok(())
    }

    fn check_column(&self, operation: RepositoryOperation, column: &str) -> RepositoryResult<()> {
        if self.table.has_column(column) {
            Ok(())
        } else {
            Err(RepositoryError::unknown_column(operation, self.table.name(), column))
        }
    }

    /// Matching rows, filtered and sorted but not projected
    fn matching_rows(&self) -> Vec<&Row> {
        let include_trashed = self.plan.includes_trashed();
        let mut rows: Vec<&Row> = self
            .table
            .rows
            .iter()
            .filter(|row| include_trashed || !self.table.is_trashed(row))
            .filter(|row| self.plan.filters().all(|clause| row_matches(row, clause)))
            .collect();

        let orderings = self.plan.orderings();
        if !orderings.is_empty() {
            rows.sort_by(|a, b| {
                orderings.iter().fold(Ordering::Equal, |ordering, (column, direction)| {
                    ordering.then_with(|| {
                        let ordering = compare_values(field(a, column), field(b, column));
                        match direction {
                            OrderDirection::Ascending => ordering,
                            OrderDirection::Descending => ordering.reverse(),
                        }
                    })
                })
            });
        }
        rows
    }

    /// Columns to keep; `None` keeps every field
    ///
    /// A selection already on the query wins; the terminal columns only
    /// apply when nothing was selected.
    fn projection(
        &self,
        operation: RepositoryOperation,
        columns: &[&str],
    ) -> RepositoryResult<Option<Vec<String>>> {
        let projection = self.plan.selected().or_else(|| {
            (!is_all_columns(columns)).then(|| columns.iter().map(|c| (*c).to_string()).collect())
        });
        if let Some(columns) = &projection {
            for column in columns {
                self.check_column(operation, column)?;
            }
        }
        Ok(projection)
    }

    /// Project rows and attach eager-loaded relations
    fn records(&self, rows: &[&Row], projection: Option<&[String]>) -> Vec<Value> {
        rows.iter()
            .map(|row| {
                let mut record = match projection {
                    Some(columns) => columns
                        .iter()
                        .map(|column| (column.clone(), field(row, column).clone()))
                        .collect::<Row>(),
                    None => (*row).clone(),
                };
                for name in self.plan.relations() {
                    if let Some(relation) = self.table.relations.get(name) {
                        record.insert(name.to_string(), load_relation(relation, row));
                    }
                }
                Value::Object(record)
            })
            .collect()
    }

    fn execute(
        &self,
        operation: RepositoryOperation,
        columns: &[&str],
        window: impl FnOnce(Vec<&Row>) -> Vec<&Row>,
    ) -> RepositoryResult<(usize, Vec<Value>)> {
        self.validate(operation)?;
        let projection = self.projection(operation, columns)?;
        let rows = self.matching_rows();
        let total = rows.len();
        let rows = window(rows);
        let records = self.records(&rows, projection.as_deref());

        tracing::debug!(
            table = %self.table.name(),
            operation = %operation,
            matched = total,
            returned = records.len(),
            "Executed in-memory query"
        );
        Ok((total, records))
    }
}

impl QueryBuilder for MemoryQuery {
    fn select(&mut self, columns: &[&str]) {
        self.plan.select(columns);
    }

    fn order_by(&mut self, column: &str, direction: OrderDirection) {
        self.plan.order_by(column, direction);
    }

    fn with(&mut self, relations: &[&str]) {
        self.plan.with(relations);
    }

    fn with_trashed(&mut self) {
        self.plan.with_trashed();
    }

    fn where_eq(&mut self, column: &str, value: FilterValue) {
        self.plan.where_eq(column, value);
    }

    fn where_in(&mut self, column: &str, values: &[FilterValue]) {
        self.plan.where_in(column, values);
    }

    fn where_raw(&mut self, expression: &str) {
        self.plan.where_raw(expression);
    }
}

impl ExecutableQuery for MemoryQuery {
    type Record = Value;

    fn get(self, columns: &[&str]) -> RepositoryResult<Vec<Value>> {
        let (_, records) = self.execute(RepositoryOperation::Get, columns, |rows| rows)?;
        Ok(records)
    }

    fn first(self, columns: &[&str]) -> RepositoryResult<Option<Value>> {
        let (_, records) = self.execute(RepositoryOperation::First, columns, |mut rows| {
            rows.truncate(1);
            rows
        })?;
        Ok(records.into_iter().next())
    }

    fn paginate(
        self,
        request: &PageRequest,
        columns: &[&str],
    ) -> RepositoryResult<LengthAwarePage<Value>> {
        let window = request.pagination();
        let (total, records) = self.execute(RepositoryOperation::Paginate, columns, |rows| {
            slice(rows, window.offset, window.limit)
        })?;
        let meta = PaginationMeta::new(request.page, request.per_page, total as u64);
        Ok(LengthAwarePage::new(records, meta, request.page_name.clone()))
    }

    fn simple_paginate(
        self,
        request: &PageRequest,
        columns: &[&str],
    ) -> RepositoryResult<SimplePage<Value>> {
        let window = request.pagination();
        let (_, mut records) = self.execute(RepositoryOperation::SimplePaginate, columns, |rows| {
            slice(rows, window.offset, window.limit.saturating_add(1))
        })?;
        let has_more = records.len() as u64 > window.limit;
        records.truncate(usize::try_from(window.limit).unwrap_or(usize::MAX));
        Ok(SimplePage::new(
            records,
            request.page,
            request.per_page,
            has_more,
            request.page_name.clone(),
        ))
    }
}

fn slice(rows: Vec<&Row>, offset: u64, limit: u64) -> Vec<&Row> {
    let offset = usize::try_from(offset).unwrap_or(usize::MAX);
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    rows.into_iter().skip(offset).take(limit).collect()
}

static NULL: Value = Value::Null;

fn field<'a>(row: &'a Row, column: &str) -> &'a Value {
    row.get(column).unwrap_or(&NULL)
}

fn row_matches(row: &Row, clause: &Clause) -> bool {
    match clause {
        Clause::WhereEq { column, value } => values_equal(field(row, column), &value.to_json()),
        Clause::WhereIn { column, values } => {
            let actual = field(row, column);
            values.iter().any(|value| values_equal(actual, &value.to_json()))
        }
        _ => true,
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        _ => a == b,
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(Ordering::Equal),
        },
        (Value::String(x), Value::String(y)) => {
            match (DateTime::parse_from_rfc3339(x), DateTime::parse_from_rfc3339(y)) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => x.cmp(y),
            }
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn load_relation(relation: &Relation, row: &Row) -> Value {
    match relation {
        Relation::HasMany {
            related,
            foreign_key,
            local_key,
        } => {
            let key = field(row, local_key);
            if key.is_null() {
                return Value::Array(Vec::new());
            }
            Value::Array(
                related
                    .live_rows()
                    .filter(|candidate| values_equal(field(candidate, foreign_key), key))
                    .map(|candidate| Value::Object(candidate.clone()))
                    .collect(),
            )
        }
        Relation::BelongsTo {
            related,
            foreign_key,
            owner_key,
        } => {
            let key = field(row, foreign_key);
            if key.is_null() {
                return Value::Null;
            }
            related
                .live_rows()
                .find(|candidate| values_equal(field(candidate, owner_key), key))
                .map_or(Value::Null, |candidate| Value::Object(candidate.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::RepositoryErrorKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn people() -> MemoryModel {
        MemoryModel::new(
            MemoryTable::builder("people")
                .columns(["id", "name", "age", "joined_at", "deleted_at"])
                .soft_delete("deleted_at")
                .row(json!({"id": 1, "name": "cy", "age": 30, "joined_at": "2024-03-01T10:00:00+02:00", "deleted_at": null}))
                .row(json!({"id": 2, "name": "ab", "age": null, "joined_at": "2024-03-01T09:00:00Z", "deleted_at": null}))
                .row(json!({"id": 3, "name": "bo", "age": 30.0, "joined_at": "2024-01-01T00:00:00Z", "deleted_at": "2024-05-01T00:00:00Z"}))
                .build(),
        )
    }

    fn ids(records: &[Value]) -> Vec<i64> {
        records.iter().filter_map(|r| r["id"].as_i64()).collect()
    }

    #[test]
    fn test_soft_deleted_hidden_by_default() {
        let all = people().new_query().get(&["*"]).unwrap();
        assert_eq!(ids(&all), vec![1, 2]);

        let mut query = people().new_query();
        query.with_trashed();
        assert_eq!(ids(&query.get(&["*"]).unwrap()), vec![1, 2, 3]);
    }

    #[test]
    fn test_integer_matches_float() {
        let mut query = people().new_query();
        query.with_trashed();
        query.where_eq("age", 30_i64.into());
        assert_eq!(ids(&query.get(&["*"]).unwrap()), vec![1, 3]);
    }

    #[test]
    fn test_null_condition_matches_null() {
        let mut query = people().new_query();
        query.where_eq("age", FilterValue::Null);
        assert_eq!(ids(&query.get(&["*"]).unwrap()), vec![2]);
    }

    #[test]
    fn test_membership() {
        let mut query = people().new_query();
        query.where_in("name", &["ab".into(), "zz".into()]);
        assert_eq!(ids(&query.get(&["*"]).unwrap()), vec![2]);

        let mut empty = people().new_query();
        empty.where_in("name", &[]);
        assert!(empty.get(&["*"]).unwrap().is_empty());
    }

    #[test]
    fn test_timestamps_order_chronologically() {
        // 10:00+02:00 is 08:00Z, earlier than 09:00Z
        let mut query = people().new_query();
        query.order_by("joined_at", OrderDirection::Ascending);
        assert_eq!(ids(&query.get(&["*"]).unwrap()), vec![1, 2]);
    }

    #[test]
    fn test_nulls_first_ascending_and_stable_ties() {
        let mut query = people().new_query();
        query.with_trashed();
        query.order_by("age", OrderDirection::Ascending);
        assert_eq!(ids(&query.get(&["*"]).unwrap()), vec![2, 1, 3]);

        let mut query = people().new_query();
        query.with_trashed();
        query.order_by("age", OrderDirection::Descending);
        query.order_by("name", OrderDirection::Ascending);
        assert_eq!(ids(&query.get(&["*"]).unwrap()), vec![3, 1, 2]);
    }

    #[test]
    fn test_projection_precedence() {
        let mut query = people().new_query();
        query.select(&["name"]);
        let records = query.clone().get(&["*"]).unwrap();
        assert_eq!(records[0], json!({"name": "cy"}));

        // Existing selection beats terminal columns
        let records = query.get(&["id", "name", "age"]).unwrap();
        assert_eq!(records[0], json!({"name": "cy"}));

        let records = people().new_query().get(&["id"]).unwrap();
        assert_eq!(records[0], json!({"id": 1}));
    }

    #[test]
    fn test_unknown_column() {
        let mut query = people().new_query();
        query.where_eq("nickname", "x".into());
        let error = query.get(&["*"]).unwrap_err();
        assert_eq!(error.kind, RepositoryErrorKind::UnknownColumn);
        assert_eq!(error.operation, RepositoryOperation::Get);

        let error = people().new_query().first(&["nickname"]).unwrap_err();
        assert_eq!(error.kind, RepositoryErrorKind::UnknownColumn);
        assert_eq!(error.operation, RepositoryOperation::First);
    }

    #[test]
    fn test_raw_is_unsupported() {
        let mut query = people().new_query();
        query.where_raw("age > 18");
        let error = query.get(&["*"]).unwrap_err();
        assert_eq!(error.kind, RepositoryErrorKind::Unsupported);
    }

    #[test]
    fn test_unknown_relation() {
        let mut query = people().new_query();
        query.with(&["friends"]);
        let error = query.get(&["*"]).unwrap_err();
        assert_eq!(error.kind, RepositoryErrorKind::UnknownRelation);
        assert_eq!(error.operation, RepositoryOperation::LoadRelation);
    }

    #[test]
    fn test_has_many_uses_unprojected_keys() {
        let comments = MemoryTable::builder("comments")
            .soft_delete("deleted_at")
            .row(json!({"id": 1, "post_id": 7, "body": "first", "deleted_at": null}))
            .row(json!({"id": 2, "post_id": 7, "body": "gone", "deleted_at": "2024-01-01T00:00:00Z"}))
            .row(json!({"id": 3, "post_id": 8, "body": "other", "deleted_at": null}))
            .build();
        let posts = MemoryTable::builder("posts")
            .row(json!({"id": 7, "title": "hello"}))
            .has_many("comments", comments, "post_id", "id")
            .build();

        let mut query = MemoryModel::new(posts).new_query();
        query.with(&["comments"]);
        let records = query.get(&["title"]).unwrap();
        assert_eq!(
            records,
            vec![json!({
                "title": "hello",
                "comments": [{"id": 1, "post_id": 7, "body": "first", "deleted_at": null}],
            })]
        );
    }

    #[test]
    fn test_belongs_to_missing_owner_is_null() {
        let users = MemoryTable::builder("users").row(json!({"id": 1})).build();
        let posts = MemoryTable::builder("posts")
            .row(json!({"id": 1, "user_id": 99}))
            .row(json!({"id": 2, "user_id": null}))
            .belongs_to("author", users, "user_id", "id")
            .build();
        let mut query = MemoryModel::new(posts).new_query();
        query.with(&["author"]);
        let records = query.get(&["*"]).unwrap();
        assert_eq!(records[0]["author"], Value::Null);
        assert_eq!(records[1]["author"], Value::Null);
    }

    #[test]
    fn test_builder_infers_columns_and_skips_non_objects() {
        let table = MemoryTable::builder("t")
            .row(json!({"a": 1}))
            .row(json!([1, 2]))
            .row(json!({"b": 2}))
            .soft_delete("removed_at")
            .build();
        assert_eq!(table.len(), 2);
        assert_eq!(table.columns(), &["a", "b", "removed_at"]);
        assert_eq!(table.soft_delete_column(), Some("removed_at"));
    }

    #[test]
    fn test_paginate_counts_and_slices() {
        let table = MemoryTable::builder("n")
            .rows((1..=45).map(|id| json!({"id": id})))
            .build();
        let model = MemoryModel::new(table);

        let page = model.new_query().paginate(&PageRequest::new(20, 3), &["*"]).unwrap();
        assert_eq!(ids(&page.data), (41..=45).collect::<Vec<_>>());
        assert_eq!(page.pagination.total, 45);
        assert!(!page.pagination.has_next);

        let simple = model.new_query().simple_paginate(&PageRequest::new(20, 2), &["*"]).unwrap();
        assert_eq!(simple.data.len(), 20);
        assert!(simple.has_more);

        let last = model.new_query().simple_paginate(&PageRequest::new(20, 3), &["*"]).unwrap();
        assert_eq!(last.data.len(), 5);
        assert!(!last.has_more);
    }
}
