//! Recording query plan and SQL rendering
//!
//! [`QueryPlan`] implements [`QueryBuilder`] by recording every call as a
//! [`Clause`], in order. A plan can be inspected directly (handy in tests),
//! rendered to PostgreSQL text with `$n` placeholders, or, with the `database`
//! feature, pushed into an `sqlx::QueryBuilder<Postgres>` with real binds.
//!
//! Raw expressions are wrapped in parentheses so an `OR` inside one cannot
//! escape the surrounding `AND` chain.
//!
//! Eager loads are recorded but never rendered: relations are fetched by
//! separate queries.
//!
//! # Example
//!
//! ```rust
//! use acton_criteria::backend::plan::QueryPlan;
//! use acton_criteria::repository::{OrderDirection, QueryBuilder};
//!
//! let mut plan = QueryPlan::new();
//! plan.where_eq("status", "active".into());
//! plan.where_in("role", &["admin".into(), "editor".into()]);
//! plan.order_by("created_at", OrderDirection::Descending);
//!
//! let statement = plan.to_sql("users", Some("deleted_at"));
//! assert_eq!(
//!     statement.sql,
//!     r#"SELECT * FROM "users" WHERE "deleted_at" IS NULL AND "status" = $1 AND "role" IN ($2, $3) ORDER BY "created_at" DESC"#
//! );
//! assert_eq!(statement.binds.len(), 3);
//! ```

use crate::repository::{is_all_columns, FilterValue, OrderDirection, Pagination, QueryBuilder};

/// A single recorded builder call
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Select(Vec<String>),
    OrderBy {
        column: String,
        direction: OrderDirection,
    },
    With(Vec<String>),
    WithTrashed,
    WhereEq {
        column: String,
        value: FilterValue,
    },
    WhereIn {
        column: String,
        values: Vec<FilterValue>,
    },
    WhereRaw(String),
}

impl Clause {
    fn is_where(&self) -> bool {
        matches!(
            self,
            Clause::WhereEq { .. } | Clause::WhereIn { .. } | Clause::WhereRaw(_)
        )
    }
}

/// Ordered record of builder calls
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPlan {
    clauses: Vec<Clause>,
}

impl QueryPlan {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every recorded clause, in call order
    #[must_use]
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// The effective column selection; `None` means every column
    ///
    /// The most recent explicit selection wins.
    #[must_use]
    pub fn selected(&self) -> Option<Vec<String>> {
        self.clauses.iter().rev().find_map(|clause| match clause {
            Clause::Select(columns) => {
                let refs: Vec<&str> = columns.iter().map(String::as_str).collect();
                (!is_all_columns(&refs)).then(|| columns.clone())
            }
            _ => None,
        })
    }

    /// ORDER BY terms, in the order they were added
    #[must_use]
    pub fn orderings(&self) -> Vec<(&str, OrderDirection)> {
        self.clauses
            .iter()
            .filter_map(|clause| match clause {
                Clause::OrderBy { column, direction } => Some((column.as_str(), *direction)),
                _ => None,
            })
            .collect()
    }

    /// Requested eager loads, each relation once
    #[must_use]
    pub fn relations(&self) -> Vec<&str> {
        let mut relations: Vec<&str> = Vec::new();
        for clause in &self.clauses {
            if let Clause::With(names) = clause {
                for name in names {
                    if !relations.contains(&name.as_str()) {
                        relations.push(name);
                    }
                }
            }
        }
        relations
    }

    /// Whether soft-deleted rows are included
    #[must_use]
    pub fn includes_trashed(&self) -> bool {
        self.clauses.iter().any(|clause| matches!(clause, Clause::WithTrashed))
    }

    /// WHERE clauses, in call order
    pub fn filters(&self) -> impl Iterator<Item = &Clause> {
        self.clauses.iter().filter(|clause| clause.is_where())
    }

    /// Render a SELECT statement over `table`
    ///
    /// Rows with a non-null `soft_delete_column` are excluded unless the plan
    /// includes trashed rows.
    #[must_use]
    pub fn to_sql(&self, table: &str, soft_delete_column: Option<&str>) -> SqlStatement {
        let mut text = SqlText::default();
        self.write_select(&mut text, table, soft_delete_column);
        text.finish()
    }

    /// Render a `COUNT(*)` over the same rows as [`to_sql`](Self::to_sql)
    #[must_use]
    pub fn to_count_sql(&self, table: &str, soft_delete_column: Option<&str>) -> SqlStatement {
        let mut text = SqlText::default();
        text.push("SELECT COUNT(*) FROM ");
        text.push(&quote_identifier(table));
        self.write_where(&mut text, soft_delete_column);
        text.finish()
    }

    fn write_select<S: SqlSink>(&self, sink: &mut S, table: &str, soft_delete_column: Option<&str>) {
        sink.push("SELECT ");
        match self.selected() {
            Some(columns) => {
                let quoted: Vec<String> = columns.iter().map(|c| quote_identifier(c)).collect();
                sink.push(&quoted.join(", "));
            }
            None => sink.push("*"),
        }
        sink.push(" FROM ");
        sink.push(&quote_identifier(table));
        self.write_where(sink, soft_delete_column);

        let orderings = self.orderings();
        if !orderings.is_empty() {
            let terms: Vec<String> = orderings
                .iter()
                .map(|(column, direction)| format!("{} {}", quote_identifier(column), direction.as_sql()))
                .collect();
            sink.push(" ORDER BY ");
            sink.push(&terms.join(", "));
        }
    }

    fn write_where<S: SqlSink>(&self, sink: &mut S, soft_delete_column: Option<&str>) {
        let mut first = true;
        let mut separator = |sink: &mut S| {
            sink.push(if first { " WHERE " } else { " AND " });
            first = false;
        };

        if let Some(column) = soft_delete_column.filter(|_| !self.includes_trashed()) {
            separator(sink);
            sink.push(&quote_identifier(column));
            sink.push(" IS NULL");
        }

        for clause in self.filters() {
            separator(sink);
            match clause {
                Clause::WhereEq {
                    column,
                    value: FilterValue::Null,
                } => {
                    sink.push(&quote_identifier(column));
                    sink.push(" IS NULL");
                }
                Clause::WhereEq { column, value } => {
                    sink.push(&quote_identifier(column));
                    sink.push(" = ");
                    sink.push_bind(value);
                }
                Clause::WhereIn { values, .. } if values.is_empty() => sink.push("1 = 0"),
                Clause::WhereIn { column, values } => {
                    sink.push(&quote_identifier(column));
                    sink.push(" IN (");
                    for (i, value) in values.iter().enumerate() {
                        if i > 0 {
                            sink.push(", ");
                        }
                        sink.push_bind(value);
                    }
                    sink.push(")");
                }
                Clause::WhereRaw(expression) => {
                    sink.push("(");
                    sink.push(expression);
                    sink.push(")");
                }
                _ => {}
            }
        }
    }
}

impl QueryBuilder for QueryPlan {
    fn select(&mut self, columns: &[&str]) {
        self.clauses
            .push(Clause::Select(columns.iter().map(|c| (*c).to_string()).collect()));
    }

    fn order_by(&mut self, column: &str, direction: OrderDirection) {
        self.clauses.push(Clause::OrderBy {
            column: column.to_string(),
            direction,
        });
    }

    fn with(&mut self, relations: &[&str]) {
        self.clauses
            .push(Clause::With(relations.iter().map(|r| (*r).to_string()).collect()));
    }

    fn with_trashed(&mut self) {
        self.clauses.push(Clause::WithTrashed);
    }

    fn where_eq(&mut self, column: &str, value: FilterValue) {
        self.clauses.push(Clause::WhereEq {
            column: column.to_string(),
            value,
        });
    }

    fn where_in(&mut self, column: &str, values: &[FilterValue]) {
        self.clauses.push(Clause::WhereIn {
            column: column.to_string(),
            values: values.to_vec(),
        });
    }

    fn where_raw(&mut self, expression: &str) {
        self.clauses.push(Clause::WhereRaw(expression.to_string()));
    }
}

/// Rendered SQL text plus its positional binds
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    /// Values for `$1`, `$2`, ... in order
    pub binds: Vec<FilterValue>,
}

impl SqlStatement {
    /// Append LIMIT/OFFSET for one page
    #[must_use]
    pub fn paginated(mut self, pagination: Pagination) -> Self {
        self.sql
            .push_str(&format!(" LIMIT {} OFFSET {}", pagination.limit, pagination.offset));
        self
    }
}

/// Double-quote an identifier, keeping `*` and `table.column` qualification
fn quote_identifier(identifier: &str) -> String {
    identifier
        .split('.')
        .map(|part| {
            if part == "*" {
                part.to_string()
            } else {
                format!("\"{}\"", part.replace('"', "\"\""))
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Destination for rendered SQL
trait SqlSink {
    fn push(&mut self, sql: &str);
    fn push_bind(&mut self, value: &FilterValue);
}

#[derive(Default)]
struct SqlText {
    sql: String,
    binds: Vec<FilterValue>,
}

impl SqlText {
    fn finish(self) -> SqlStatement {
        SqlStatement {
            sql: self.sql,
            binds: self.binds,
        }
    }
}

impl SqlSink for SqlText {
    fn push(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    fn push_bind(&mut self, value: &FilterValue) {
        self.binds.push(value.clone());
        self.sql.push_str(&format!("${}", self.binds.len()));
    }
}

#[cfg(feature = "database")]
mod postgres {
    use sqlx::{Postgres, QueryBuilder};

    use super::{quote_identifier, QueryPlan, SqlSink};
    use crate::repository::{FilterValue, Pagination};

    impl<'args> SqlSink for QueryBuilder<'args, Postgres> {
        fn push(&mut self, sql: &str) {
            QueryBuilder::push(self, sql);
        }

        fn push_bind(&mut self, value: &FilterValue) {
            match value.clone() {
                FilterValue::Null => QueryBuilder::push_bind(self, None::<String>),
                FilterValue::Boolean(b) => QueryBuilder::push_bind(self, b),
                FilterValue::Integer(n) => QueryBuilder::push_bind(self, n),
                FilterValue::Float(n) => QueryBuilder::push_bind(self, n),
                FilterValue::String(s) => QueryBuilder::push_bind(self, s),
            };
        }
    }

    impl QueryPlan {
        /// Write this plan's SELECT into an sqlx builder with real binds
        pub fn push_sql<'args>(
            &self,
            builder: &mut QueryBuilder<'args, Postgres>,
            table: &str,
            soft_delete_column: Option<&str>,
        ) {
            self.write_select(builder, table, soft_delete_column);
        }

        /// Write this plan's COUNT(*) into an sqlx builder
        pub fn push_count_sql<'args>(
            &self,
            builder: &mut QueryBuilder<'args, Postgres>,
            table: &str,
            soft_delete_column: Option<&str>,
        ) {
            builder.push("SELECT COUNT(*) FROM ");
            builder.push(quote_identifier(table));
            self.write_where(builder, soft_delete_column);
        }
    }

    /// Append LIMIT/OFFSET binds for one page
    pub fn push_pagination<'args>(builder: &mut QueryBuilder<'args, Postgres>, pagination: Pagination) {
        let limit = i64::try_from(pagination.limit).unwrap_or(i64::MAX);
        let offset = i64::try_from(pagination.offset).unwrap_or(i64::MAX);
        builder.push(" LIMIT ").push_bind(limit).push(" OFFSET ").push_bind(offset);
    }
}

#[cfg(feature = "database")]
pub use postgres::push_pagination;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_records_calls_in_order() {
        let mut plan = QueryPlan::new();
        plan.with_trashed();
        plan.where_raw("a > 1");
        plan.select(&["id"]);
        assert_eq!(
            plan.clauses(),
            &[
                Clause::WithTrashed,
                Clause::WhereRaw("a > 1".to_string()),
                Clause::Select(vec!["id".to_string()]),
            ]
        );
    }

    #[test]
    fn test_selected_last_wins_and_star_means_all() {
        let mut plan = QueryPlan::new();
        assert_eq!(plan.selected(), None);
        plan.select(&["id"]);
        plan.select(&["name", "email"]);
        assert_eq!(plan.selected(), Some(vec!["name".to_string(), "email".to_string()]));
        plan.select(&["*"]);
        assert_eq!(plan.selected(), None);
    }

    #[test]
    fn test_relations_deduplicated() {
        let mut plan = QueryPlan::new();
        plan.with(&["author", "tags"]);
        plan.with(&["author"]);
        assert_eq!(plan.relations(), vec!["author", "tags"]);
    }

    #[test]
    fn test_soft_delete_excluded_unless_trashed() {
        let mut plan = QueryPlan::new();
        assert_eq!(
            plan.to_sql("posts", Some("deleted_at")).sql,
            r#"SELECT * FROM "posts" WHERE "deleted_at" IS NULL"#
        );
        plan.with_trashed();
        assert_eq!(plan.to_sql("posts", Some("deleted_at")).sql, r#"SELECT * FROM "posts""#);
    }

    #[test]
    fn test_null_equality_and_empty_membership() {
        let mut plan = QueryPlan::new();
        plan.where_eq("parent_id", FilterValue::Null);
        plan.where_in("id", &[]);
        let statement = plan.to_sql("nodes", None);
        assert_eq!(
            statement.sql,
            r#"SELECT * FROM "nodes" WHERE "parent_id" IS NULL AND 1 = 0"#
        );
        assert!(statement.binds.is_empty());
    }

    #[test]
    fn test_projection_and_raw() {
        let mut plan = QueryPlan::new();
        plan.select(&["users.id", "name"]);
        plan.where_raw("votes > 100");
        plan.order_by("name", OrderDirection::Ascending);
        assert_eq!(
            plan.to_sql("users", None).sql,
            r#"SELECT "users"."id", "name" FROM "users" WHERE (votes > 100) ORDER BY "name" ASC"#
        );
    }

    #[test]
    fn test_raw_disjunction_stays_inside_soft_delete_guard() {
        let mut plan = QueryPlan::new();
        plan.where_raw("a = 1 OR b = 2");
        plan.where_eq("status", "active".into());
        assert_eq!(
            plan.to_sql("users", Some("deleted_at")).sql,
            r#"SELECT * FROM "users" WHERE "deleted_at" IS NULL AND (a = 1 OR b = 2) AND "status" = $1"#
        );
        assert_eq!(
            plan.to_count_sql("users", Some("deleted_at")).sql,
            r#"SELECT COUNT(*) FROM "users" WHERE "deleted_at" IS NULL AND (a = 1 OR b = 2) AND "status" = $1"#
        );
    }

    #[test]
    fn test_count_and_pagination() {
        let mut plan = QueryPlan::new();
        plan.where_eq("status", "draft".into());
        plan.order_by("id", OrderDirection::Ascending);
        let count = plan.to_count_sql("posts", None);
        assert_eq!(count.sql, r#"SELECT COUNT(*) FROM "posts" WHERE "status" = $1"#);
        assert_eq!(count.binds, vec![FilterValue::from("draft")]);

        let page = plan.to_sql("posts", None).paginated(Pagination::page(2, 20));
        assert!(page.sql.ends_with(r#"ORDER BY "id" ASC LIMIT 20 OFFSET 20"#));
    }

    #[test]
    fn test_identifier_quotes_escaped() {
        assert_eq!(quote_identifier(r#"we"ird"#), r#""we""ird""#);
        assert_eq!(quote_identifier("*"), "*");
    }

    #[cfg(feature = "database")]
    #[test]
    fn test_push_sql_matches_text_rendering() {
        let mut plan = QueryPlan::new();
        plan.where_eq("status", "active".into());
        plan.where_in("id", &[1_i64.into(), 2_i64.into()]);

        let mut builder = sqlx::QueryBuilder::<sqlx::Postgres>::new("");
        plan.push_sql(&mut builder, "users", Some("deleted_at"));
        assert_eq!(builder.sql(), plan.to_sql("users", Some("deleted_at")).sql);
    }
}
