//! Fluent query builder
//!
//! Builder calls take `self` and return it, so statements read as one chain.
//! Misuse (switching statement kind, subqueries that are not SELECTs) is
//! recorded on the first offending call and reported by `compile`, before any
//! SQL reaches the database.

use crate::dialect::SqlDialect;
use crate::driver::Driver;
use crate::errors::{QueryBuilderError, Result};
use crate::native::{ColumnValues, QueryResult};
use crate::query_builder::condition::{Condition, ConditionBuilder};
use crate::query_builder::join::{JoinClause, JoinType};
use crate::query_builder::ordering::{OrderTerm, SortOrder};
use crate::query_builder::params::{CompiledQuery, Params};
use crate::query_builder::sql_generation::SqlGenerator;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl StatementKind {
    pub fn name(&self) -> &'static str {
        match self {
            StatementKind::Select => "SELECT",
            StatementKind::Insert => "INSERT",
            StatementKind::Update => "UPDATE",
            StatementKind::Delete => "DELETE",
        }
    }
}

/// One entry of the SELECT list
#[derive(Debug, Clone, PartialEq)]
pub enum SelectColumn {
    /// Validated and quoted identifier, `*` allowed
    Column(String),
    /// Expression copied verbatim, e.g. `COUNT(*) AS total`
    Raw(String),
}

/// What the statement reads from or writes to
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Table {
        name: String,
        alias: Option<String>,
    },
    Subquery {
        statement: Box<Statement>,
        alias: String,
    },
}

/// One INSERT column or UPDATE assignment
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnValue {
    pub column: String,
    pub value: Value,
    /// SQL type the placeholder is cast to, e.g. `uuid`
    pub cast: Option<String>,
}

/// Accumulated statement state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statement {
    pub(crate) kind: Option<StatementKind>,
    pub(crate) source: Option<Source>,
    pub(crate) columns: Vec<SelectColumn>,
    pub(crate) distinct: bool,
    pub(crate) joins: Vec<JoinClause>,
    pub(crate) where_clause: ConditionBuilder,
    pub(crate) having: ConditionBuilder,
    pub(crate) group_by: Vec<String>,
    pub(crate) order_by: Vec<OrderTerm>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
    pub(crate) values: Vec<ColumnValue>,
    pub(crate) returning: Vec<String>,
    pub(crate) error: Option<QueryBuilderError>,
}

impl Statement {
    pub fn kind(&self) -> Option<StatementKind> {
        self.kind
    }

    pub fn where_condition(&self) -> Option<&Condition> {
        self.where_clause.condition()
    }

    pub fn having_condition(&self) -> Option<&Condition> {
        self.having.condition()
    }

    fn record(&mut self, error: QueryBuilderError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn choose(&mut self, kind: StatementKind) {
        match self.kind {
            Some(existing) if existing != kind => self.record(QueryBuilderError::KindAlreadyChosen {
                existing: existing.name(),
                requested: kind.name(),
            }),
            _ => self.kind = Some(kind),
        }
    }

    /// Set the table of a write statement; a source from `from*` conflicts
    fn target(&mut self, kind: StatementKind, table: &str) {
        if self.kind.is_none() && self.source.is_some() {
            self.record(QueryBuilderError::KindAlreadyChosen {
                existing: StatementKind::Select.name(),
                requested: kind.name(),
            });
        }
        self.choose(kind);
        self.source = Some(Source::Table {
            name: table.to_string(),
            alias: None,
        });
    }

    /// Set the source of a SELECT; write statements keep their table
    fn read_from(&mut self, source: Source) {
        match self.kind {
            Some(kind) if kind != StatementKind::Select => {
                self.record(QueryBuilderError::InvalidClause {
                    clause: "FROM",
                    kind: kind.name(),
                });
            }
            _ => self.source = Some(source),
        }
    }

    fn set_value(&mut self, column: String, value: Value, cast: Option<String>) {
        match self.values.iter_mut().find(|entry| entry.column == column) {
            Some(entry) => {
                entry.value = value;
                entry.cast = cast;
            }
            None => self.values.push(ColumnValue {
                column,
                value,
                cast,
            }),
        }
    }
}

/// Query builder bound to a dialect and, when created by a driver, to that driver
#[derive(Clone)]
pub struct QueryBuilder {
    dialect: &'static dyn SqlDialect,
    driver: Option<Arc<dyn Driver>>,
    statement: Statement,
}

impl fmt::Debug for QueryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("dialect", &self.dialect.kind())
            .field("bound", &self.driver.is_some())
            .field("statement", &self.statement)
            .finish()
    }
}

impl QueryBuilder {
    /// Builder that can compile but not execute
    pub fn detached(dialect: &'static dyn SqlDialect) -> Self {
        Self {
            dialect,
            driver: None,
            statement: Statement::default(),
        }
    }

    /// Builder executing through `driver`
    pub fn bound(driver: Arc<dyn Driver>) -> Self {
        Self {
            dialect: driver.dialect(),
            driver: Some(driver),
            statement: Statement::default(),
        }
    }

    pub fn dialect(&self) -> &'static dyn SqlDialect {
        self.dialect
    }

    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    pub(crate) fn into_statement(self) -> Statement {
        self.statement
    }

    /// A fresh builder sharing this builder's dialect and driver, for subqueries
    pub fn subquery(&self) -> Self {
        Self {
            dialect: self.dialect,
            driver: self.driver.clone(),
            statement: Statement::default(),
        }
    }

    // ---- statement kind ----

    /// Start a SELECT of the given columns (empty selects `*`)
    pub fn select(mut self, columns: &[&str]) -> Self {
        self.statement.choose(StatementKind::Select);
        self.statement.columns.extend(
            columns
                .iter()
                .map(|column| SelectColumn::Column(column.to_string())),
        );
        self
    }

    /// Add a raw expression to the SELECT list
    pub fn select_raw(mut self, expression: &str) -> Self {
        self.statement.choose(StatementKind::Select);
        self.statement
            .columns
            .push(SelectColumn::Raw(expression.to_string()));
        self
    }

    pub fn distinct(mut self) -> Self {
        self.statement.distinct = true;
        self
    }

    pub fn from(mut self, table: &str) -> Self {
        self.statement.read_from(Source::Table {
            name: table.to_string(),
            alias: None,
        });
        self
    }

    pub fn from_as(mut self, table: &str, alias: &str) -> Self {
        self.statement.read_from(Source::Table {
            name: table.to_string(),
            alias: Some(alias.to_string()),
        });
        self
    }

    /// Select from a derived table
    pub fn from_subquery(mut self, subquery: QueryBuilder, alias: &str) -> Self {
        let statement = subquery.into_statement();
        if statement.kind != Some(StatementKind::Select) {
            self.statement.record(QueryBuilderError::NotASelect);
        }
        self.statement.read_from(Source::Subquery {
            statement: Box::new(statement),
            alias: alias.to_string(),
        });
        self
    }

    pub fn insert_into(mut self, table: &str) -> Self {
        self.statement.target(StatementKind::Insert, table);
        self
    }

    pub fn update(mut self, table: &str) -> Self {
        self.statement.target(StatementKind::Update, table);
        self
    }

    pub fn delete_from(mut self, table: &str) -> Self {
        self.statement.target(StatementKind::Delete, table);
        self
    }

    // ---- values ----

    /// Column value for INSERT
    pub fn value(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.statement
            .set_value(column.to_string(), value.into(), None);
        self
    }

    /// Column value bound as `CAST(<placeholder> AS sql_type)`.
    ///
    /// Strings always bind as text, so typed columns such as `uuid` or
    /// `timestamptz` on PostgreSQL take their values through here.
    pub fn value_as(mut self, column: &str, value: impl Into<Value>, sql_type: &str) -> Self {
        self.statement
            .set_value(column.to_string(), value.into(), Some(sql_type.to_string()));
        self
    }

    /// Column values for INSERT
    pub fn values(mut self, values: ColumnValues) -> Self {
        for (column, value) in values {
            self.statement.set_value(column, value, None);
        }
        self
    }

    /// Column assignment for UPDATE
    pub fn set(self, column: &str, value: impl Into<Value>) -> Self {
        self.value(column, value)
    }

    /// Typed column assignment for UPDATE, see [`QueryBuilder::value_as`]
    pub fn set_as(self, column: &str, value: impl Into<Value>, sql_type: &str) -> Self {
        self.value_as(column, value, sql_type)
    }

    /// Column assignments for UPDATE
    pub fn set_values(self, values: ColumnValues) -> Self {
        self.values(values)
    }

    /// RETURNING columns (PostgreSQL, SQLite)
    pub fn returning(mut self, columns: &[&str]) -> Self {
        self.statement
            .returning
            .extend(columns.iter().map(|column| column.to_string()));
        self
    }

    // ---- joins ----

    /// Add a prebuilt JOIN clause
    pub fn join_clause(mut self, join: JoinClause) -> Self {
        self.statement.joins.push(join);
        self
    }

    /// `<type> JOIN table [alias] ON <condition>`
    pub fn join(self, join_type: JoinType, table: &str, alias: Option<&str>, on: Condition) -> Self {
        let mut join = JoinClause::new_on(join_type, table, on);
        if let Some(alias) = alias {
            join = join.with_alias(alias);
        }
        self.join_clause(join)
    }

    pub fn inner_join(self, table: &str, alias: Option<&str>, on: Condition) -> Self {
        self.join(JoinType::Inner, table, alias, on)
    }

    pub fn left_join(self, table: &str, alias: Option<&str>, on: Condition) -> Self {
        self.join(JoinType::Left, table, alias, on)
    }

    pub fn right_join(self, table: &str, alias: Option<&str>, on: Condition) -> Self {
        self.join(JoinType::Right, table, alias, on)
    }

    pub fn full_join(self, table: &str, alias: Option<&str>, on: Condition) -> Self {
        self.join(JoinType::Full, table, alias, on)
    }

    pub fn cross_join(self, table: &str) -> Self {
        self.join_clause(JoinClause::cross(table))
    }

    pub fn join_using(self, join_type: JoinType, table: &str, columns: &[&str]) -> Self {
        self.join_clause(JoinClause::new_using(
            join_type,
            table,
            columns.iter().map(|column| column.to_string()).collect(),
        ))
    }

    // ---- WHERE ----

    /// AND a predicate with named placeholders onto the WHERE tree
    pub fn and_where(mut self, predicate: &str, params: impl Into<Params>) -> Self {
        self.statement.where_clause = self.statement.where_clause.and_where(predicate, params);
        self
    }

    /// OR a predicate with named placeholders onto the WHERE tree
    pub fn or_where(mut self, predicate: &str, params: impl Into<Params>) -> Self {
        self.statement.where_clause = self.statement.where_clause.or_where(predicate, params);
        self
    }

    /// AND a prebuilt condition onto the WHERE tree
    pub fn filter(mut self, condition: Condition) -> Self {
        self.statement.where_clause = self.statement.where_clause.filter(condition);
        self
    }

    /// OR a prebuilt condition onto the WHERE tree
    pub fn or_filter(mut self, condition: Condition) -> Self {
        self.statement.where_clause = self.statement.where_clause.or_filter(condition);
        self
    }

    /// AND a parenthesized group
    pub fn and_where_group<F>(mut self, build: F) -> Self
    where
        F: FnOnce(ConditionBuilder) -> ConditionBuilder,
    {
        self.statement.where_clause = self.statement.where_clause.and_where_group(build);
        self
    }

    /// OR a parenthesized group
    pub fn or_where_group<F>(mut self, build: F) -> Self
    where
        F: FnOnce(ConditionBuilder) -> ConditionBuilder,
    {
        self.statement.where_clause = self.statement.where_clause.or_where_group(build);
        self
    }

    // ---- grouping, ordering, paging ----

    pub fn group_by(mut self, columns: &[&str]) -> Self {
        self.statement
            .group_by
            .extend(columns.iter().map(|column| column.to_string()));
        self
    }

    pub fn and_having(mut self, predicate: &str, params: impl Into<Params>) -> Self {
        self.statement.having = self.statement.having.and_where(predicate, params);
        self
    }

    pub fn or_having(mut self, predicate: &str, params: impl Into<Params>) -> Self {
        self.statement.having = self.statement.having.or_where(predicate, params);
        self
    }

    pub fn order_by(mut self, column: &str, order: SortOrder) -> Self {
        self.statement.order_by.push(OrderTerm::new(column, order));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.statement.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.statement.offset = Some(offset);
        self
    }

    // ---- compile & execute ----

    /// Render SQL and bindings; does not change the builder
    pub fn compile(&self) -> Result<CompiledQuery, QueryBuilderError> {
        SqlGenerator::compile(&self.statement, self.dialect)
    }

    /// Compile and run through the bound driver
    pub async fn execute(&self) -> Result<QueryResult> {
        let driver = self.driver.as_ref().ok_or(QueryBuilderError::Unbound)?;
        let compiled = self.compile()?;
        driver.run_compiled(&compiled).await
    }

    /// Execute and deserialize every row into `T`
    pub async fn fetch_all<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        let result = self.execute().await?;
        result
            .rows
            .into_iter()
            .map(|row| serde_json::from_value(Value::Object(row)).map_err(Into::into))
            .collect()
    }

    /// Execute and deserialize the first row, if any
    pub async fn fetch_optional<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        let result = self.execute().await?;
        match result.rows.into_iter().next() {
            Some(row) => Ok(Some(serde_json::from_value(Value::Object(row))?)),
            None => Ok(None),
        }
    }

    /// Execute and deserialize the first row, failing when there is none
    pub async fn fetch_one<T: DeserializeOwned>(&self) -> Result<T> {
        self.fetch_optional()
            .await?
            .ok_or(crate::errors::Error::RowNotFound)
    }
}
