//! SQL generation
//!
//! Turns an accumulated [`Statement`] into SQL text for one dialect. Clause
//! order is fixed: keyword, table, column list or SET, JOINs, WHERE, GROUP BY,
//! HAVING, ORDER BY, LIMIT/OFFSET, RETURNING.

use crate::dialect::SqlDialect;
use crate::errors::QueryBuilderError;
use crate::query_builder::builder::{
    ColumnValue, SelectColumn, Source, Statement, StatementKind,
};
use crate::query_builder::condition::{Condition, ConditionBuilder};
use crate::query_builder::join::{JoinClause, JoinCondition, JoinType};
use crate::query_builder::params::{CompiledQuery, ParamScope};
use crate::validation::{Identifier, parameter_name, sql_type_name};

pub struct SqlGenerator;

impl SqlGenerator {
    /// Compile a whole statement with fresh parameter bookkeeping
    pub fn compile(
        statement: &Statement,
        dialect: &dyn SqlDialect,
    ) -> Result<CompiledQuery, QueryBuilderError> {
        let mut scope = ParamScope::new(dialect);
        let sql = Self::render_statement(statement, &mut scope)?;
        let returns_rows =
            statement.kind == Some(StatementKind::Select) || !statement.returning.is_empty();
        Ok(scope.finish(sql, returns_rows))
    }

    /// Render a statement into an existing scope, used directly for subqueries
    pub fn render_statement(
        statement: &Statement,
        scope: &mut ParamScope<'_>,
    ) -> Result<String, QueryBuilderError> {
        if let Some(error) = &statement.error {
            return Err(error.clone());
        }

        let kind = statement
            .kind
            .ok_or(QueryBuilderError::MissingStatementKind)?;
        Self::validate_clauses(statement, kind, scope.dialect())?;

        match kind {
            StatementKind::Select => Self::render_select(statement, scope),
            StatementKind::Insert => Self::render_insert(statement, scope),
            StatementKind::Update => Self::render_update(statement, scope),
            StatementKind::Delete => Self::render_delete(statement, scope),
        }
    }

    fn validate_clauses(
        statement: &Statement,
        kind: StatementKind,
        dialect: &dyn SqlDialect,
    ) -> Result<(), QueryBuilderError> {
        let invalid = |clause: &'static str| QueryBuilderError::InvalidClause {
            clause,
            kind: kind.name(),
        };

        if statement.source.is_none() {
            return Err(QueryBuilderError::MissingTable(kind.name()));
        }

        if kind != StatementKind::Select {
            if statement.distinct {
                return Err(invalid("DISTINCT"));
            }
            if !statement.columns.is_empty() {
                return Err(invalid("column list"));
            }
            if !statement.joins.is_empty() {
                return Err(invalid("JOIN"));
            }
            if !statement.group_by.is_empty() {
                return Err(invalid("GROUP BY"));
            }
            if statement.having.condition().is_some() {
                return Err(invalid("HAVING"));
            }
            if !statement.order_by.is_empty() {
                return Err(invalid("ORDER BY"));
            }
            if statement.limit.is_some() || statement.offset.is_some() {
                return Err(invalid("LIMIT/OFFSET"));
            }
            if matches!(statement.source, Some(Source::Subquery { .. })) {
                return Err(invalid("subquery source"));
            }
        }

        match kind {
            StatementKind::Select => {
                if !statement.values.is_empty() {
                    return Err(invalid("VALUES"));
                }
                if !statement.returning.is_empty() {
                    return Err(invalid("RETURNING"));
                }
            }
            StatementKind::Insert => {
                if statement.where_clause.condition().is_some() {
                    return Err(invalid("WHERE"));
                }
                if statement.values.is_empty() {
                    return Err(QueryBuilderError::EmptyValues(kind.name()));
                }
            }
            StatementKind::Update => {
                if statement.values.is_empty() {
                    return Err(QueryBuilderError::EmptyValues(kind.name()));
                }
            }
            StatementKind::Delete => {
                if !statement.values.is_empty() {
                    return Err(invalid("VALUES"));
                }
            }
        }

        if !statement.returning.is_empty() && !dialect.supports_returning() {
            return Err(QueryBuilderError::Unsupported {
                feature: "RETURNING",
                dialect: dialect.kind(),
            });
        }

        for join in &statement.joins {
            if !dialect.supports_join(&join.join_type) {
                return Err(QueryBuilderError::Unsupported {
                    feature: join.join_type.to_sql(),
                    dialect: dialect.kind(),
                });
            }
        }

        Ok(())
    }

    fn render_select(
        statement: &Statement,
        scope: &mut ParamScope<'_>,
    ) -> Result<String, QueryBuilderError> {
        let dialect = scope.dialect();
        let mut sql = String::from("SELECT ");

        if statement.distinct {
            sql.push_str("DISTINCT ");
        }

        if statement.columns.is_empty() {
            sql.push('*');
        } else {
            let columns = statement
                .columns
                .iter()
                .map(|column| match column {
                    SelectColumn::Column(name) => Self::quote_selected(name, dialect),
                    SelectColumn::Raw(expression) => Ok(expression.clone()),
                })
                .collect::<Result<Vec<_>, _>>()?;
            sql.push_str(&columns.join(", "));
        }

        sql.push_str(" FROM ");
        sql.push_str(&Self::render_source(statement, scope)?);

        for join in &statement.joins {
            sql.push(' ');
            sql.push_str(&Self::render_join(join, scope)?);
        }

        Self::push_conditions(&mut sql, " WHERE ", &statement.where_clause, scope)?;

        if !statement.group_by.is_empty() {
            let columns = Self::quote_all(&statement.group_by, dialect)?;
            sql.push_str(" GROUP BY ");
            sql.push_str(&columns.join(", "));
        }

        Self::push_conditions(&mut sql, " HAVING ", &statement.having, scope)?;

        if !statement.order_by.is_empty() {
            let terms = statement
                .order_by
                .iter()
                .map(|term| term.render(dialect))
                .collect::<Result<Vec<_>, _>>()?;
            sql.push_str(" ORDER BY ");
            sql.push_str(&terms.join(", "));
        }

        let limit = dialect.limit_clause(statement.limit, statement.offset);
        if !limit.is_empty() {
            sql.push(' ');
            sql.push_str(&limit);
        }

        Ok(sql)
    }

    fn render_insert(
        statement: &Statement,
        scope: &mut ParamScope<'_>,
    ) -> Result<String, QueryBuilderError> {
        let dialect = scope.dialect();
        let table = Self::render_source(statement, scope)?;

        let mut columns = Vec::with_capacity(statement.values.len());
        let mut placeholders = Vec::with_capacity(statement.values.len());
        for entry in &statement.values {
            columns.push(Self::quote(&entry.column, dialect)?);
            placeholders.push(Self::render_value(entry, scope)?);
        }

        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            columns.join(", "),
            placeholders.join(", ")
        );
        Self::push_returning(&mut sql, statement, dialect)?;
        Ok(sql)
    }

    fn render_update(
        statement: &Statement,
        scope: &mut ParamScope<'_>,
    ) -> Result<String, QueryBuilderError> {
        let dialect = scope.dialect();
        let table = Self::render_source(statement, scope)?;

        let mut assignments = Vec::with_capacity(statement.values.len());
        for entry in &statement.values {
            let quoted = Self::quote(&entry.column, dialect)?;
            let value = Self::render_value(entry, scope)?;
            assignments.push(format!("{} = {}", quoted, value));
        }

        let mut sql = format!("UPDATE {} SET {}", table, assignments.join(", "));
        Self::push_conditions(&mut sql, " WHERE ", &statement.where_clause, scope)?;
        Self::push_returning(&mut sql, statement, dialect)?;
        Ok(sql)
    }

    /// Placeholder for a written value; JSON null is the `NULL` keyword so no
    /// typed parameter is sent for it
    fn render_value(
        entry: &ColumnValue,
        scope: &mut ParamScope<'_>,
    ) -> Result<String, QueryBuilderError> {
        if entry.value.is_null() {
            return Ok("NULL".to_string());
        }
        let sql_type = entry.cast.as_deref().map(sql_type_name).transpose()?;
        let placeholder = scope.bind(&parameter_name(&entry.column), entry.value.clone());
        Ok(match sql_type {
            Some(sql_type) => format!("CAST({} AS {})", placeholder, sql_type),
            None => placeholder,
        })
    }

    fn render_delete(
        statement: &Statement,
        scope: &mut ParamScope<'_>,
    ) -> Result<String, QueryBuilderError> {
        let dialect = scope.dialect();
        let table = Self::render_source(statement, scope)?;

        let mut sql = format!("DELETE FROM {}", table);
        Self::push_conditions(&mut sql, " WHERE ", &statement.where_clause, scope)?;
        Self::push_returning(&mut sql, statement, dialect)?;
        Ok(sql)
    }

    fn render_source(
        statement: &Statement,
        scope: &mut ParamScope<'_>,
    ) -> Result<String, QueryBuilderError> {
        let dialect = scope.dialect();
        match &statement.source {
            Some(Source::Table { name, alias }) => {
                let mut table = Self::quote(name, dialect)?;
                if let Some(alias) = alias {
                    table.push(' ');
                    table.push_str(&Self::quote(alias, dialect)?);
                }
                Ok(table)
            }
            Some(Source::Subquery {
                statement: inner,
                alias,
            }) => {
                if inner.kind != Some(StatementKind::Select) {
                    return Err(QueryBuilderError::NotASelect);
                }
                let alias = Self::quote(alias, dialect)?;
                let rendered = Self::render_statement(inner, scope)?;
                Ok(format!("({}) {}", rendered, alias))
            }
            None => Err(QueryBuilderError::MissingTable(
                statement.kind.map_or("SELECT", |kind| kind.name()),
            )),
        }
    }

    fn render_join(
        join: &JoinClause,
        scope: &mut ParamScope<'_>,
    ) -> Result<String, QueryBuilderError> {
        let dialect = scope.dialect();
        let mut sql = format!("{} {}", join.join_type.to_sql(), Self::quote(&join.table, dialect)?);

        if let Some(alias) = &join.alias {
            sql.push(' ');
            sql.push_str(&Self::quote(alias, dialect)?);
        }

        match (&join.join_type, &join.condition) {
            (JoinType::Cross, JoinCondition::None) => {}
            (JoinType::Cross, _) => {
                return Err(QueryBuilderError::InvalidClause {
                    clause: "ON/USING",
                    kind: JoinType::Cross.to_sql(),
                });
            }
            (join_type, JoinCondition::None) => {
                return Err(QueryBuilderError::InvalidClause {
                    clause: "missing ON/USING",
                    kind: join_type.to_sql(),
                });
            }
            (_, JoinCondition::On(condition)) => {
                sql.push_str(" ON ");
                sql.push_str(&condition.render(scope)?);
            }
            (_, JoinCondition::Using(columns)) => {
                sql.push_str(" USING (");
                sql.push_str(&Self::quote_all(columns, dialect)?.join(", "));
                sql.push(')');
            }
        }

        Ok(sql)
    }

    /// Append `keyword` and the rendered tree, nothing when the tree is trivial
    fn push_conditions(
        sql: &mut String,
        keyword: &str,
        conditions: &ConditionBuilder,
        scope: &mut ParamScope<'_>,
    ) -> Result<(), QueryBuilderError> {
        if conditions.is_empty() {
            return Ok(());
        }
        if let Some(condition) = conditions.condition() {
            sql.push_str(keyword);
            sql.push_str(&Self::strip_outer(condition, scope)?);
        }
        Ok(())
    }

    /// Top-level groups render without their own parentheses
    fn strip_outer(
        condition: &Condition,
        scope: &mut ParamScope<'_>,
    ) -> Result<String, QueryBuilderError> {
        match condition {
            Condition::Group { operator, children } if children.len() > 1 => {
                let rendered = children
                    .iter()
                    .map(|child| child.render(scope))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rendered.join(operator.to_sql()))
            }
            other => other.render(scope),
        }
    }

    fn push_returning(
        sql: &mut String,
        statement: &Statement,
        dialect: &dyn SqlDialect,
    ) -> Result<(), QueryBuilderError> {
        if statement.returning.is_empty() {
            return Ok(());
        }
        sql.push_str(" RETURNING ");
        let columns = statement
            .returning
            .iter()
            .map(|name| Self::quote_selected(name, dialect))
            .collect::<Result<Vec<_>, _>>()?;
        sql.push_str(&columns.join(", "));
        Ok(())
    }

    fn quote(name: &str, dialect: &dyn SqlDialect) -> Result<String, QueryBuilderError> {
        let identifier = Identifier::parse(name, dialect.max_identifier_length())?;
        Ok(identifier.render(|part| dialect.quote_identifier(part)))
    }

    /// Column-list entry, where `*` and `table.*` are allowed
    fn quote_selected(name: &str, dialect: &dyn SqlDialect) -> Result<String, QueryBuilderError> {
        let identifier = Identifier::parse_selected(name, dialect.max_identifier_length())?;
        Ok(identifier.render(|part| dialect.quote_identifier(part)))
    }

    fn quote_all(names: &[String], dialect: &dyn SqlDialect) -> Result<Vec<String>, QueryBuilderError> {
        names.iter().map(|name| Self::quote(name, dialect)).collect()
    }
}
