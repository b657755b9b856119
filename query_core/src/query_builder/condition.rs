//! Condition expression tree for WHERE, HAVING and JOIN ... ON
//!
//! A condition is either a raw predicate fragment with named `:placeholders`
//! and their values, a boolean group of child conditions, or a predicate over a
//! subquery. Rendering is pure: the same tree always produces the same SQL and
//! bindings.

use crate::errors::QueryBuilderError;
use crate::query_builder::builder::{QueryBuilder, Statement, StatementKind};
use crate::query_builder::params::{ParamScope, Params};
use crate::query_builder::sql_generation::SqlGenerator;
use crate::validation::parameter_name;
use serde_json::Value;
use std::collections::HashMap;

/// Rendered for a group with no children
pub const ALWAYS_TRUE: &str = "1 = 1";
/// Rendered for an IN over an empty list
pub const ALWAYS_FALSE: &str = "1 = 0";

/// Logical operators for combining conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

impl LogicalOperator {
    pub fn to_sql(&self) -> &'static str {
        match self {
            LogicalOperator::And => " AND ",
            LogicalOperator::Or => " OR ",
        }
    }
}

/// Predicate fragment plus the values for its placeholders
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    pub fragment: String,
    pub params: Params,
}

/// Condition that can be nested
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Leaf(Leaf),
    Group {
        operator: LogicalOperator,
        children: Vec<Condition>,
    },
    /// `<prefix> (<select>)`, e.g. `user_id IN (SELECT ...)` or `EXISTS (SELECT ...)`
    Subquery {
        prefix: String,
        statement: Box<Statement>,
    },
}

impl Condition {
    /// Predicate fragment with named placeholders, e.g. `age > :min_age`
    pub fn leaf(fragment: impl Into<String>, params: impl Into<Params>) -> Self {
        Self::Leaf(Leaf {
            fragment: fragment.into(),
            params: params.into(),
        })
    }

    /// Predicate without any bound values
    pub fn raw(fragment: impl Into<String>) -> Self {
        Self::leaf(fragment, Params::new())
    }

    /// Create AND group
    pub fn and(children: Vec<Condition>) -> Self {
        Self::Group {
            operator: LogicalOperator::And,
            children,
        }
    }

    /// Create OR group
    pub fn or(children: Vec<Condition>) -> Self {
        Self::Group {
            operator: LogicalOperator::Or,
            children,
        }
    }

    /// Empty group, renders as always true
    pub fn empty() -> Self {
        Self::and(Vec::new())
    }

    fn comparison(field: &str, operator: &str, value: Value) -> Self {
        let name = parameter_name(field);
        Self::leaf(
            format!("{} {} :{}", field, operator, name),
            Params::new().with(name, value),
        )
    }

    /// Equal condition, a JSON null becomes `IS NULL`
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        match value.into() {
            Value::Null => Self::is_null(field),
            value => Self::comparison(field, "=", value),
        }
    }

    /// Not equal condition, a JSON null becomes `IS NOT NULL`
    pub fn ne(field: &str, value: impl Into<Value>) -> Self {
        match value.into() {
            Value::Null => Self::is_not_null(field),
            value => Self::comparison(field, "<>", value),
        }
    }

    pub fn gt(field: &str, value: impl Into<Value>) -> Self {
        Self::comparison(field, ">", value.into())
    }

    pub fn gte(field: &str, value: impl Into<Value>) -> Self {
        Self::comparison(field, ">=", value.into())
    }

    pub fn lt(field: &str, value: impl Into<Value>) -> Self {
        Self::comparison(field, "<", value.into())
    }

    pub fn lte(field: &str, value: impl Into<Value>) -> Self {
        Self::comparison(field, "<=", value.into())
    }

    pub fn like(field: &str, pattern: &str) -> Self {
        Self::comparison(field, "LIKE", Value::String(pattern.to_string()))
    }

    /// IN condition, empty list never matches
    pub fn in_values(field: &str, values: Vec<Value>) -> Self {
        Self::list(field, "IN", values, ALWAYS_FALSE)
    }

    /// NOT IN condition, empty list always matches
    pub fn not_in_values(field: &str, values: Vec<Value>) -> Self {
        Self::list(field, "NOT IN", values, ALWAYS_TRUE)
    }

    fn list(field: &str, operator: &str, values: Vec<Value>, when_empty: &str) -> Self {
        if values.is_empty() {
            return Self::raw(when_empty);
        }

        let base = parameter_name(field);
        let mut params = Params::new();
        let placeholders: Vec<String> = values
            .into_iter()
            .enumerate()
            .map(|(i, value)| {
                let name = format!("{}_{}", base, i);
                let placeholder = format!(":{}", name);
                params.insert(name, value);
                placeholder
            })
            .collect();

        Self::leaf(
            format!("{} {} ({})", field, operator, placeholders.join(", ")),
            params,
        )
    }

    pub fn is_null(field: &str) -> Self {
        Self::raw(format!("{} IS NULL", field))
    }

    pub fn is_not_null(field: &str) -> Self {
        Self::raw(format!("{} IS NOT NULL", field))
    }

    /// `field IN (subquery)`
    pub fn in_subquery(field: &str, subquery: QueryBuilder) -> Self {
        Self::Subquery {
            prefix: format!("{} IN", field),
            statement: Box::new(subquery.into_statement()),
        }
    }

    /// `EXISTS (subquery)`
    pub fn exists(subquery: QueryBuilder) -> Self {
        Self::Subquery {
            prefix: "EXISTS".to_string(),
            statement: Box::new(subquery.into_statement()),
        }
    }

    /// `NOT EXISTS (subquery)`
    pub fn not_exists(subquery: QueryBuilder) -> Self {
        Self::Subquery {
            prefix: "NOT EXISTS".to_string(),
            statement: Box::new(subquery.into_statement()),
        }
    }

    /// True when the tree holds no predicate at all, so it is always true
    pub fn is_trivial(&self) -> bool {
        match self {
            Condition::Leaf(_) | Condition::Subquery { .. } => false,
            Condition::Group { children, .. } => children.iter().all(Condition::is_trivial),
        }
    }

    /// Combine `self` with `next` under `operator`, extending a group of the same
    /// operator instead of nesting it
    pub fn combine(self, operator: LogicalOperator, next: Condition) -> Self {
        match self {
            Condition::Group {
                operator: existing,
                mut children,
            } if existing == operator => {
                children.push(next);
                Condition::Group { operator, children }
            }
            current => Condition::Group {
                operator,
                children: vec![current, next],
            },
        }
    }

    /// Render into SQL, registering every bound value in `scope`
    pub fn render(&self, scope: &mut ParamScope<'_>) -> Result<String, QueryBuilderError> {
        match self {
            Condition::Leaf(leaf) => render_leaf(leaf, scope),
            Condition::Group { operator, children } => match children.as_slice() {
                [] => Ok(ALWAYS_TRUE.to_string()),
                [only] => only.render(scope),
                _ => {
                    let rendered = children
                        .iter()
                        .map(|child| child.render(scope))
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(format!("({})", rendered.join(operator.to_sql())))
                }
            },
            Condition::Subquery { prefix, statement } => {
                if statement.kind != Some(StatementKind::Select) {
                    return Err(QueryBuilderError::NotASelect);
                }
                let inner = SqlGenerator::render_statement(statement, scope)?;
                Ok(format!("{} ({})", prefix, inner))
            }
        }
    }
}

impl From<Leaf> for Condition {
    fn from(leaf: Leaf) -> Self {
        Condition::Leaf(leaf)
    }
}

/// Builds a condition tree by chaining, left to right
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionBuilder {
    root: Option<Condition>,
}

impl ConditionBuilder {
    pub fn new() -> Self {
        Self { root: None }
    }

    pub fn and_where(self, predicate: &str, params: impl Into<Params>) -> Self {
        self.push(LogicalOperator::And, Condition::leaf(predicate, params))
    }

    pub fn or_where(self, predicate: &str, params: impl Into<Params>) -> Self {
        self.push(LogicalOperator::Or, Condition::leaf(predicate, params))
    }

    /// AND a prebuilt condition
    pub fn filter(self, condition: Condition) -> Self {
        self.push(LogicalOperator::And, condition)
    }

    /// OR a prebuilt condition
    pub fn or_filter(self, condition: Condition) -> Self {
        self.push(LogicalOperator::Or, condition)
    }

    /// AND a parenthesized group built by `build`
    pub fn and_where_group<F>(self, build: F) -> Self
    where
        F: FnOnce(ConditionBuilder) -> ConditionBuilder,
    {
        let group = build(ConditionBuilder::new()).into_condition();
        self.push(LogicalOperator::And, group)
    }

    /// OR a parenthesized group built by `build`
    pub fn or_where_group<F>(self, build: F) -> Self
    where
        F: FnOnce(ConditionBuilder) -> ConditionBuilder,
    {
        let group = build(ConditionBuilder::new()).into_condition();
        self.push(LogicalOperator::Or, group)
    }

    pub fn push(mut self, operator: LogicalOperator, condition: Condition) -> Self {
        self.root = Some(match self.root.take() {
            None => condition,
            Some(current) => current.combine(operator, condition),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.root.as_ref().map_or(true, Condition::is_trivial)
    }

    pub fn condition(&self) -> Option<&Condition> {
        self.root.as_ref()
    }

    /// The accumulated tree, an empty group when nothing was added
    pub fn into_condition(self) -> Condition {
        self.root.unwrap_or_else(Condition::empty)
    }
}

fn render_leaf(leaf: &Leaf, scope: &mut ParamScope<'_>) -> Result<String, QueryBuilderError> {
    let fragment = leaf.fragment.as_str();
    let bytes = fragment.as_bytes();
    let mut rendered = String::with_capacity(fragment.len());
    let mut assigned: HashMap<&str, usize> = HashMap::new();
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'\'' | b'"' | b'`') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    i += 1;
                }
                i += 1;
            }
            b':' if bytes.get(i + 1) == Some(&b':') => {
                // PostgreSQL cast, not a placeholder
                i += 2;
            }
            b':' if bytes.get(i + 1).is_some_and(|b| b.is_ascii_alphabetic() || *b == b'_') => {
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_')
                {
                    end += 1;
                }
                let name = &fragment[start..end];

                let index = match assigned.get(name) {
                    Some(index) => *index,
                    None => {
                        let value = leaf
                            .params
                            .get(name)
                            .ok_or_else(|| QueryBuilderError::UnboundParameter(name.to_string()))?;
                        let index = scope.register(name, value.clone());
                        assigned.insert(name, index);
                        index
                    }
                };

                rendered.push_str(&fragment[copied..i]);
                rendered.push_str(&scope.placeholder(index));
                copied = end;
                i = end;
            }
            _ => i += 1,
        }
    }
    rendered.push_str(&fragment[copied.min(fragment.len())..]);

    if let Some((unused, _)) = leaf.params.iter().find(|(name, _)| !assigned.contains_key(name)) {
        return Err(QueryBuilderError::UnusedParameter(unused.to_string()));
    }

    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::dialect_for;
    use config::Dialect;
    use serde_json::json;

    fn render(condition: &Condition, dialect: Dialect) -> (String, Vec<Value>) {
        let mut scope = ParamScope::new(dialect_for(dialect));
        let sql = condition.render(&mut scope).unwrap();
        let compiled = scope.finish(sql, false);
        (compiled.sql().to_string(), compiled.values().to_vec())
    }

    #[test]
    fn test_leaf_placeholders_per_dialect() {
        let leaf = Condition::leaf("age > :min AND age < :max", [("min", json!(18)), ("max", json!(65))]);

        let (sql, values) = render(&leaf, Dialect::Postgres);
        assert_eq!(sql, "age > $1 AND age < $2");
        assert_eq!(values, vec![json!(18), json!(65)]);

        let (sql, _) = render(&leaf, Dialect::Mysql);
        assert_eq!(sql, "age > ? AND age < ?");
    }

    #[test]
    fn test_leaf_repeated_placeholder() {
        let leaf = Condition::leaf("a = :v OR b = :v", [("v", json!(1))]);

        let (sql, values) = render(&leaf, Dialect::Postgres);
        assert_eq!(sql, "a = $1 OR b = $1");
        assert_eq!(values, vec![json!(1)]);

        let (sql, values) = render(&leaf, Dialect::Sqlite);
        assert_eq!(sql, "a = ? OR b = ?");
        assert_eq!(values, vec![json!(1), json!(1)]);
    }

    #[test]
    fn test_leaf_ignores_quotes_and_casts() {
        let leaf = Condition::leaf(
            "note <> ':not_a_param' AND created::date = :day AND \"odd:col\" = 1",
            [("day", json!("2024-01-01"))],
        );

        let (sql, values) = render(&leaf, Dialect::Postgres);
        assert_eq!(
            sql,
            "note <> ':not_a_param' AND created::date = $1 AND \"odd:col\" = 1"
        );
        assert_eq!(values, vec![json!("2024-01-01")]);
    }

    #[test]
    fn test_leaf_unbound_and_unused_parameters() {
        let mut scope = ParamScope::new(dialect_for(Dialect::Sqlite));
        let missing = Condition::raw("id = :id");
        assert_eq!(
            missing.render(&mut scope),
            Err(QueryBuilderError::UnboundParameter("id".to_string()))
        );

        let unused = Condition::leaf("id = 1", [("id", json!(1))]);
        assert_eq!(
            unused.render(&mut scope),
            Err(QueryBuilderError::UnusedParameter("id".to_string()))
        );
    }

    #[test]
    fn test_leaf_values_never_in_sql() {
        let leaf = Condition::eq("name", "'; DROP TABLE users; --");
        let (sql, values) = render(&leaf, Dialect::Mysql);
        assert_eq!(sql, "name = ?");
        assert_eq!(values, vec![json!("'; DROP TABLE users; --")]);
    }

    #[test]
    fn test_group_rendering() {
        let empty = Condition::or(vec![]);
        assert_eq!(render(&empty, Dialect::Sqlite).0, ALWAYS_TRUE);

        let single = Condition::and(vec![Condition::raw("a = 1")]);
        assert_eq!(render(&single, Dialect::Sqlite).0, "a = 1");

        let nested = Condition::and(vec![
            Condition::or(vec![Condition::raw("a = 1"), Condition::raw("b = 2")]),
            Condition::raw("c = 3"),
        ]);
        assert_eq!(render(&nested, Dialect::Sqlite).0, "((a = 1 OR b = 2) AND c = 3)");
    }

    #[test]
    fn test_same_parameter_name_across_leaves() {
        let condition = Condition::or(vec![
            Condition::eq("status", "active"),
            Condition::eq("status", "pending"),
        ]);

        let mut scope = ParamScope::new(dialect_for(Dialect::Postgres));
        let sql = condition.render(&mut scope).unwrap();
        let compiled = scope.finish(sql, false);

        assert_eq!(compiled.sql(), "(status = $1 OR status = $2)");
        assert_eq!(compiled.parameter("status"), Some(&json!("active")));
        assert_eq!(compiled.parameter("status_1"), Some(&json!("pending")));
    }

    #[test]
    fn test_associativity_of_grouping() {
        for operator in [LogicalOperator::And, LogicalOperator::Or] {
            let group = |children| Condition::Group { operator, children };
            let a = || Condition::eq("a", 1);
            let b = || Condition::eq("b", 2);
            let c = || Condition::eq("c", 3);

            let right = group(vec![a(), group(vec![b(), c()])]);
            let left = group(vec![group(vec![a(), b()]), c()]);

            let (right_sql, right_values) = render(&right, Dialect::Sqlite);
            let (left_sql, left_values) = render(&left, Dialect::Sqlite);

            let flatten = |sql: &str| sql.replace(['(', ')'], "");
            assert_ne!(right_sql, left_sql);
            assert_eq!(flatten(&right_sql), flatten(&left_sql));
            assert_eq!(right_values, left_values);
        }
    }

    #[test]
    fn test_rendering_is_idempotent() {
        let condition = Condition::and(vec![
            Condition::in_values("id", vec![json!(1), json!(2)]),
            Condition::or(vec![Condition::like("name", "A%"), Condition::is_null("name")]),
        ]);

        assert_eq!(
            render(&condition, Dialect::Postgres),
            render(&condition, Dialect::Postgres)
        );
    }

    #[test]
    fn test_convenience_constructors() {
        assert_eq!(render(&Condition::eq("deleted_at", Value::Null), Dialect::Sqlite).0, "deleted_at IS NULL");
        assert_eq!(render(&Condition::ne("deleted_at", Value::Null), Dialect::Sqlite).0, "deleted_at IS NOT NULL");
        assert_eq!(render(&Condition::in_values("id", vec![]), Dialect::Sqlite).0, ALWAYS_FALSE);
        assert_eq!(render(&Condition::not_in_values("id", vec![]), Dialect::Sqlite).0, ALWAYS_TRUE);

        let (sql, values) = render(
            &Condition::in_values("users.id", vec![json!(4), json!(5)]),
            Dialect::Postgres,
        );
        assert_eq!(sql, "users.id IN ($1, $2)");
        assert_eq!(values, vec![json!(4), json!(5)]);

        assert_eq!(render(&Condition::gte("age", 21), Dialect::Mysql).0, "age >= ?");
    }

    #[test]
    fn test_triviality() {
        assert!(Condition::empty().is_trivial());
        assert!(Condition::or(vec![Condition::empty(), Condition::and(vec![])]).is_trivial());
        assert!(!Condition::or(vec![Condition::empty(), Condition::raw("a = 1")]).is_trivial());
    }

    #[test]
    fn test_condition_builder_left_to_right() {
        let builder = ConditionBuilder::new()
            .and_where("a = 1", Params::new())
            .or_where("b = 2", Params::new())
            .and_where("c = 3", Params::new());

        let condition = builder.into_condition();
        assert_eq!(render(&condition, Dialect::Sqlite).0, "((a = 1 OR b = 2) AND c = 3)");
    }

    #[test]
    fn test_condition_builder_explicit_group() {
        let condition = ConditionBuilder::new()
            .and_where("a = 1", Params::new())
            .and_where_group(|group| {
                group
                    .and_where("b = :b", [("b", json!(2))])
                    .or_where("c = :c", [("c", json!(3))])
            })
            .into_condition();

        let (sql, values) = render(&condition, Dialect::Postgres);
        assert_eq!(sql, "(a = 1 AND (b = $1 OR c = $2))");
        assert_eq!(values, vec![json!(2), json!(3)]);
    }
}
