use super::condition::Condition;

/// Represents the type of SQL JOIN operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinType {
    /// INNER JOIN - returns records that have matching values in both tables
    Inner,
    /// LEFT JOIN - returns all records from the left table and matched records from the right table
    Left,
    /// RIGHT JOIN - returns all records from the right table and matched records from the left table
    Right,
    /// FULL OUTER JOIN - returns all records when there is a match in either table
    Full,
    /// CROSS JOIN - Cartesian product, takes no condition
    Cross,
}

impl JoinType {
    pub fn to_sql(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::Right => "RIGHT JOIN",
            JoinType::Full => "FULL OUTER JOIN",
            JoinType::Cross => "CROSS JOIN",
        }
    }
}

/// How the joined table relates to the rest of the statement
#[derive(Debug, Clone, PartialEq)]
pub enum JoinCondition {
    /// `ON <condition>`, the condition may carry bound values
    On(Condition),
    /// `USING (col, ...)`
    Using(Vec<String>),
    /// No condition, only valid for CROSS JOIN
    None,
}

/// Represents a complete JOIN clause
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub join_type: JoinType,
    pub table: String,
    pub alias: Option<String>,
    pub condition: JoinCondition,
}

impl JoinClause {
    /// Create a new JOIN clause with ON condition
    pub fn new_on(join_type: JoinType, table: impl Into<String>, on: Condition) -> Self {
        Self {
            join_type,
            table: table.into(),
            alias: None,
            condition: JoinCondition::On(on),
        }
    }

    /// Create a new JOIN clause with USING condition
    pub fn new_using(join_type: JoinType, table: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            join_type,
            table: table.into(),
            alias: None,
            condition: JoinCondition::Using(columns),
        }
    }

    pub fn cross(table: impl Into<String>) -> Self {
        Self {
            join_type: JoinType::Cross,
            table: table.into(),
            alias: None,
            condition: JoinCondition::None,
        }
    }

    /// Add an alias for the joined table
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_type_to_sql() {
        assert_eq!(JoinType::Inner.to_sql(), "INNER JOIN");
        assert_eq!(JoinType::Full.to_sql(), "FULL OUTER JOIN");
        assert_eq!(JoinType::Cross.to_sql(), "CROSS JOIN");
    }

    #[test]
    fn test_join_clause_with_alias() {
        let join = JoinClause::new_on(JoinType::Left, "orders", Condition::raw("o.user_id = u.id"))
            .with_alias("o");

        assert_eq!(join.alias.as_deref(), Some("o"));
        assert!(matches!(join.condition, JoinCondition::On(_)));
    }

    #[test]
    fn test_join_clause_using_columns() {
        let join = JoinClause::new_using(JoinType::Inner, "profiles", vec!["user_id".to_string()]);
        assert_eq!(join.alias, None);
        assert_eq!(
            join.condition,
            JoinCondition::Using(vec!["user_id".to_string()])
        );
    }
}
