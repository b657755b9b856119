//! ORDER BY terms

use crate::dialect::SqlDialect;
use crate::errors::QueryBuilderError;
use crate::validation::Identifier;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// One `column direction` entry of an ORDER BY list
#[derive(Debug, Clone, PartialEq)]
pub struct OrderTerm {
    pub column: String,
    pub order: SortOrder,
}

impl OrderTerm {
    pub fn new(column: impl Into<String>, order: SortOrder) -> Self {
        Self {
            column: column.into(),
            order,
        }
    }

    /// Quoted column followed by the direction keyword
    pub fn render(&self, dialect: &dyn SqlDialect) -> Result<String, QueryBuilderError> {
        let column = Identifier::parse(&self.column, dialect.max_identifier_length())?
            .render(|part| dialect.quote_identifier(part));
        Ok(format!("{} {}", column, self.order.to_sql()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::dialect_for;
    use config::Dialect;

    #[test]
    fn test_order_term_quotes_per_dialect() {
        let term = OrderTerm::new("u.created_at", SortOrder::Desc);
        assert_eq!(
            term.render(dialect_for(Dialect::Postgres)).unwrap(),
            "\"u\".\"created_at\" DESC"
        );
        assert_eq!(
            term.render(dialect_for(Dialect::Mysql)).unwrap(),
            "`u`.`created_at` DESC"
        );
    }

    #[test]
    fn test_order_term_rejects_expressions() {
        let term = OrderTerm::new("created_at; DROP TABLE users", SortOrder::default());
        assert!(matches!(
            term.render(dialect_for(Dialect::Sqlite)),
            Err(QueryBuilderError::InvalidIdentifier(_))
        ));
    }
}
