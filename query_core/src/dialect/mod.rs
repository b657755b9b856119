//! SQL dialects
//!
//! Everything that differs between backends when rendering SQL lives behind
//! [`SqlDialect`]: identifier quoting, placeholder syntax, LIMIT/OFFSET rules,
//! transaction statements and the integrity-check toggles used when clearing a
//! database.

pub mod mysql;
pub mod postgres;
pub mod sqlite;

use crate::query_builder::join::JoinType;
use config::{ConnectionOptions, Dialect};
use serde_json::Value;
use std::fmt;

pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

/// How bound parameters are written into SQL text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `$1`, `$2`, ... numbered by parameter, a repeated parameter reuses its number
    Numbered,
    /// `?` per occurrence, values are bound in order of appearance
    Positional,
}

pub trait SqlDialect: fmt::Debug + Send + Sync + 'static {
    fn kind(&self) -> Dialect;

    /// Quote one identifier part, doubling any embedded quote character
    fn quote_identifier(&self, part: &str) -> String;

    /// Longest identifier the backend accepts, `None` when unlimited
    fn max_identifier_length(&self) -> Option<usize>;

    fn placeholder_style(&self) -> PlaceholderStyle;

    /// Placeholder for the 1-based parameter `position`
    fn placeholder(&self, position: usize) -> String {
        match self.placeholder_style() {
            PlaceholderStyle::Numbered => format!("${}", position),
            PlaceholderStyle::Positional => "?".to_string(),
        }
    }

    fn begin_transaction_sql(&self) -> &'static str {
        "BEGIN"
    }

    fn commit_transaction_sql(&self) -> &'static str {
        "COMMIT"
    }

    fn rollback_transaction_sql(&self) -> &'static str {
        "ROLLBACK"
    }

    /// Render LIMIT/OFFSET, empty when neither is set
    fn limit_clause(&self, limit: Option<u64>, offset: Option<u64>) -> String {
        let mut clauses = Vec::new();

        if let Some(limit) = limit {
            clauses.push(format!("LIMIT {}", limit));
        }

        if let Some(offset) = offset {
            clauses.push(format!("OFFSET {}", offset));
        }

        clauses.join(" ")
    }

    fn supports_returning(&self) -> bool;

    fn supports_join(&self, join_type: &JoinType) -> bool {
        let _ = join_type;
        true
    }

    fn disable_integrity_checks_sql(&self) -> &'static str;

    fn enable_integrity_checks_sql(&self) -> &'static str;

    /// Query listing the tables of the active schema, with its bindings.
    /// The first column of every row is a table name.
    fn list_tables_query(&self, options: &ConnectionOptions) -> (String, Vec<Value>);

    fn drop_table_sql(&self, table: &str) -> String {
        format!("DROP TABLE IF EXISTS {}", self.quote_identifier(table))
    }
}

static MYSQL: MySqlDialect = MySqlDialect;
static POSTGRES: PostgresDialect = PostgresDialect;
static SQLITE: SqliteDialect = SqliteDialect;

/// Shared dialect instance for a configured dialect
pub fn dialect_for(kind: Dialect) -> &'static dyn SqlDialect {
    match kind {
        Dialect::Mysql => &MYSQL,
        Dialect::Postgres => &POSTGRES,
        Dialect::Sqlite => &SQLITE,
    }
}

pub(crate) fn quote_with(part: &str, quote: char) -> String {
    let mut quoted = String::with_capacity(part.len() + 2);
    quoted.push(quote);
    for c in part.chars() {
        if c == quote {
            quoted.push(quote);
        }
        quoted.push(c);
    }
    quoted.push(quote);
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_for_returns_matching_kind() {
        for kind in [Dialect::Mysql, Dialect::Postgres, Dialect::Sqlite] {
            assert_eq!(dialect_for(kind).kind(), kind);
        }
    }

    #[test]
    fn test_quoting_escapes_embedded_quotes() {
        assert_eq!(quote_with("users", '"'), "\"users\"");
        assert_eq!(quote_with("we\"ird", '"'), "\"we\"\"ird\"");
        assert_eq!(quote_with("o`dd", '`'), "`o``dd`");
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(dialect_for(Dialect::Postgres).placeholder(3), "$3");
        assert_eq!(dialect_for(Dialect::Mysql).placeholder(3), "?");
        assert_eq!(dialect_for(Dialect::Sqlite).placeholder(1), "?");
    }

    #[test]
    fn test_offset_without_limit() {
        assert_eq!(
            dialect_for(Dialect::Postgres).limit_clause(None, Some(20)),
            "OFFSET 20"
        );
        assert_eq!(
            dialect_for(Dialect::Sqlite).limit_clause(None, Some(20)),
            "LIMIT -1 OFFSET 20"
        );
        assert_eq!(
            dialect_for(Dialect::Mysql).limit_clause(None, Some(20)),
            "LIMIT 18446744073709551615 OFFSET 20"
        );
        assert_eq!(
            dialect_for(Dialect::Mysql).limit_clause(Some(10), Some(20)),
            "LIMIT 10 OFFSET 20"
        );
        assert_eq!(dialect_for(Dialect::Sqlite).limit_clause(None, None), "");
    }

    #[test]
    fn test_transaction_statements() {
        assert_eq!(
            dialect_for(Dialect::Mysql).begin_transaction_sql(),
            "START TRANSACTION"
        );
        assert_eq!(dialect_for(Dialect::Postgres).begin_transaction_sql(), "BEGIN");
        assert_eq!(dialect_for(Dialect::Sqlite).commit_transaction_sql(), "COMMIT");
    }

    #[test]
    fn test_drop_table_sql() {
        assert_eq!(
            dialect_for(Dialect::Mysql).drop_table_sql("orders"),
            "DROP TABLE IF EXISTS `orders`"
        );
        assert_eq!(
            dialect_for(Dialect::Postgres).drop_table_sql("orders"),
            "DROP TABLE IF EXISTS \"orders\" CASCADE"
        );
        assert_eq!(
            dialect_for(Dialect::Sqlite).drop_table_sql("orders"),
            "DROP TABLE IF EXISTS \"orders\""
        );
    }
}
