use super::{quote_with, PlaceholderStyle, SqlDialect};
use crate::query_builder::join::JoinType;
use config::{ConnectionOptions, Dialect};
use serde_json::Value;

/// MySQL and MariaDB
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl SqlDialect for MySqlDialect {
    fn kind(&self) -> Dialect {
        Dialect::Mysql
    }

    fn quote_identifier(&self, part: &str) -> String {
        quote_with(part, '`')
    }

    fn max_identifier_length(&self) -> Option<usize> {
        Some(64)
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Positional
    }

    fn begin_transaction_sql(&self) -> &'static str {
        "START TRANSACTION"
    }

    fn limit_clause(&self, limit: Option<u64>, offset: Option<u64>) -> String {
        match (limit, offset) {
            // MySQL has no bare OFFSET; the documented idiom is the largest row count
            (None, Some(offset)) => format!("LIMIT {} OFFSET {}", u64::MAX, offset),
            (Some(limit), Some(offset)) => format!("LIMIT {} OFFSET {}", limit, offset),
            (Some(limit), None) => format!("LIMIT {}", limit),
            (None, None) => String::new(),
        }
    }

    fn supports_returning(&self) -> bool {
        false
    }

    fn supports_join(&self, join_type: &JoinType) -> bool {
        !matches!(join_type, JoinType::Full)
    }

    fn disable_integrity_checks_sql(&self) -> &'static str {
        "SET FOREIGN_KEY_CHECKS = 0"
    }

    fn enable_integrity_checks_sql(&self) -> &'static str {
        "SET FOREIGN_KEY_CHECKS = 1"
    }

    fn list_tables_query(&self, options: &ConnectionOptions) -> (String, Vec<Value>) {
        (
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = ? AND table_type = 'BASE TABLE'"
                .to_string(),
            vec![Value::String(options.database.clone())],
        )
    }
}
