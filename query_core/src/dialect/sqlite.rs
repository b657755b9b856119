use super::{quote_with, PlaceholderStyle, SqlDialect};
use config::{ConnectionOptions, Dialect};
use serde_json::Value;

/// SQLite (3.35+ for RETURNING, 3.39+ for RIGHT and FULL joins)
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqlDialect for SqliteDialect {
    fn kind(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn quote_identifier(&self, part: &str) -> String {
        quote_with(part, '"')
    }

    fn max_identifier_length(&self) -> Option<usize> {
        None
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Positional
    }

    fn limit_clause(&self, limit: Option<u64>, offset: Option<u64>) -> String {
        match (limit, offset) {
            (None, Some(offset)) => format!("LIMIT -1 OFFSET {}", offset),
            (Some(limit), Some(offset)) => format!("LIMIT {} OFFSET {}", limit, offset),
            (Some(limit), None) => format!("LIMIT {}", limit),
            (None, None) => String::new(),
        }
    }

    fn supports_returning(&self) -> bool {
        true
    }

    fn disable_integrity_checks_sql(&self) -> &'static str {
        "PRAGMA foreign_keys = OFF"
    }

    fn enable_integrity_checks_sql(&self) -> &'static str {
        "PRAGMA foreign_keys = ON"
    }

    fn list_tables_query(&self, _options: &ConnectionOptions) -> (String, Vec<Value>) {
        (
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'"
                .to_string(),
            Vec::new(),
        )
    }
}
