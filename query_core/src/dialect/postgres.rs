use super::{quote_with, PlaceholderStyle, SqlDialect};
use config::{ConnectionOptions, Dialect};
use serde_json::Value;

/// PostgreSQL
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl SqlDialect for PostgresDialect {
    fn kind(&self) -> Dialect {
        Dialect::Postgres
    }

    fn quote_identifier(&self, part: &str) -> String {
        quote_with(part, '"')
    }

    fn max_identifier_length(&self) -> Option<usize> {
        Some(63)
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Numbered
    }

    fn supports_returning(&self) -> bool {
        true
    }

    // Replica role skips FK triggers for this session only
    fn disable_integrity_checks_sql(&self) -> &'static str {
        "SET session_replication_role = 'replica'"
    }

    fn enable_integrity_checks_sql(&self) -> &'static str {
        "SET session_replication_role = 'origin'"
    }

    fn list_tables_query(&self, _options: &ConnectionOptions) -> (String, Vec<Value>) {
        (
            "SELECT tablename FROM pg_tables WHERE schemaname = current_schema()".to_string(),
            Vec::new(),
        )
    }

    fn drop_table_sql(&self, table: &str) -> String {
        format!("DROP TABLE IF EXISTS {} CASCADE", self.quote_identifier(table))
    }
}
