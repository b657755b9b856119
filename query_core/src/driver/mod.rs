//! Driver abstraction
//!
//! A [`Driver`] owns the connection lifecycle for one dialect, runs statements
//! through its native client and brackets them with transaction statements.
//! One generic implementation serves all dialects; the dialect type parameter
//! only selects the SQL it emits.

mod clear;
mod generic;
mod transaction;

#[cfg(test)]
pub(crate) mod testing;

#[cfg(test)]
mod tests;

use crate::dialect::{MySqlDialect, PostgresDialect, SqlDialect, SqliteDialect};
use crate::errors::Result;
use crate::logger::{QueryLogger, TracingQueryLogger};
use crate::native::{ClientFactory, ColumnValues, QueryResult, SqlxClientFactory};
use crate::query_builder::{CompiledQuery, QueryBuilder};
use crate::schema_builder::SchemaBuilder;
use async_trait::async_trait;
use config::{ConnectionOptions, Dialect};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

pub use generic::GenericDriver;

pub type MysqlDriver = GenericDriver<MySqlDialect>;
pub type PostgresDriver = GenericDriver<PostgresDialect>;
pub type SqliteDriver = GenericDriver<SqliteDialect>;

#[async_trait]
pub trait Driver: Send + Sync + fmt::Debug {
    fn dialect(&self) -> &'static dyn SqlDialect;

    fn options(&self) -> &ConnectionOptions;

    async fn is_connected(&self) -> bool;

    /// Open the native client; fails with `AlreadyConnected` while connected
    async fn connect(&self) -> Result<()>;

    /// Close the native client; fails with `ConnectionIsNotSet` when not connected
    async fn disconnect(&self) -> Result<()>;

    /// Run literal SQL
    async fn query(&self, sql: &str) -> Result<QueryResult>;

    /// Run SQL with positional values in placeholder order
    async fn query_with_params(&self, sql: &str, values: &[Value]) -> Result<QueryResult>;

    /// Run a statement produced by the query builder
    async fn run_compiled(&self, compiled: &CompiledQuery) -> Result<QueryResult>;

    async fn begin_transaction(&self) -> Result<()>;

    /// Commit the open transaction
    async fn end_transaction(&self) -> Result<()>;

    async fn rollback_transaction(&self) -> Result<()>;

    fn in_transaction(&self) -> bool;

    async fn insert(&self, table: &str, values: ColumnValues) -> Result<QueryResult>;

    /// UPDATE `table`, each condition entry ANDed as `column = value`
    async fn update(
        &self,
        table: &str,
        values: ColumnValues,
        conditions: ColumnValues,
    ) -> Result<QueryResult>;

    async fn delete(&self, table: &str, conditions: ColumnValues) -> Result<QueryResult>;

    /// Drop every table of the active schema with integrity checks suspended
    async fn clear_database(&self) -> Result<()>;

    fn create_query_builder(&self) -> QueryBuilder;

    fn create_schema_builder(&self) -> SchemaBuilder;
}

/// Driver for the configured dialect, with sqlx clients and tracing logs
pub fn driver_for_options(options: Arc<ConnectionOptions>) -> Result<Arc<dyn Driver>> {
    driver_with_components(
        options,
        Arc::new(SqlxClientFactory),
        Arc::new(TracingQueryLogger::default()),
    )
}

/// Driver for the configured dialect with an injected client factory and logger
pub fn driver_with_components(
    options: Arc<ConnectionOptions>,
    factory: Arc<dyn ClientFactory>,
    logger: Arc<dyn QueryLogger>,
) -> Result<Arc<dyn Driver>> {
    let driver: Arc<dyn Driver> = match options.dialect {
        Dialect::Mysql => Arc::new(MysqlDriver::with_components(options, factory, logger)?),
        Dialect::Postgres => Arc::new(PostgresDriver::with_components(options, factory, logger)?),
        Dialect::Sqlite => Arc::new(SqliteDriver::with_components(options, factory, logger)?),
    };
    Ok(driver)
}
