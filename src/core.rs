//! Core QueryMill functionality
//!
//! [`Connection`] owns the connection options and the driver for their dialect,
//! and is the entry point for building and running queries.

use query_core::logger::TracingQueryLogger;
use query_core::native::{ColumnValues, QueryResult, SqlxClientFactory};
use query_core::{driver_with_components, Driver, QueryBuilder, SchemaBuilder};
use std::sync::Arc;

use crate::errors::QueryMillError;
use config::{AppConfig, ConnectionOptions, Dialect, LoggingConfig};

/// Database connection: immutable options plus the driver that serves them
#[derive(Debug, Clone)]
pub struct Connection {
    options: Arc<ConnectionOptions>,
    driver: Arc<dyn Driver>,
}

impl Connection {
    /// Create a connection for the configured dialect without connecting yet
    pub fn new(options: ConnectionOptions) -> Result<Self, QueryMillError> {
        Self::with_logging(options, LoggingConfig::default())
    }

    /// Create a connection whose driver logs according to `logging`
    pub fn with_logging(
        options: ConnectionOptions,
        logging: LoggingConfig,
    ) -> Result<Self, QueryMillError> {
        options.validate()?;
        let options = Arc::new(options);
        let driver = driver_with_components(
            Arc::clone(&options),
            Arc::new(SqlxClientFactory),
            Arc::new(TracingQueryLogger::new(logging)),
        )?;

        Ok(Self { options, driver })
    }

    /// Use an already constructed driver, e.g. one with a custom client factory
    pub fn with_driver(driver: Arc<dyn Driver>) -> Self {
        Self {
            options: Arc::new(driver.options().clone()),
            driver,
        }
    }

    /// Create and connect in one step
    pub async fn open(options: ConnectionOptions) -> Result<Self, QueryMillError> {
        let connection = Self::new(options)?;
        connection.connect().await?;
        Ok(connection)
    }

    /// Create and connect from loaded application configuration
    pub async fn from_config(config: &AppConfig) -> Result<Self, QueryMillError> {
        let connection = Self::with_logging(config.database.clone(), config.logging.clone())?;
        connection.connect().await?;
        Ok(connection)
    }

    pub fn options(&self) -> &ConnectionOptions {
        &self.options
    }

    pub fn dialect(&self) -> Dialect {
        self.options.dialect
    }

    /// Shared handle to the driver
    pub fn driver(&self) -> Arc<dyn Driver> {
        Arc::clone(&self.driver)
    }

    pub async fn connect(&self) -> Result<(), QueryMillError> {
        self.driver.connect().await?;
        tracing::info!(database = %self.options.display_string(), "connected");
        Ok(())
    }

    pub async fn close(&self) -> Result<(), QueryMillError> {
        self.driver.disconnect().await?;
        Ok(())
    }

    pub async fn is_connected(&self) -> bool {
        self.driver.is_connected().await
    }

    /// Query builder bound to this connection's driver
    pub fn create_query_builder(&self) -> QueryBuilder {
        self.driver.create_query_builder()
    }

    pub fn create_schema_builder(&self) -> SchemaBuilder {
        self.driver.create_schema_builder()
    }

    /// Run literal SQL
    pub async fn query(&self, sql: &str) -> Result<QueryResult, QueryMillError> {
        Ok(self.driver.query(sql).await?)
    }

    pub async fn insert(
        &self,
        table: &str,
        values: ColumnValues,
    ) -> Result<QueryResult, QueryMillError> {
        Ok(self.driver.insert(table, values).await?)
    }

    pub async fn update(
        &self,
        table: &str,
        values: ColumnValues,
        conditions: ColumnValues,
    ) -> Result<QueryResult, QueryMillError> {
        Ok(self.driver.update(table, values, conditions).await?)
    }

    pub async fn delete(
        &self,
        table: &str,
        conditions: ColumnValues,
    ) -> Result<QueryResult, QueryMillError> {
        Ok(self.driver.delete(table, conditions).await?)
    }

    pub async fn begin_transaction(&self) -> Result<(), QueryMillError> {
        Ok(self.driver.begin_transaction().await?)
    }

    /// Commit the open transaction
    pub async fn end_transaction(&self) -> Result<(), QueryMillError> {
        Ok(self.driver.end_transaction().await?)
    }

    pub async fn rollback_transaction(&self) -> Result<(), QueryMillError> {
        Ok(self.driver.rollback_transaction().await?)
    }

    /// Drop every table of the active schema
    pub async fn clear_database(&self) -> Result<(), QueryMillError> {
        Ok(self.driver.clear_database().await?)
    }

    /// Check database connection health
    pub async fn health_check(&self) -> Result<(), QueryMillError> {
        self.driver.query("SELECT 1").await?;
        Ok(())
    }
}
