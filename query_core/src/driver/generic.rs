use super::Driver;
use crate::dialect::{dialect_for, SqlDialect};
use crate::errors::{Error, QueryBuilderError, Result};
use crate::logger::{QueryLogger, TracingQueryLogger};
use crate::native::{ClientFactory, ColumnValues, NativeClient, QueryResult, SqlxClientFactory};
use crate::query_builder::{CompiledQuery, Condition, Params, QueryBuilder};
use crate::query_builder::params::returns_rows;
use crate::schema_builder::SchemaBuilder;
use crate::validation::{parameter_name, Identifier};
use crate::{debug_log, trace_log};
use async_trait::async_trait;
use config::ConnectionOptions;
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Driver implementation shared by every dialect
///
/// Cloning is cheap and clones share the connection state.
pub struct GenericDriver<D: SqlDialect + Default> {
    pub(super) inner: Arc<DriverInner<D>>,
}

pub(super) struct DriverInner<D> {
    pub(super) dialect: D,
    pub(super) options: Arc<ConnectionOptions>,
    pub(super) factory: Arc<dyn ClientFactory>,
    pub(super) logger: Arc<dyn QueryLogger>,
    pub(super) client: RwLock<Option<Arc<dyn NativeClient>>>,
    pub(super) transaction_active: AtomicBool,
}

impl<D: SqlDialect + Default> Clone for GenericDriver<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D: SqlDialect + Default> fmt::Debug for GenericDriver<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenericDriver")
            .field("dialect", &self.inner.dialect.kind())
            .field("target", &self.inner.options.display_string())
            .field(
                "transaction_active",
                &self.inner.transaction_active.load(Ordering::SeqCst),
            )
            .finish()
    }
}

impl<D: SqlDialect + Default> GenericDriver<D> {
    /// Driver using sqlx clients and the tracing logger
    pub fn new(options: Arc<ConnectionOptions>) -> Result<Self> {
        Self::with_components(
            options,
            Arc::new(SqlxClientFactory),
            Arc::new(TracingQueryLogger::default()),
        )
    }

    pub fn with_components(
        options: Arc<ConnectionOptions>,
        factory: Arc<dyn ClientFactory>,
        logger: Arc<dyn QueryLogger>,
    ) -> Result<Self> {
        let dialect = D::default();
        if options.dialect != dialect.kind() {
            return Err(Error::Configuration(format!(
                "{} driver cannot use {} connection options",
                dialect.kind(),
                options.dialect
            )));
        }

        Ok(Self {
            inner: Arc::new(DriverInner {
                dialect,
                options,
                factory,
                logger,
                client: RwLock::new(None),
                transaction_active: AtomicBool::new(false),
            }),
        })
    }

    pub(super) fn not_connected(&self) -> Error {
        Error::ConnectionIsNotSet {
            dialect: self.inner.dialect.kind(),
        }
    }

    /// Clone the client out of the state lock so queries never hold it
    pub(super) async fn client(&self) -> Result<Arc<dyn NativeClient>> {
        self.inner
            .client
            .read()
            .await
            .clone()
            .ok_or_else(|| self.not_connected())
    }

    /// Log, run and log failure for one statement
    pub(super) async fn run_sql(
        &self,
        sql: &str,
        values: &[Value],
        fetch_rows: bool,
    ) -> Result<QueryResult> {
        let client = self.client().await?;
        self.inner.logger.log_query(sql, values);

        let result = if fetch_rows {
            client.fetch(sql, values).await.map(QueryResult::from_rows)
        } else {
            client.execute(sql, values).await
        };

        if let Err(error) = &result {
            self.inner.logger.log_query_error(sql, error);
        }
        result
    }

    /// `"column" = :column`, or `IS NULL` for a JSON null
    fn column_condition(&self, column: &str, value: Value) -> Result<Condition> {
        let dialect = self.dialect();
        let quoted = Identifier::parse(column, dialect.max_identifier_length())
            .map_err(QueryBuilderError::from)?
            .render(|part| dialect.quote_identifier(part));

        Ok(match value {
            Value::Null => Condition::is_null(&quoted),
            value => {
                let name = parameter_name(column);
                Condition::leaf(
                    format!("{} = :{}", quoted, name),
                    Params::new().with(name, value),
                )
            }
        })
    }

    fn with_conditions(&self, mut builder: QueryBuilder, conditions: ColumnValues) -> Result<QueryBuilder> {
        for (column, value) in conditions {
            builder = builder.filter(self.column_condition(&column, value)?);
        }
        Ok(builder)
    }
}

#[async_trait]
impl<D: SqlDialect + Default> Driver for GenericDriver<D> {
    fn dialect(&self) -> &'static dyn SqlDialect {
        dialect_for(self.inner.dialect.kind())
    }

    fn options(&self) -> &ConnectionOptions {
        &self.inner.options
    }

    async fn is_connected(&self) -> bool {
        self.inner.client.read().await.is_some()
    }

    async fn connect(&self) -> Result<()> {
        // The write lock serializes concurrent connects; the loser sees the client
        let mut client = self.inner.client.write().await;
        if client.is_some() {
            return Err(Error::AlreadyConnected {
                dialect: self.inner.dialect.kind(),
            });
        }

        debug_log!("Connecting to {}", self.inner.options.display_string());
        let connected = self.inner.factory.connect(&self.inner.options).await?;
        *client = Some(connected);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        let client = self
            .inner
            .client
            .write()
            .await
            .take()
            .ok_or_else(|| self.not_connected())?;

        self.inner.transaction_active.store(false, Ordering::SeqCst);
        client.close().await;
        debug_log!("Disconnected from {}", self.inner.options.display_string());
        Ok(())
    }

    async fn query(&self, sql: &str) -> Result<QueryResult> {
        self.run_sql(sql, &[], returns_rows(sql)).await
    }

    async fn query_with_params(&self, sql: &str, values: &[Value]) -> Result<QueryResult> {
        self.run_sql(sql, values, returns_rows(sql)).await
    }

    async fn run_compiled(&self, compiled: &CompiledQuery) -> Result<QueryResult> {
        trace_log!("Compiled parameters: {:?}", compiled.parameters());
        self.run_sql(compiled.sql(), compiled.values(), compiled.returns_rows())
            .await
    }

    async fn begin_transaction(&self) -> Result<()> {
        self.begin().await
    }

    async fn end_transaction(&self) -> Result<()> {
        self.commit().await
    }

    async fn rollback_transaction(&self) -> Result<()> {
        self.rollback().await
    }

    fn in_transaction(&self) -> bool {
        self.inner.transaction_active.load(Ordering::SeqCst)
    }

    async fn insert(&self, table: &str, values: ColumnValues) -> Result<QueryResult> {
        self.create_query_builder()
            .insert_into(table)
            .values(values)
            .execute()
            .await
    }

    async fn update(
        &self,
        table: &str,
        values: ColumnValues,
        conditions: ColumnValues,
    ) -> Result<QueryResult> {
        let builder = self.create_query_builder().update(table).set_values(values);
        self.with_conditions(builder, conditions)?.execute().await
    }

    async fn delete(&self, table: &str, conditions: ColumnValues) -> Result<QueryResult> {
        let builder = self.create_query_builder().delete_from(table);
        self.with_conditions(builder, conditions)?.execute().await
    }

    async fn clear_database(&self) -> Result<()> {
        self.clear().await
    }

    fn create_query_builder(&self) -> QueryBuilder {
        QueryBuilder::bound(Arc::new(self.clone()))
    }

    fn create_schema_builder(&self) -> SchemaBuilder {
        SchemaBuilder::new(Arc::new(self.clone()))
    }
}
