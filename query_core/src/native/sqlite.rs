use super::{
    bytes_value, configure_pool, decode_error, number_from_f64, NativeClient, QueryResult, Row,
};
use crate::errors::Result;
use async_trait::async_trait;
use config::ConnectionOptions;
use serde_json::Value;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteColumn, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Executor, Row as _, Sqlite, TypeInfo, ValueRef};
use std::fmt;
use std::str::FromStr;
use tokio::sync::Mutex;

const MEMORY_URL: &str = "sqlite::memory:";

/// SQLite client over a sqlx pool
pub struct SqliteClient {
    pool: SqlitePool,
    session: Mutex<Option<PoolConnection<Sqlite>>>,
}

impl fmt::Debug for SqliteClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteClient")
            .field("pool_size", &self.pool.size())
            .finish()
    }
}

impl SqliteClient {
    pub async fn connect(options: &ConnectionOptions) -> Result<Self> {
        let pool = if options.is_in_memory() {
            // Every connection to :memory: is a separate database, keep exactly one alive
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(SqliteConnectOptions::from_str(MEMORY_URL)?)
                .await?
        } else {
            let path = options.path.as_deref().unwrap_or_default();
            let connect_options = SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true);
            configure_pool!(SqlitePoolOptions::new(), &options.pool)
                .connect_with(connect_options)
                .await?
        };

        Ok(Self::from_pool(pool))
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self {
            pool,
            session: Mutex::new(None),
        }
    }

    async fn fetch_on<'e, E>(executor: E, sql: &str, values: &[Value]) -> Result<Vec<Row>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let mut query = sqlx::query(sql);
        for value in values {
            query = bind_json_value!(query, value);
        }

        let rows = query.fetch_all(executor).await?;
        rows.iter().map(decode_row).collect()
    }

    async fn execute_on<'e, E>(executor: E, sql: &str, values: &[Value]) -> Result<QueryResult>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let mut query = sqlx::query(sql);
        for value in values {
            query = bind_json_value!(query, value);
        }

        let result = query.execute(executor).await?;
        let last_insert_id = match result.last_insert_rowid() {
            0 => None,
            id => Some(id),
        };
        Ok(QueryResult::affected(result.rows_affected(), last_insert_id))
    }
}

#[async_trait]
impl NativeClient for SqliteClient {
    async fn fetch(&self, sql: &str, values: &[Value]) -> Result<Vec<Row>> {
        let mut session = self.session.lock().await;
        if let Some(connection) = session.as_mut() {
            return Self::fetch_on(&mut **connection, sql, values).await;
        }
        drop(session);
        Self::fetch_on(&self.pool, sql, values).await
    }

    async fn execute(&self, sql: &str, values: &[Value]) -> Result<QueryResult> {
        let mut session = self.session.lock().await;
        if let Some(connection) = session.as_mut() {
            return Self::execute_on(&mut **connection, sql, values).await;
        }
        drop(session);
        Self::execute_on(&self.pool, sql, values).await
    }

    async fn pin_session(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        if session.is_none() {
            *session = Some(self.pool.acquire().await?);
        }
        Ok(())
    }

    async fn release_session(&self) -> Result<()> {
        self.session.lock().await.take();
        Ok(())
    }

    async fn close(&self) {
        self.session.lock().await.take();
        self.pool.close().await;
    }
}

fn decode_row(row: &SqliteRow) -> Result<Row> {
    let mut decoded = Row::new();
    for column in row.columns() {
        let type_name = column_type(row, column)?;
        let value = decode_column(row, column.ordinal(), &type_name)
            .map_err(|_| decode_error(column.name(), &type_name))?;
        decoded.insert(column.name().to_string(), value);
    }
    Ok(decoded)
}

/// Declared column type, or the storage class of the value for expressions
fn column_type(row: &SqliteRow, column: &SqliteColumn) -> Result<String> {
    let declared = column.type_info();
    if !declared.is_null() {
        return Ok(declared.name().to_string());
    }

    let raw = row.try_get_raw(column.ordinal())?;
    Ok(raw.type_info().name().to_string())
}

fn decode_column(row: &SqliteRow, index: usize, type_name: &str) -> Result<Value> {
    let value = match type_name {
        "NULL" => None,
        "BOOLEAN" => row.try_get::<Option<bool>, _>(index)?.map(Value::from),
        "INTEGER" => row.try_get::<Option<i64>, _>(index)?.map(Value::from),
        "REAL" => row.try_get::<Option<f64>, _>(index)?.map(number_from_f64),
        "NUMERIC" => match row.try_get::<Option<i64>, _>(index) {
            Ok(value) => value.map(Value::from),
            Err(_) => row.try_get::<Option<f64>, _>(index)?.map(number_from_f64),
        },
        "TEXT" | "DATE" | "TIME" | "DATETIME" => {
            row.try_get::<Option<String>, _>(index)?.map(Value::from)
        }
        "BLOB" => row.try_get::<Option<Vec<u8>>, _>(index)?.map(bytes_value),
        other => return Err(decode_error(&index.to_string(), other)),
    };
    Ok(value.unwrap_or(Value::Null))
}
