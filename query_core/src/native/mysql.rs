use super::{
    bytes_value, configure_pool, decode_error, number_from_decimal, number_from_f64, NativeClient,
    QueryResult, Row,
};
use crate::errors::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use config::ConnectionOptions;
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::pool::PoolConnection;
use sqlx::{Column, Executor, MySql, Row as _, TypeInfo};
use std::fmt;
use tokio::sync::Mutex;

/// MySQL / MariaDB client over a sqlx pool
pub struct MySqlClient {
    pool: MySqlPool,
    session: Mutex<Option<PoolConnection<MySql>>>,
}

impl fmt::Debug for MySqlClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MySqlClient")
            .field("pool_size", &self.pool.size())
            .finish()
    }
}

impl MySqlClient {
    pub async fn connect(options: &ConnectionOptions) -> Result<Self> {
        let mut connect_options = MySqlConnectOptions::new()
            .host(&options.host)
            .username(&options.username)
            .password(&options.password)
            .database(&options.database);
        if let Some(port) = options.effective_port() {
            connect_options = connect_options.port(port);
        }

        let pool = configure_pool!(MySqlPoolOptions::new(), &options.pool)
            .connect_with(connect_options)
            .await?;

        Ok(Self::from_pool(pool))
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: MySqlPool) -> Self {
        Self {
            pool,
            session: Mutex::new(None),
        }
    }

    async fn fetch_on<'e, E>(executor: E, sql: &str, values: &[Value]) -> Result<Vec<Row>>
    where
        E: Executor<'e, Database = MySql>,
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
        E: Executor<'e, Database = MySql>,
    {
        let mut query = sqlx::query(sql);
        for value in values {
            query = bind_json_value!(query, value);
        }

        let result = query.execute(executor).await?;
        // Zero means the statement generated no id
        let last_insert_id = match result.last_insert_id() {
            0 => None,
            id => i64::try_from(id).ok(),
        };
        Ok(QueryResult::affected(result.rows_affected(), last_insert_id))
    }
}

#[async_trait]
impl NativeClient for MySqlClient {
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

fn decode_row(row: &MySqlRow) -> Result<Row> {
    let mut decoded = Row::new();
    for column in row.columns() {
        let type_name = column.type_info().name();
        let value = decode_column(row, column.ordinal(), type_name)
            .map_err(|_| decode_error(column.name(), type_name))?;
        decoded.insert(column.name().to_string(), value);
    }
    Ok(decoded)
}

fn decode_column(row: &MySqlRow, index: usize, type_name: &str) -> Result<Value> {
    let value = match type_name {
        "BOOLEAN" => row.try_get::<Option<bool>, _>(index)?.map(Value::from),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
            row.try_get::<Option<i64>, _>(index)?.map(Value::from)
        }
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => row.try_get::<Option<u64>, _>(index)?.map(Value::from),
        "FLOAT" => row
            .try_get::<Option<f32>, _>(index)?
            .map(|f| number_from_f64(f as f64)),
        "DOUBLE" => row.try_get::<Option<f64>, _>(index)?.map(number_from_f64),
        "DECIMAL" => row
            .try_get::<Option<Decimal>, _>(index)?
            .map(number_from_decimal),
        "VARCHAR" | "CHAR" | "TEXT" | "TINYTEXT" | "MEDIUMTEXT" | "LONGTEXT" | "ENUM" | "SET" => {
            row.try_get::<Option<String>, _>(index)?.map(Value::from)
        }
        "VARBINARY" | "BINARY" | "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
            row.try_get::<Option<Vec<u8>>, _>(index)?.map(bytes_value)
        }
        "JSON" => row.try_get::<Option<Value>, _>(index)?,
        "TIMESTAMP" => row
            .try_get::<Option<DateTime<Utc>>, _>(index)?
            .map(|dt| Value::from(dt.to_rfc3339())),
        "DATETIME" => row
            .try_get::<Option<NaiveDateTime>, _>(index)?
            .map(|dt| Value::from(dt.to_string())),
        "DATE" => row
            .try_get::<Option<NaiveDate>, _>(index)?
            .map(|date| Value::from(date.to_string())),
        "TIME" => row
            .try_get::<Option<NaiveTime>, _>(index)?
            .map(|time| Value::from(time.to_string())),
        "NULL" => None,
        other => return Err(decode_error(&index.to_string(), other)),
    };
    Ok(value.unwrap_or(Value::Null))
}
