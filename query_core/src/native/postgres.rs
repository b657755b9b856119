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
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow};
use sqlx::{Column, Executor, Postgres, Row as _, TypeInfo};
use std::fmt;
use tokio::sync::Mutex;
use uuid::Uuid;

/// PostgreSQL client over a sqlx pool
pub struct PgClient {
    pool: PgPool,
    session: Mutex<Option<PoolConnection<Postgres>>>,
}

impl fmt::Debug for PgClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgClient")
            .field("pool_size", &self.pool.size())
            .finish()
    }
}

impl PgClient {
    pub async fn connect(options: &ConnectionOptions) -> Result<Self> {
        let mut connect_options = PgConnectOptions::new()
            .host(&options.host)
            .username(&options.username)
            .password(&options.password)
            .database(&options.database);
        if let Some(port) = options.effective_port() {
            connect_options = connect_options.port(port);
        }

        let pool = configure_pool!(PgPoolOptions::new(), &options.pool)
            .connect_with(connect_options)
            .await?;

        Ok(Self::from_pool(pool))
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            session: Mutex::new(None),
        }
    }

    async fn fetch_on<'e, E>(executor: E, sql: &str, values: &[Value]) -> Result<Vec<Row>>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut query = sqlx::query(sql);
        for value in values {
            query = bind_json_value!(postgres, query, value);
        }

        let rows = query.fetch_all(executor).await?;
        rows.iter().map(decode_row).collect()
    }

    async fn execute_on<'e, E>(executor: E, sql: &str, values: &[Value]) -> Result<QueryResult>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut query = sqlx::query(sql);
        for value in values {
            query = bind_json_value!(postgres, query, value);
        }

        let result = query.execute(executor).await?;
        Ok(QueryResult::affected(result.rows_affected(), None))
    }
}

#[async_trait]
impl NativeClient for PgClient {
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

fn decode_row(row: &PgRow) -> Result<Row> {
    let mut decoded = Row::new();
    for column in row.columns() {
        let value = decode_column(row, column.ordinal(), column.type_info().name())
            .map_err(|_| decode_error(column.name(), column.type_info().name()))?;
        decoded.insert(column.name().to_string(), value);
    }
    Ok(decoded)
}

fn decode_column(row: &PgRow, index: usize, type_name: &str) -> Result<Value> {
    let value = match type_name {
        "BOOL" => row.try_get::<Option<bool>, _>(index)?.map(Value::from),
        "INT2" => row.try_get::<Option<i16>, _>(index)?.map(Value::from),
        "INT4" => row.try_get::<Option<i32>, _>(index)?.map(Value::from),
        "INT8" => row.try_get::<Option<i64>, _>(index)?.map(Value::from),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(index)?
            .map(|f| number_from_f64(f as f64)),
        "FLOAT8" => row.try_get::<Option<f64>, _>(index)?.map(number_from_f64),
        "NUMERIC" => row
            .try_get::<Option<Decimal>, _>(index)?
            .map(number_from_decimal),
        "TEXT" | "VARCHAR" | "BPCHAR" | "CHAR" | "NAME" | "CITEXT" => {
            row.try_get::<Option<String>, _>(index)?.map(Value::from)
        }
        "UUID" => row
            .try_get::<Option<Uuid>, _>(index)?
            .map(|uuid| Value::from(uuid.to_string())),
        "BYTEA" => row.try_get::<Option<Vec<u8>>, _>(index)?.map(bytes_value),
        "JSON" | "JSONB" => row.try_get::<Option<Value>, _>(index)?,
        "TIMESTAMPTZ" => row
            .try_get::<Option<DateTime<Utc>>, _>(index)?
            .map(|dt| Value::from(dt.to_rfc3339())),
        "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(index)?
            .map(|dt| Value::from(dt.to_string())),
        "DATE" => row
            .try_get::<Option<NaiveDate>, _>(index)?
            .map(|date| Value::from(date.to_string())),
        "TIME" => row
            .try_get::<Option<NaiveTime>, _>(index)?
            .map(|time| Value::from(time.to_string())),
        other => return Err(decode_error(&index.to_string(), other)),
    };
    Ok(value.unwrap_or(Value::Null))
}
