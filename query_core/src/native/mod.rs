//! Native database clients
//!
//! The driver layer talks to a database only through [`NativeClient`]. The
//! sqlx-backed implementations below own one connection pool each and can pin a
//! single pooled connection so that a transaction's statements share a session.

// Shared JSON -> sqlx parameter binding, used by every backend module.
// Strings always bind as text; typed columns need an explicit cast
// (`:id::uuid` in a predicate, `value_as` for INSERT/UPDATE).
macro_rules! bind_json_value {
    (postgres, $query:expr, $value:expr) => {
        match $value {
            serde_json::Value::Null => $query.bind(Option::<String>::None),
            serde_json::Value::Bool(b) => $query.bind(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    if i >= i32::MIN as i64 && i <= i32::MAX as i64 {
                        $query.bind(i as i32)
                    } else {
                        $query.bind(i)
                    }
                } else if let Some(f) = n.as_f64() {
                    $query.bind(f)
                } else {
                    $query.bind(n.to_string())
                }
            }
            serde_json::Value::String(s) => $query.bind(s.clone()),
            other => $query.bind(sqlx::types::Json(other.clone())),
        }
    };
    ($query:expr, $value:expr) => {
        match $value {
            serde_json::Value::Null => $query.bind(Option::<String>::None),
            serde_json::Value::Bool(b) => $query.bind(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    $query.bind(i)
                } else if let Some(f) = n.as_f64() {
                    $query.bind(f)
                } else {
                    $query.bind(n.to_string())
                }
            }
            serde_json::Value::String(s) => $query.bind(s.clone()),
            other => $query.bind(other.to_string()),
        }
    };
}

pub mod mysql;
pub mod postgres;
pub mod sqlite;

use crate::errors::{Error, Result};
use async_trait::async_trait;
use config::{ConnectionOptions, Dialect};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{Map, Number, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub use mysql::MySqlClient;
pub use postgres::PgClient;
pub use sqlite::SqliteClient;

/// One result row, column name to value
pub type Row = Map<String, Value>;

/// Column name to value, for INSERT and UPDATE
pub type ColumnValues = Map<String, Value>;

/// Outcome of running one statement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    pub rows_affected: u64,
    /// Id generated by the insert, for dialects that report one
    pub last_insert_id: Option<i64>,
}

impl QueryResult {
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self {
            rows_affected: rows.len() as u64,
            rows,
            last_insert_id: None,
        }
    }

    pub fn affected(rows_affected: u64, last_insert_id: Option<i64>) -> Self {
        Self {
            rows: Vec::new(),
            rows_affected,
            last_insert_id,
        }
    }

    /// First column of every row, as text
    pub fn first_column_strings(&self) -> Vec<String> {
        self.rows
            .iter()
            .filter_map(|row| row.values().next())
            .filter_map(|value| value.as_str().map(str::to_string))
            .collect()
    }
}

/// Opaque handle to a database, owned by a driver
#[async_trait]
pub trait NativeClient: Send + Sync + fmt::Debug {
    /// Run a statement that yields rows
    async fn fetch(&self, sql: &str, values: &[Value]) -> Result<Vec<Row>>;

    /// Run a statement for its side effects
    async fn execute(&self, sql: &str, values: &[Value]) -> Result<QueryResult>;

    /// Route following statements to one dedicated session until released
    async fn pin_session(&self) -> Result<()> {
        Ok(())
    }

    async fn release_session(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self);
}

/// Creates native clients from connection options
#[async_trait]
pub trait ClientFactory: Send + Sync + fmt::Debug {
    async fn connect(&self, options: &ConnectionOptions) -> Result<Arc<dyn NativeClient>>;
}

/// Factory backed by sqlx pools
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlxClientFactory;

#[async_trait]
impl ClientFactory for SqlxClientFactory {
    async fn connect(&self, options: &ConnectionOptions) -> Result<Arc<dyn NativeClient>> {
        options
            .validate()
            .map_err(|e| Error::Configuration(e.to_string()))?;

        let client: Arc<dyn NativeClient> = match options.dialect {
            Dialect::Mysql => Arc::new(MySqlClient::connect(options).await?),
            Dialect::Postgres => Arc::new(PgClient::connect(options).await?),
            Dialect::Sqlite => Arc::new(SqliteClient::connect(options).await?),
        };
        Ok(client)
    }
}

/// Apply the configured sizing and timeouts to a sqlx pool builder
macro_rules! configure_pool {
    ($builder:expr, $pool:expr) => {{
        let pool: &config::PoolOptions = $pool;
        let mut builder = $builder
            .max_connections(pool.max_connections)
            .min_connections(pool.min_connections)
            .acquire_timeout($crate::native::seconds(pool.connection_timeout_seconds))
            .idle_timeout($crate::native::seconds(pool.idle_timeout_seconds));

        // Set max lifetime if specified
        if pool.max_lifetime_seconds > 0 {
            builder = builder.max_lifetime($crate::native::seconds(pool.max_lifetime_seconds));
        }
        builder
    }};
}
pub(crate) use configure_pool;

pub(crate) fn seconds(value: u64) -> Duration {
    Duration::from_secs(value)
}

pub(crate) fn number_from_f64(value: f64) -> Value {
    Number::from_f64(value).map_or(Value::Null, Value::Number)
}

/// Integral decimals become integers, the rest the nearest float
pub(crate) fn number_from_decimal(value: Decimal) -> Value {
    if value.fract().is_zero() {
        if let Some(integer) = value.to_i64() {
            return Value::from(integer);
        }
    }
    value
        .to_f64()
        .map_or_else(|| Value::from(value.to_string()), number_from_f64)
}

/// Binary columns decode to an array of byte values
pub(crate) fn bytes_value(bytes: Vec<u8>) -> Value {
    Value::Array(bytes.into_iter().map(Value::from).collect())
}

pub(crate) fn decode_error(column: &str, type_name: &str) -> Error {
    Error::Decode {
        column: column.to_string(),
        type_name: type_name.to_string(),
    }
}
