//! Query Core - query construction and driver layer for QueryMill
//!
//! This crate turns fluent statement descriptions into dialect-correct SQL with
//! bound parameters, and runs them through drivers for MySQL, PostgreSQL and
//! SQLite.

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        $crate::tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        $crate::tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod dialect;
pub mod driver;
pub mod errors;
pub mod logger;
pub mod native;
pub mod prelude;
pub mod query_builder;
pub mod schema_builder;
pub mod validation;

pub use dialect::{dialect_for, PlaceholderStyle, SqlDialect};
pub use driver::{
    driver_for_options, driver_with_components, Driver, GenericDriver, MysqlDriver,
    PostgresDriver, SqliteDriver,
};
pub use errors::{Error, QueryBuilderError, Result};
pub use logger::{QueryLogger, TracingQueryLogger};
pub use native::{ClientFactory, ColumnValues, NativeClient, QueryResult, Row, SqlxClientFactory};
pub use query_builder::{
    CompiledQuery, Condition, ConditionBuilder, JoinType, Params, QueryBuilder, SortOrder,
};
pub use schema_builder::SchemaBuilder;
pub use validation::{Identifier, ValidationError};

// Used by the logging macros
#[doc(hidden)]
pub use tracing;
