//! Query logging hooks
//!
//! Drivers call [`QueryLogger::log_query`] before sending a statement and
//! [`QueryLogger::log_query_error`] after a statement fails. Nothing else is logged
//! through this trait.

use crate::errors::Error;
use config::LoggingConfig;
use serde_json::Value;
use std::fmt;

pub trait QueryLogger: Send + Sync + fmt::Debug {
    fn log_query(&self, sql: &str, parameters: &[Value]);

    fn log_query_error(&self, sql: &str, error: &Error);
}

/// Logger emitting `tracing` events under the `querymill::query` target
#[derive(Debug, Clone, Default)]
pub struct TracingQueryLogger {
    config: LoggingConfig,
}

impl TracingQueryLogger {
    pub fn new(config: LoggingConfig) -> Self {
        Self { config }
    }
}

impl QueryLogger for TracingQueryLogger {
    fn log_query(&self, sql: &str, parameters: &[Value]) {
        if !self.config.log_queries {
            return;
        }

        if self.config.log_parameters {
            tracing::debug!(target: "querymill::query", sql, ?parameters, "executing query");
        } else {
            tracing::debug!(
                target: "querymill::query",
                sql,
                parameter_count = parameters.len(),
                "executing query"
            );
        }
    }

    fn log_query_error(&self, sql: &str, error: &Error) {
        // Failures are reported even when query logging is off
        tracing::error!(target: "querymill::query", sql, %error, "query failed");
    }
}
