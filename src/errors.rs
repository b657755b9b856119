//! Error types for the QueryMill crate
//!
//! This module contains all error types that can be returned by QueryMill operations.

use config::ConfigError;
use query_core::QueryBuilderError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueryMillError {
    #[error(transparent)]
    Query(#[from] query_core::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl From<QueryBuilderError> for QueryMillError {
    fn from(error: QueryBuilderError) -> Self {
        QueryMillError::Query(error.into())
    }
}

impl QueryMillError {
    /// The driver error, when this is one
    pub fn as_query_error(&self) -> Option<&query_core::Error> {
        match self {
            QueryMillError::Query(error) => Some(error),
            QueryMillError::Config(_) => None,
        }
    }
}
