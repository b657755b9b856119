//! Error types for query construction and execution

use crate::validation::ValidationError;
use config::Dialect;
use thiserror::Error;

/// Misuse of the query builder, raised before anything reaches the database
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryBuilderError {
    #[error("No statement kind chosen: call select, insert_into, update or delete_from first")]
    MissingStatementKind,

    #[error("No target table for {0} statement")]
    MissingTable(&'static str),

    #[error("Statement kind already chosen as {existing}, cannot switch to {requested}")]
    KindAlreadyChosen {
        existing: &'static str,
        requested: &'static str,
    },

    #[error("{clause} is not valid in a {kind} statement")]
    InvalidClause {
        clause: &'static str,
        kind: &'static str,
    },

    #[error("{0} statement has no values to write")]
    EmptyValues(&'static str),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(#[from] ValidationError),

    #[error("Placeholder :{0} has no bound value")]
    UnboundParameter(String),

    #[error("Parameter :{0} is bound but never used in its fragment")]
    UnusedParameter(String),

    #[error("{feature} is not supported by the {dialect} dialect")]
    Unsupported {
        feature: &'static str,
        dialect: Dialect,
    },

    #[error("Subqueries must be SELECT statements")]
    NotASelect,

    #[error("Query builder is not bound to a driver")]
    Unbound,
}

/// Errors returned by drivers, connections and builders
#[derive(Error, Debug)]
pub enum Error {
    #[error("Connection is not set for {dialect}: call connect() first")]
    ConnectionIsNotSet { dialect: Dialect },

    #[error("Driver for {dialect} is already connected")]
    AlreadyConnected { dialect: Dialect },

    #[error("A transaction is already active on this {dialect} driver")]
    TransactionAlreadyActive { dialect: Dialect },

    #[error("No active transaction on this {dialect} driver")]
    NoActiveTransaction { dialect: Dialect },

    #[error("Query builder error: {0}")]
    QueryBuilder(#[from] QueryBuilderError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("Cannot decode column '{column}' of type {type_name}")]
    Decode { column: String, type_name: String },

    #[error("Row mapping error: {0}")]
    RowMapping(#[from] serde_json::Error),

    #[error("Query returned no rows")]
    RowNotFound,

    #[error("Invalid connection options: {0}")]
    Configuration(String),
}

impl Error {
    /// Dialect named by precondition errors
    pub fn dialect(&self) -> Option<Dialect> {
        match self {
            Error::ConnectionIsNotSet { dialect }
            | Error::AlreadyConnected { dialect }
            | Error::TransactionAlreadyActive { dialect }
            | Error::NoActiveTransaction { dialect } => Some(*dialect),
            _ => None,
        }
    }

    /// Whether the error came from the database or its client library
    pub fn is_database_error(&self) -> bool {
        matches!(self, Error::Database(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
