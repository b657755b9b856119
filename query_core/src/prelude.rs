//! Common imports for building and running queries

pub use crate::dialect::{dialect_for, SqlDialect};
pub use crate::driver::{driver_for_options, Driver};
pub use crate::errors::{Error, QueryBuilderError};
pub use crate::native::{ColumnValues, QueryResult, Row};
pub use crate::query_builder::{
    CompiledQuery, Condition, ConditionBuilder, JoinClause, JoinType, Params, QueryBuilder,
    SortOrder,
};
pub use crate::schema_builder::SchemaBuilder;
