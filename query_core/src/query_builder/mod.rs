//! Query builder
//!
//! Fluent statement construction, condition trees and SQL generation.

pub mod builder;
pub mod condition;
pub mod join;
pub mod ordering;
pub mod params;
pub mod sql_generation;


pub use builder::{ColumnValue, QueryBuilder, SelectColumn, Source, Statement, StatementKind};
pub use condition::{Condition, ConditionBuilder, LogicalOperator};
pub use join::{JoinClause, JoinCondition, JoinType};
pub use ordering::{OrderTerm, SortOrder};
pub use params::{CompiledQuery, ParamScope, Params};
pub use sql_generation::SqlGenerator;
